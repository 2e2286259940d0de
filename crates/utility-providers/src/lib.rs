//! Utility provider suggestions for property intake.
//!
//! The engine turns a free-form property address and a utility category into a
//! short, ranked list of likely service providers. Generated candidates are
//! validated, cached by coarse geography, and replaced by a static fallback
//! catalog whenever generation is unavailable.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
