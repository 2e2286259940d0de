//! Utility provider suggestions for property onboarding.
//!
//! Given a property address and a utility category, [`ProviderSuggestionService`]
//! returns up to three likely providers. Results come from a 30-day cache, an
//! optional text-generation backend, or a static fallback catalog, in that
//! order. The same service also answers live provider-name lookups against the
//! bundled provider directory.

pub mod address;
pub mod cache;
pub mod domain;
pub mod fallback;
pub mod generator;
pub mod openai;
pub mod registry;
pub mod resolver;
pub mod router;
pub mod search;
pub mod service;
pub mod validator;

pub use address::AddressParser;
pub use cache::{suggestion_cache_key, SuggestionCache};
pub use domain::{ParsedAddress, ProviderSuggestion, UtilityCategory};
pub use fallback::FallbackCatalog;
pub use generator::{CandidateGenerator, GenerationFailure, GenerationResult};
pub use openai::OpenAiCandidateGenerator;
pub use registry::{CanonicalProviderRecord, ProviderRegistry, RegistryLoadError};
pub use resolver::SuggestionResolver;
pub use router::utilities_router;
pub use search::SearchMatcher;
pub use service::ProviderSuggestionService;
pub use validator::{validate_candidate, RawCandidate};
