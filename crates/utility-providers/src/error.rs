use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::utilities::RegistryLoadError;

/// Startup and process-level failures. Suggestion lookups themselves never
/// fail, so nothing request-scoped lives here.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("provider registry error: {0}")]
    Registry(#[from] RegistryLoadError),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
