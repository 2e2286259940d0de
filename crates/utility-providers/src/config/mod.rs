use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::workflows::utilities::cache::DEFAULT_TTL_DAYS;

const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_TIMEOUT_MS: u64 = 6_000;
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 3_600;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub suggestions: SuggestionsConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let log_format = match env::var("APP_LOG_FORMAT") {
            Ok(value) => LogFormat::parse(&value)?,
            Err(_) => LogFormat::Compact,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                log_format,
            },
            suggestions: SuggestionsConfig::from_env()?,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            _ => Err(ConfigError::InvalidLogFormat(value.to_string())),
        }
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub log_format: LogFormat,
}

/// Generator, cache, and provider directory settings.
#[derive(Clone)]
pub struct SuggestionsConfig {
    /// Generation is disabled and every lookup uses fallback data when unset.
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
    pub cache_ttl_days: i64,
    pub sweep_interval: Duration,
    pub registry_path: Option<PathBuf>,
}

impl Default for SuggestionsConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            cache_ttl_days: DEFAULT_TTL_DAYS,
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
            registry_path: None,
        }
    }
}

impl SuggestionsConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let timeout_ms = parse_positive("SUGGESTIONS_TIMEOUT_MS", DEFAULT_TIMEOUT_MS)?;
        let ttl_days = parse_positive("SUGGESTIONS_CACHE_TTL_DAYS", DEFAULT_TTL_DAYS as u64)?;
        let sweep_secs =
            parse_positive("SUGGESTIONS_SWEEP_INTERVAL_SECS", DEFAULT_SWEEP_INTERVAL_SECS)?;

        Ok(Self {
            api_key: non_empty_var("OPENAI_API_KEY"),
            model: non_empty_var("SUGGESTIONS_MODEL").unwrap_or(defaults.model),
            base_url: non_empty_var("SUGGESTIONS_BASE_URL").unwrap_or(defaults.base_url),
            timeout: Duration::from_millis(timeout_ms),
            cache_ttl_days: i64::try_from(ttl_days).map_err(|_| ConfigError::InvalidNumber {
                variable: "SUGGESTIONS_CACHE_TTL_DAYS",
                value: ttl_days.to_string(),
            })?,
            sweep_interval: Duration::from_secs(sweep_secs),
            registry_path: non_empty_var("PROVIDER_REGISTRY_PATH").map(PathBuf::from),
        })
    }

    pub fn generation_enabled(&self) -> bool {
        self.api_key.is_some()
    }
}

impl std::fmt::Debug for SuggestionsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SuggestionsConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("cache_ttl_days", &self.cache_ttl_days)
            .field("sweep_interval", &self.sweep_interval)
            .field("registry_path", &self.registry_path)
            .finish()
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_positive(variable: &'static str, default: u64) -> Result<u64, ConfigError> {
    let Some(raw) = non_empty_var(variable) else {
        return Ok(default);
    };

    match raw.parse::<u64>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(ConfigError::InvalidNumber {
            variable,
            value: raw,
        }),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("APP_PORT must be a valid u16")]
    InvalidPort,
    #[error("APP_HOST must parse to an IPv4 or IPv6 address")]
    InvalidHost {
        #[source]
        source: std::net::AddrParseError,
    },
    #[error("APP_LOG_FORMAT must be 'compact' or 'json', got '{0}'")]
    InvalidLogFormat(String),
    #[error("{variable} must be a positive integer, got '{value}'")]
    InvalidNumber {
        variable: &'static str,
        value: String,
    },
}
