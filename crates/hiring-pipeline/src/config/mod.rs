use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use crate::workflows::pipeline::{BackendConfig, PipelineSettings};

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
    pub backend: BackendConfig,
    pub pipeline: PipelineSettings,
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

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            backend: load_backend()?,
            pipeline: load_pipeline()?,
        })
    }
}

fn load_backend() -> Result<BackendConfig, ConfigError> {
    let base_url = env::var("PIPELINE_BACKEND_URL")
        .unwrap_or_else(|_| "http://127.0.0.1:8000/api".to_string());
    validate_backend_url(&base_url)?;

    let api_token = env::var("PIPELINE_BACKEND_TOKEN")
        .ok()
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty());

    let timeout_secs = env::var("PIPELINE_BACKEND_TIMEOUT_SECS")
        .unwrap_or_else(|_| "10".to_string())
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|secs| *secs > 0)
        .ok_or(ConfigError::InvalidTimeout)?;

    Ok(BackendConfig {
        base_url,
        api_token,
        request_timeout: Duration::from_secs(timeout_secs),
    })
}

fn load_pipeline() -> Result<PipelineSettings, ConfigError> {
    let refresh_secs = env::var("PIPELINE_REFRESH_SECS")
        .unwrap_or_else(|_| "30".to_string())
        .trim()
        .parse::<u64>()
        .map_err(|_| ConfigError::InvalidRefreshInterval)?;

    let lock_terminal_cards = match env::var("PIPELINE_LOCK_TERMINAL_CARDS") {
        Ok(value) => parse_flag("PIPELINE_LOCK_TERMINAL_CARDS", &value)?,
        Err(_) => false,
    };

    let notification_capacity = env::var("PIPELINE_NOTIFICATION_CAPACITY")
        .unwrap_or_else(|_| "50".to_string())
        .trim()
        .parse::<usize>()
        .ok()
        .filter(|capacity| *capacity > 0)
        .ok_or(ConfigError::InvalidCapacity)?;

    Ok(PipelineSettings {
        lock_terminal_cards,
        notification_capacity,
        refresh_interval: (refresh_secs > 0).then(|| Duration::from_secs(refresh_secs)),
    })
}

/// Checks that `value` is an absolute http(s) URL.
pub fn validate_backend_url(value: &str) -> Result<(), ConfigError> {
    match reqwest::Url::parse(value.trim()) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => Ok(()),
        _ => Err(ConfigError::InvalidBackendUrl {
            value: value.to_string(),
        }),
    }
}

fn parse_flag(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" | "" => Ok(false),
        _ => Err(ConfigError::InvalidFlag { name }),
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

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidBackendUrl { value: String },
    InvalidTimeout,
    InvalidRefreshInterval,
    InvalidFlag { name: &'static str },
    InvalidCapacity,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidBackendUrl { value } => {
                write!(f, "PIPELINE_BACKEND_URL '{value}' is not an http(s) URL")
            }
            ConfigError::InvalidTimeout => write!(
                f,
                "PIPELINE_BACKEND_TIMEOUT_SECS must be a positive number of seconds"
            ),
            ConfigError::InvalidRefreshInterval => write!(
                f,
                "PIPELINE_REFRESH_SECS must be a whole number of seconds (0 disables)"
            ),
            ConfigError::InvalidFlag { name } => {
                write!(f, "{name} must be one of true/false/1/0/yes/no")
            }
            ConfigError::InvalidCapacity => {
                write!(f, "PIPELINE_NOTIFICATION_CAPACITY must be greater than zero")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}
