use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use crate::kpi::DefaultingPolicy;

/// Stored `baseRate` for the sales commission KPI when `KPI_BASE_RATE` is unset.
pub const DEFAULT_STORED_BASE_RATE: f64 = 0.04;

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
    pub kpi: KpiConfig,
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

        let kpi = KpiConfig::from_env()?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            kpi,
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

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Rule settings layered beneath request attributes by the KPI processor.
#[derive(Debug, Clone, PartialEq)]
pub struct KpiConfig {
    pub defaulting: DefaultingPolicy,
    pub stored_base_rate: f64,
}

impl Default for KpiConfig {
    fn default() -> Self {
        Self {
            defaulting: DefaultingPolicy::default(),
            stored_base_rate: DEFAULT_STORED_BASE_RATE,
        }
    }
}

impl KpiConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaulting = match env::var("KPI_DEFAULTING") {
            Ok(raw) => DefaultingPolicy::parse(&raw)
                .ok_or(ConfigError::InvalidDefaultingPolicy { value: raw })?,
            Err(_) => DefaultingPolicy::default(),
        };

        let stored_base_rate = match env::var("KPI_BASE_RATE") {
            Ok(raw) => {
                let rate = raw
                    .trim()
                    .parse::<f64>()
                    .map_err(|_| ConfigError::InvalidBaseRate { value: raw.clone() })?;
                if !rate.is_finite() || rate < 0.0 {
                    return Err(ConfigError::InvalidBaseRate { value: raw });
                }
                rate
            }
            Err(_) => DEFAULT_STORED_BASE_RATE,
        };

        Ok(Self {
            defaulting,
            stored_base_rate,
        })
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidDefaultingPolicy { value: String },
    InvalidBaseRate { value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidDefaultingPolicy { value } => write!(
                f,
                "KPI_DEFAULTING must be 'presence' or 'legacy' (got '{value}')"
            ),
            ConfigError::InvalidBaseRate { value } => write!(
                f,
                "KPI_BASE_RATE must be a finite, non-negative number (got '{value}')"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidDefaultingPolicy { .. }
            | ConfigError::InvalidBaseRate { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        env::remove_var("APP_ENV");
        env::remove_var("APP_HOST");
        env::remove_var("APP_PORT");
        env::remove_var("APP_LOG_LEVEL");
        env::remove_var("KPI_DEFAULTING");
        env::remove_var("KPI_BASE_RATE");
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.kpi, KpiConfig::default());
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }

    #[test]
    fn reads_kpi_overrides() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("KPI_DEFAULTING", "legacy");
        env::set_var("KPI_BASE_RATE", "0.035");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.kpi.defaulting, DefaultingPolicy::LegacyFalsy);
        assert_eq!(config.kpi.stored_base_rate, 0.035);
        reset_env();
    }

    #[test]
    fn rejects_negative_base_rate() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("KPI_BASE_RATE", "-0.1");
        let err = AppConfig::load().expect_err("negative rate rejected");
        assert!(matches!(err, ConfigError::InvalidBaseRate { .. }));
        reset_env();
    }

    #[test]
    fn rejects_unknown_defaulting_policy() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("KPI_DEFAULTING", "truthy");
        let err = AppConfig::load().expect_err("unknown policy rejected");
        assert!(err.to_string().contains("truthy"));
        reset_env();
    }
}
