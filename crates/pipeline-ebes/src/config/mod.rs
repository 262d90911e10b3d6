//! Environment-driven settings for the service and the workflow policy dials.
//!
//! Every value is read through a lookup function so tests can feed a map instead of mutating
//! the process environment. `.env` files are honored through `dotenvy`.

use std::env;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;

pub const DEFAULT_MAX_ACTIVE_ROLES: usize = 30;
pub const DEFAULT_MIN_CV_MATCH_PERCENT: f64 = 85.0;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_LOG_LEVEL: &str = "info";

/// Deployment stage, used only for startup logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    /// Unknown labels fall back to development.
    fn from_label(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub workflow: WorkflowConfig,
}

impl AppConfig {
    /// Reads `.env` (if present) and then the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = lookup("APP_ENV")
            .map(|raw| AppEnvironment::from_label(&raw))
            .unwrap_or(AppEnvironment::Development);

        let server = ServerConfig {
            host: lookup("APP_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parsed(&lookup, "APP_PORT", DEFAULT_PORT, |_| true)?,
        };

        let telemetry = TelemetryConfig {
            log_level: lookup("APP_LOG_LEVEL").unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
        };

        let workflow = WorkflowConfig {
            max_active_roles: parsed(
                &lookup,
                "APP_MAX_ACTIVE_ROLES",
                DEFAULT_MAX_ACTIVE_ROLES,
                |limit| *limit > 0,
            )?,
            min_cv_match_percent: parsed(
                &lookup,
                "APP_MIN_CV_MATCH",
                DEFAULT_MIN_CV_MATCH_PERCENT,
                |pct: &f64| pct.is_finite() && (0.0..=100.0).contains(pct),
            )?,
        };

        Ok(Self {
            environment,
            server,
            telemetry,
            workflow,
        })
    }
}

/// Parses `key` when it is set, rejecting values that fail `accept`.
fn parsed<F, T>(
    lookup: &F,
    key: &'static str,
    default: T,
    accept: impl Fn(&T) -> bool,
) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    raw.trim()
        .parse::<T>()
        .ok()
        .filter(|value| accept(value))
        .ok_or(ConfigError::InvalidValue { key, value: raw })
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    /// `localhost` is accepted as an alias for the IPv4 loopback; anything else must be an
    /// IP literal.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip = if self.host.eq_ignore_ascii_case("localhost") {
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        } else {
            self.host
                .parse()
                .map_err(|source| ConfigError::InvalidHost { source })?
        };
        Ok(SocketAddr::new(ip, self.port))
    }
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Level or `EnvFilter` directive used when `RUST_LOG` is unset.
    pub log_level: String,
}

/// Pipeline policy dials shared by the role and scoring services.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowConfig {
    /// Upper bound of `active` roles a single account manager may hold.
    pub max_active_roles: usize,
    /// Submission floor for CV-match percentages.
    pub min_cv_match_percent: f64,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            max_active_roles: DEFAULT_MAX_ACTIVE_ROLES,
            min_cv_match_percent: DEFAULT_MIN_CV_MATCH_PERCENT,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidValue { key: &'static str, value: String },
    InvalidHost { source: std::net::AddrParseError },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidValue { key, value } => {
                let expected = match *key {
                    "APP_PORT" => "a port number",
                    "APP_MAX_ACTIVE_ROLES" => "a positive integer",
                    "APP_MIN_CV_MATCH" => "a percentage between 0 and 100",
                    _ => "a valid value",
                };
                write!(f, "{key}='{value}' is invalid, expected {expected}")
            }
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must be `localhost` or an IPv4/IPv6 address")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidValue { .. } => None,
        }
    }
}
