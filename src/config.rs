//! Runtime configuration read from the environment.
//!
//! [`Config::load`] pulls in a `.env` file first; [`Config::from_lookup`]
//! takes any key lookup so tests can feed a plain map.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_API_BASE: &str = "https://onlinetools.ups.com/api";
pub const DEFAULT_TRANSACTION_SRC: &str = "parcel-glance";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the tracking API, without a trailing slash
    pub api_base: String,
    /// Bearer token sent with every request, if any
    pub access_token: Option<String>,
    pub transaction_src: String,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            access_token: None,
            transaction_src: DEFAULT_TRANSACTION_SRC.to_string(),
            timeout: Duration::from_secs(15),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub client: ClientConfig,
    /// JSON file holding the tracked packages
    pub store_path: PathBuf,
    /// How long the view waits for a package's data panel to be mounted
    pub view_wait: Duration,
    pub port: u16,
}

impl Config {
    /// Load `.env` (if any) and read the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let or_default = |var: &str, default: &str| -> String {
            lookup(var)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
            or_default(var, default)
                .trim()
                .parse::<u64>()
                .map_err(|e| ConfigError::InvalidEnvVar {
                    var: var.to_string(),
                    reason: e.to_string(),
                })
        };

        let port = or_default("PORT", "3000")
            .trim()
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: "PORT".to_string(),
                reason: e.to_string(),
            })?;

        let timeout_secs = parse_u64("UPS_TIMEOUT_SECS", "15")?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidEnvVar {
                var: "UPS_TIMEOUT_SECS".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            client: ClientConfig {
                api_base: or_default("UPS_API_BASE", DEFAULT_API_BASE)
                    .trim_end_matches('/')
                    .to_string(),
                access_token: lookup("UPS_ACCESS_TOKEN").filter(|t| !t.trim().is_empty()),
                transaction_src: or_default("UPS_TRANSACTION_SRC", DEFAULT_TRANSACTION_SRC),
                timeout: Duration::from_secs(timeout_secs),
            },
            store_path: PathBuf::from(or_default("PARCEL_GLANCE_STORE", "packages.json")),
            view_wait: Duration::from_millis(parse_u64("PARCEL_GLANCE_WAIT_MS", "2000")?),
            port,
        })
    }
}
