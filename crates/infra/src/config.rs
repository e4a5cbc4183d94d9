//! Process configuration, read from environment variables.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

use storefront_core::UserId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be set when {reason}")]
    Missing { var: &'static str, reason: &'static str },

    #[error("invalid value for {var} ({value:?}): {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    fn invalid(var: &'static str, value: &str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            var,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub use_persistent_stores: bool,
    pub database_url: Option<String>,
    /// Probability in `0.0..=1.0` that the simulated gateway approves.
    pub payment_approval_rate: f64,
    pub payment_latency_min: Duration,
    pub payment_latency_max: Duration,
    /// Opaque bearer token -> user, for the static identity provider.
    pub api_tokens: Vec<(String, UserId)>,
    pub seed_catalog: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            use_persistent_stores: false,
            database_url: None,
            payment_approval_rate: 0.8,
            payment_latency_min: Duration::from_millis(1000),
            payment_latency_max: Duration::from_millis(3000),
            api_tokens: Vec::new(),
            seed_catalog: true,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from any variable source. Unset variables take their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let bind_addr = match lookup("BIND_ADDR") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|e| ConfigError::invalid("BIND_ADDR", &raw, format!("{e}")))?,
            None => defaults.bind_addr,
        };

        let use_persistent_stores = lookup("USE_PERSISTENT_STORES")
            .map(|raw| parse_bool("USE_PERSISTENT_STORES", &raw))
            .transpose()?
            .unwrap_or(defaults.use_persistent_stores);

        let database_url = lookup("DATABASE_URL").filter(|v| !v.trim().is_empty());
        if use_persistent_stores && database_url.is_none() {
            return Err(ConfigError::Missing {
                var: "DATABASE_URL",
                reason: "USE_PERSISTENT_STORES=true",
            });
        }

        let payment_approval_rate = match lookup("PAYMENT_APPROVAL_RATE") {
            Some(raw) => {
                let rate: f64 = raw
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::invalid("PAYMENT_APPROVAL_RATE", &raw, "not a number"))?;
                if !(0.0..=1.0).contains(&rate) {
                    return Err(ConfigError::invalid(
                        "PAYMENT_APPROVAL_RATE",
                        &raw,
                        "must be between 0.0 and 1.0",
                    ));
                }
                rate
            }
            None => defaults.payment_approval_rate,
        };

        let payment_latency_min = lookup("PAYMENT_LATENCY_MIN_MS")
            .map(|raw| parse_millis("PAYMENT_LATENCY_MIN_MS", &raw))
            .transpose()?
            .unwrap_or(defaults.payment_latency_min);
        let payment_latency_max = lookup("PAYMENT_LATENCY_MAX_MS")
            .map(|raw| parse_millis("PAYMENT_LATENCY_MAX_MS", &raw))
            .transpose()?
            .unwrap_or(defaults.payment_latency_max);
        if payment_latency_min > payment_latency_max {
            return Err(ConfigError::invalid(
                "PAYMENT_LATENCY_MIN_MS",
                &payment_latency_min.as_millis().to_string(),
                "must not exceed PAYMENT_LATENCY_MAX_MS",
            ));
        }

        let api_tokens = match lookup("API_TOKENS") {
            Some(raw) => parse_tokens(&raw)?,
            None => defaults.api_tokens,
        };

        let seed_catalog = lookup("SEED_CATALOG")
            .map(|raw| parse_bool("SEED_CATALOG", &raw))
            .transpose()?
            .unwrap_or(defaults.seed_catalog);

        Ok(Self {
            bind_addr,
            use_persistent_stores,
            database_url,
            payment_approval_rate,
            payment_latency_min,
            payment_latency_max,
            api_tokens,
            seed_catalog,
        })
    }
}

fn parse_bool(var: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::invalid(var, raw, "expected true or false")),
    }
}

fn parse_millis(var: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|_| ConfigError::invalid(var, raw, "expected milliseconds"))
}

/// `token=user-uuid,token2=user-uuid2`
fn parse_tokens(raw: &str) -> Result<Vec<(String, UserId)>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (token, user) = pair
                .split_once('=')
                .ok_or_else(|| ConfigError::invalid("API_TOKENS", raw, "expected token=user-id pairs"))?;
            let token = token.trim();
            if token.is_empty() {
                return Err(ConfigError::invalid("API_TOKENS", raw, "empty token"));
            }
            let user_id = user
                .parse::<UserId>()
                .map_err(|e| ConfigError::invalid("API_TOKENS", raw, e.to_string()))?;
            Ok((token.to_string(), user_id))
        })
        .collect()
}
