//! Environment-driven server configuration.

use std::{
    net::{IpAddr, Ipv4Addr},
    num::{NonZeroU32, NonZeroU64},
    str::FromStr,
    time::Duration,
};

use labshell_transport::rate_limit::{DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW};

/// Default listening port.
pub const DEFAULT_PORT: u16 = 3000;

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    /// Preload the demo lab machines.
    pub seed_demo_sessions: bool,
    pub rate_limit_max: u32,
    pub rate_limit_window: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            seed_demo_sessions: true,
            rate_limit_max: DEFAULT_MAX_REQUESTS,
            rate_limit_window: DEFAULT_WINDOW,
        }
    }
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    /// Returns error if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    /// Returns error if a variable is set but cannot be parsed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let defaults = Self::default();

        Ok(Self {
            host: parse_var(&lookup, "HOST")?.unwrap_or(defaults.host),
            port: parse_var(&lookup, "PORT")?.unwrap_or(defaults.port),
            seed_demo_sessions: parse_var(&lookup, "SEED_DEMO_SESSIONS")?
                .unwrap_or(defaults.seed_demo_sessions),
            // Zero would block every request, or never limit anything.
            rate_limit_max: parse_var(&lookup, "RATE_LIMIT_MAX")?
                .map_or(defaults.rate_limit_max, NonZeroU32::get),
            rate_limit_window: parse_var(&lookup, "RATE_LIMIT_WINDOW_SECS")?
                .map_or(defaults.rate_limit_window, |secs: NonZeroU64| {
                    Duration::from_secs(secs.get())
                }),
        })
    }
}

fn parse_var<F, T>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&'static str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(None),
        Some(value) if value.trim().is_empty() => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}
