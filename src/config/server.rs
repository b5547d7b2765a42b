//! Process settings read from the environment (optionally a `.env` file).

use crate::error::ConfigError;
use std::net::{IpAddr, SocketAddr};

const DEFAULT_MODEL: &str = "musicos";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Built-in model name or path to a model JSON file.
    pub model: String,
    /// Overrides the model's own database URL when set.
    pub database_url: Option<String>,
    pub host: IpAddr,
    pub port: u16,
    pub max_connections: u32,
    pub body_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            model: DEFAULT_MODEL.into(),
            database_url: None,
            host: IpAddr::from([0, 0, 0, 0]),
            port: DEFAULT_PORT,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("HOST").unwrap_or_else(|| DEFAULT_HOST.into());
        let host: IpAddr = host
            .parse()
            .map_err(|_| ConfigError::Validation(format!("HOST is not an IP address: {}", host)))?;
        Ok(ServerConfig {
            model: lookup("MODEL").unwrap_or_else(|| DEFAULT_MODEL.into()),
            database_url: lookup("DATABASE_URL").filter(|s| !s.is_empty()),
            host,
            port: parse_or("PORT", lookup("PORT"), DEFAULT_PORT)?,
            max_connections: parse_or(
                "DB_MAX_CONNECTIONS",
                lookup("DB_MAX_CONNECTIONS"),
                DEFAULT_MAX_CONNECTIONS,
            )?,
            body_limit: parse_or("BODY_LIMIT_BYTES", lookup("BODY_LIMIT_BYTES"), DEFAULT_BODY_LIMIT)?,
        })
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, raw: Option<String>, default: T) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(s) => s
            .parse()
            .map_err(|_| ConfigError::Validation(format!("{} must be a number, got '{}'", key, s))),
    }
}
