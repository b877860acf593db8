use std::env;

/// Default avatar upload ceiling in bytes.
pub const DEFAULT_AVATAR_MAX_BYTES: usize = 40_000_000;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} is invalid: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection string. When absent the server keeps its data in memory.
    pub database_url: Option<String>,
    pub server_port: u16,
    pub server_host: String,
    /// Secret used to sign session tokens.
    pub jwt_secret: String,
    /// Optional token lifetime. `None` keeps tokens valid until they are revoked.
    pub token_ttl_hours: Option<i64>,
    pub avatar_max_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = lookup("JWT_SECRET")
            .filter(|secret| !secret.trim().is_empty())
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let server_port = match lookup("SERVER_PORT") {
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                name: "SERVER_PORT",
                value,
            })?,
            None => 8080,
        };

        let token_ttl_hours = match lookup("TOKEN_TTL_HOURS") {
            Some(value) => match value.parse::<i64>() {
                Ok(hours) if hours > 0 => Some(hours),
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "TOKEN_TTL_HOURS",
                        value,
                    })
                }
            },
            None => None,
        };

        let avatar_max_bytes = match lookup("AVATAR_MAX_BYTES") {
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                name: "AVATAR_MAX_BYTES",
                value,
            })?,
            None => DEFAULT_AVATAR_MAX_BYTES,
        };

        Ok(Self {
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
            server_port,
            server_host: lookup("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            jwt_secret,
            token_ttl_hours,
            avatar_max_bytes,
        })
    }

    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.server_host, self.server_port)
    }
}
