use std::env;

/// Service configuration, read from the environment (and `.env`, via `dotenvy`).
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection string
    pub database_url: String,

    pub host: String,

    pub port: u16,

    /// Upper bound of the r2d2 pool
    pub db_pool_max_size: u32,

    /// When false, decrements that would take stock below zero are refused
    pub allow_negative_stock: bool,
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
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
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        Ok(Config {
            database_url: lookup("DATABASE_URL")
                .ok_or_else(|| ConfigError::MissingRequired("DATABASE_URL".to_string()))?,

            host: get("HOST", "0.0.0.0"),

            port: get("PORT", "8080")
                .parse()
                .map_err(|_| ConfigError::InvalidValue("PORT".to_string()))?,

            db_pool_max_size: get("DB_POOL_MAX_SIZE", "10")
                .parse::<u32>()
                .ok()
                .filter(|size| *size > 0)
                .ok_or_else(|| ConfigError::InvalidValue("DB_POOL_MAX_SIZE".to_string()))?,

            allow_negative_stock: get("ALLOW_NEGATIVE_STOCK", "true")
                .parse()
                .map_err(|_| ConfigError::InvalidValue("ALLOW_NEGATIVE_STOCK".to_string()))?,
        })
    }
}
