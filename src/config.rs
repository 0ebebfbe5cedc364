use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    pub leaderboard_size: usize,
    pub admin_page_size: i64,
    pub bootstrap_admin: Option<BootstrapAdmin>,
    /// Billing webhook signing secret. Without it every webhook is rejected.
    pub stripe_webhook_secret: Option<String>,
}

/// Admin account seeded at startup when no user with that email exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapAdmin {
    pub username: String,
    pub email: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("8080")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let database_path = env_map
            .get("DATABASE_PATH")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("DATABASE_PATH".to_string()))?;

        let leaderboard_size = env_map
            .get("LEADERBOARD_SIZE")
            .map(|s| s.as_str())
            .unwrap_or("10")
            .parse::<usize>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "LEADERBOARD_SIZE".to_string(),
                    "must be a positive integer".to_string(),
                )
            })?;

        let admin_page_size = env_map
            .get("ADMIN_PAGE_SIZE")
            .map(|s| s.as_str())
            .unwrap_or("10")
            .parse::<i64>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "ADMIN_PAGE_SIZE".to_string(),
                    "must be a positive integer".to_string(),
                )
            })?;

        let bootstrap_admin = env_map
            .get("BOOTSTRAP_ADMIN")
            .map(|s| parse_bootstrap_admin(s))
            .transpose()?;

        let stripe_webhook_secret = env_map
            .get("STRIPE_WEBHOOK_SECRET")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Ok(Config {
            port,
            database_path,
            leaderboard_size,
            admin_page_size,
            bootstrap_admin,
            stripe_webhook_secret,
        })
    }
}

/// Parse `username:email`.
fn parse_bootstrap_admin(raw: &str) -> Result<BootstrapAdmin, ConfigError> {
    let invalid = || {
        ConfigError::InvalidValue(
            "BOOTSTRAP_ADMIN".to_string(),
            "must be username:email".to_string(),
        )
    };

    let (username, email) = raw.split_once(':').ok_or_else(invalid)?;
    let (username, email) = (username.trim(), email.trim());
    if username.is_empty() || !email.contains('@') {
        return Err(invalid());
    }

    Ok(BootstrapAdmin {
        username: username.to_string(),
        email: email.to_string(),
    })
}
