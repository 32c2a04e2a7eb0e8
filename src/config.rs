// config.rs
use std::env;
use std::time::Duration;

use crate::errors::{AppError, Result};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub database_name: String,
    pub jwt_secret: String,
    pub host: String,
    pub port: u16,
    pub outbox_interval: Duration,
    pub outbox_batch_size: i64,
}

impl AppConfig {
    /// Reads the configuration from the environment (and `.env` if present).
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(AppConfig {
            database_url: required("DATABASE_URL")?,
            database_name: env::var("DATABASE_NAME").unwrap_or_else(|_| "academy".to_string()),
            jwt_secret: required("JWT_SECRET")?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parsed("PORT", 3000)?,
            outbox_interval: Duration::from_secs(positive("OUTBOX_INTERVAL_SECS", 30u64)?),
            outbox_batch_size: positive("OUTBOX_BATCH_SIZE", 50i64)?,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn get_config_info(&self) -> serde_json::Value {
        serde_json::json!({
            "database_name": self.database_name,
            "database_url_set": !self.database_url.is_empty(),
            "jwt_secret_set": !self.jwt_secret.is_empty(),
            "host": self.host,
            "port": self.port,
            "outbox_interval_secs": self.outbox_interval.as_secs(),
            "outbox_batch_size": self.outbox_batch_size,
        })
    }
}

fn required(key: &str) -> Result<String> {
    env::var(key)
        .ok()
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::configuration(format!("{} must be set", key)))
}

fn parsed<T: std::str::FromStr>(key: &str, default: T) -> Result<T> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::configuration(format!("{} must be a number, got {:?}", key, raw))),
        Err(_) => Ok(default),
    }
}

fn positive<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr + PartialOrd + Default + std::fmt::Display,
{
    let value = parsed(key, default)?;
    if value <= T::default() {
        return Err(AppError::configuration(format!(
            "{} must be greater than zero, got {}",
            key, value
        )));
    }
    Ok(value)
}
