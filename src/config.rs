use anyhow::{Context, anyhow};
use std::env;
use std::fmt::Display;
use std::str::FromStr;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    pub run_migrations: bool,

    pub jwt_secret: String,
    /// Expected `aud` claim; `None` disables the audience check.
    pub jwt_audience: Option<String>,

    pub server_addr: String,
    pub api_prefix: String,

    // Rate limiting
    pub rate_protected_per_min: u32,

    // Punch listing
    pub my_punches_limit: u32,
    pub team_punches_limit: u32,
    pub max_punches_limit: u32,

    pub log_dir: String,
    pub log_level: tracing::Level,
}

fn required(key: &str) -> anyhow::Result<String> {
    env::var(key).with_context(|| format!("{key} must be set"))
}

fn or_default<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("{key} has invalid value '{raw}': {e}")),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let jwt_audience = match env::var("JWT_AUDIENCE") {
            Ok(aud) if aud.trim().is_empty() => None,
            Ok(aud) => Some(aud),
            Err(_) => Some("authenticated".to_string()),
        };

        let config = Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            db_max_connections: or_default("DB_MAX_CONNECTIONS", 10)?,
            run_migrations: or_default("RUN_MIGRATIONS", true)?,

            jwt_secret: required("JWT_SECRET")?,
            jwt_audience,

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),

            rate_protected_per_min: or_default("RATE_PROTECTED_PER_MIN", 600)?,

            my_punches_limit: or_default("MY_PUNCHES_LIMIT", 50)?,
            team_punches_limit: or_default("TEAM_PUNCHES_LIMIT", 20)?,
            max_punches_limit: or_default("MAX_PUNCHES_LIMIT", 500)?,

            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
            log_level: or_default("LOG_LEVEL", tracing::Level::DEBUG)?,
        };

        if config.max_punches_limit == 0 {
            return Err(anyhow!("MAX_PUNCHES_LIMIT must be at least 1"));
        }

        Ok(config)
    }
}
