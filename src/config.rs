use chrono::FixedOffset;
use std::{env, path::PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct AdminSeed {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub admin_seed: Option<AdminSeed>,
    pub session_ttl_hours: i64,
    pub utc_offset: FixedOffset,
    pub static_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the config from any variable source, so tests don't touch the process env.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let port = parse_or(&lookup, "PORT", 3000u16)?;
        let session_ttl_hours = parse_or(&lookup, "SESSION_TTL_HOURS", 12i64)?;

        let offset_minutes = parse_or(&lookup, "UTC_OFFSET_MINUTES", -180i32)?;
        let utc_offset =
            FixedOffset::east_opt(offset_minutes * 60).ok_or_else(|| ConfigError::Invalid {
                name: "UTC_OFFSET_MINUTES",
                value: offset_minutes.to_string(),
            })?;

        let admin_seed = match (lookup("ADMIN_EMAIL"), lookup("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) if !email.is_empty() && !password.is_empty() => {
                Some(AdminSeed { email, password })
            }
            _ => None,
        };

        let static_dir = lookup("STATIC_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("templates"));

        Ok(Config {
            database_url,
            port,
            admin_seed,
            session_ttl_hours,
            utc_offset,
            static_dir,
        })
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}
