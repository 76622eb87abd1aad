// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process configuration from environment variables.
//!
//! Both the API server and the worker read the same variables; missing
//! ones fall back to local-development defaults. `JWT_SECRET` is the
//! only variable without a default; the server refuses to start
//! without it.

use std::env;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("JWT_SECRET must be set")]
    MissingJwtSecret,
    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub logging: LoggingConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    pub idle_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
    pub sslmode: String,
    pub schema: String,
}

#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
    pub password: String,
    pub db: u32,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .finish()
    }
}

impl Config {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            server: ServerConfig {
                port: env_parse("SERVER_PORT", 8080)?,
                read_timeout: env_duration("SERVER_READ_TIMEOUT", Duration::from_secs(30))?,
                write_timeout: env_duration("SERVER_WRITE_TIMEOUT", Duration::from_secs(30))?,
                idle_timeout: env_duration("SERVER_IDLE_TIMEOUT", Duration::from_secs(60))?,
            },
            database: DatabaseConfig {
                host: env_or("DB_HOST", "localhost"),
                port: env_parse("DB_PORT", 5432)?,
                user: env_or("DB_USER", "postgres"),
                password: env_or("DB_PASSWORD", "root"),
                name: env_or("DB_NAME", "postgres"),
                sslmode: env_or("DB_SSLMODE", "disable"),
                schema: env_or("DB_SCHEMA", "deploy_knot"),
            },
            redis: RedisConfig {
                host: env_or("REDIS_HOST", "localhost"),
                port: env_parse("REDIS_PORT", 6379)?,
                password: env_or("REDIS_PASSWORD", ""),
                db: env_parse("REDIS_DB", 0)?,
            },
            logging: LoggingConfig {
                level: env_or("LOG_LEVEL", "info"),
            },
            auth: AuthConfig {
                jwt_secret: env::var("JWT_SECRET").map_err(|_| ConfigError::MissingJwtSecret)?,
            },
        })
    }

    /// Postgres connection string, including the schema search path.
    pub fn database_url(&self) -> String {
        let d = &self.database;
        format!(
            "postgres://{}:{}@{}:{}/{}?sslmode={}&options=-csearch_path%3D{}",
            d.user, d.password, d.host, d.port, d.name, d.sslmode, d.schema
        )
    }

    /// Redis connection string.
    pub fn redis_url(&self) -> String {
        let r = &self.redis;
        if r.password.is_empty() {
            format!("redis://{}:{}/{}", r.host, r.port, r.db)
        } else {
            format!("redis://:{}@{}:{}/{}", r.password, r.host, r.port, r.db)
        }
    }
}

fn env_or(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_parse<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(v) if !v.is_empty() => v.parse().map_err(|_| ConfigError::Invalid {
            name,
            value: v.clone(),
        }),
        _ => Ok(default),
    }
}

fn env_duration(name: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    match env::var(name) {
        Ok(v) if !v.is_empty() => parse_duration(&v).ok_or(ConfigError::Invalid {
            name,
            value: v.clone(),
        }),
        _ => Ok(default),
    }
}

/// Parse `500ms`, `30s`, `5m`, `2h`, or a bare number of seconds.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(ms) = s.strip_suffix("ms") {
        return ms.trim().parse::<u64>().ok().map(Duration::from_millis);
    }
    let (number, unit) = match s.char_indices().rfind(|(_, c)| c.is_ascii_digit()) {
        Some((i, _)) => s.split_at(i + 1),
        None => return None,
    };
    let n: u64 = number.parse().ok()?;
    match unit.trim() {
        "" | "s" => Some(Duration::from_secs(n)),
        "m" => Some(Duration::from_secs(n * 60)),
        "h" => Some(Duration::from_secs(n * 3600)),
        _ => None,
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
