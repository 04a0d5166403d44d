//! Process configuration.
//!
//! Values are resolved once at startup. Each key is looked up in the
//! environment first (a `.env` file is loaded by `main` via `dotenv`), then in
//! the JSON settings file named by `TASKDECK_SETTINGS` (default
//! `config/settings.json`), then falls back to a default where one exists.
//! The JWT signing key, issuer and audience have no default: if any is missing
//! [`Config::load`] fails and the server refuses to start.

use std::{env, fs, io, path::Path};

use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_SETTINGS_PATH: &str = "config/settings.json";
pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const DEFAULT_MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} has an invalid value: {value}")]
    Invalid { key: &'static str, value: String },
    #[error("failed to read settings file {path}: {message}")]
    SettingsFile { path: String, message: String },
}

/// Token signing material shared by the issuer and the validator.
#[derive(Clone)]
pub struct JwtSettings {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
}

// Keeps the signing key out of logs.
impl std::fmt::Debug for JwtSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtSettings")
            .field("secret", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub server_port: u16,
    pub server_host: String,
    pub jwt: JwtSettings,
    pub max_page_size: i64,
    /// Empty means "allow any origin", which is only meant for development.
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct FileSettings {
    database_url: Option<String>,
    database_max_connections: Option<u32>,
    server_host: Option<String>,
    server_port: Option<u16>,
    jwt: FileJwtSettings,
    max_page_size: Option<i64>,
    cors: FileCorsSettings,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileJwtSettings {
    key: Option<String>,
    issuer: Option<String>,
    audience: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct FileCorsSettings {
    allowed_origins: Option<Vec<String>>,
}

impl FileSettings {
    /// A missing file is treated as empty; an unreadable or malformed one is an error.
    fn read(path: &Path) -> Result<Self, ConfigError> {
        let settings_error = |message: String| ConfigError::SettingsFile {
            path: path.display().to_string(),
            message,
        };
        match fs::read_to_string(path) {
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| settings_error(e.to_string())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(settings_error(e.to_string())),
        }
    }
}

fn parse<T: std::str::FromStr>(key: &'static str, raw: String) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { key, value: raw })
}

impl Config {
    /// Resolves configuration from the process environment and the settings file.
    pub fn load() -> Result<Self, ConfigError> {
        let path = env::var("TASKDECK_SETTINGS").unwrap_or_else(|_| DEFAULT_SETTINGS_PATH.to_string());
        let file = FileSettings::read(Path::new(&path))?;
        Self::resolve(|key| env::var(key).ok(), file)
    }

    fn resolve<F>(lookup: F, file: FileSettings) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Blank environment values count as unset.
        let env = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let required = |key: &'static str, fallback: Option<String>| {
            env(key)
                .or(fallback.filter(|value| !value.trim().is_empty()))
                .ok_or(ConfigError::Missing(key))
        };

        let jwt = JwtSettings {
            secret: required("JWT_SECRET_KEY", file.jwt.key)?,
            issuer: required("JWT_ISSUER", file.jwt.issuer)?,
            audience: required("JWT_AUDIENCE", file.jwt.audience)?,
        };

        let server_port = match env("SERVER_PORT") {
            Some(raw) => parse("SERVER_PORT", raw)?,
            None => file.server_port.unwrap_or(8080),
        };
        let database_max_connections = match env("DATABASE_MAX_CONNECTIONS") {
            Some(raw) => parse("DATABASE_MAX_CONNECTIONS", raw)?,
            None => file.database_max_connections.unwrap_or(10),
        };
        let max_page_size = match env("MAX_PAGE_SIZE") {
            Some(raw) => parse("MAX_PAGE_SIZE", raw)?,
            None => file.max_page_size.unwrap_or(DEFAULT_MAX_PAGE_SIZE),
        };
        if max_page_size < 1 {
            return Err(ConfigError::Invalid {
                key: "MAX_PAGE_SIZE",
                value: max_page_size.to_string(),
            });
        }

        let cors_allowed_origins = match env("CORS_ALLOWED_ORIGINS") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(String::from)
                .collect(),
            None => file.cors.allowed_origins.unwrap_or_default(),
        };

        Ok(Self {
            database_url: required("DATABASE_URL", file.database_url)?,
            database_max_connections,
            server_port,
            server_host: env("SERVER_HOST")
                .or(file.server_host)
                .unwrap_or_else(|| "127.0.0.1".to_string()),
            jwt,
            max_page_size,
            cors_allowed_origins,
        })
    }

    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.server_host, self.server_port)
    }
}
