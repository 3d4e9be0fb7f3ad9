//! # Server Configuration
//!
//! Settings come from an optional TOML file and the process environment;
//! environment variables win over the file.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `PORT` | `3001` |
//! | `NODE_ENV` | `development` |
//! | `JWT_SECRET` | development secret (required in production) |
//! | `FRONTEND_URL` | localhost origins |
//! | `ADMIN_EMAIL` / `ADMIN_PASSWORD` / `ADMIN_NAME` | development admin |
//! | `CASEFILE_RATE_LIMIT` | `100` requests/second, `0` disables |
//! | `CASEFILE_UPLOAD_DIR` | `uploads` |

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 3001;

/// Default global rate limit (requests per second).
pub const DEFAULT_RATE_LIMIT: u32 = 100;

const DEV_JWT_SECRET: &str = "casefile-development-secret";
const DEV_ADMIN_EMAIL: &str = "admin@casefile.local";
const DEV_ADMIN_PASSWORD: &str = "admin";
const DEV_ADMIN_NAME: &str = "Administrator";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("JWT_SECRET must be set when NODE_ENV=production")]
    MissingJwtSecret,

    #[error("ADMIN_PASSWORD must be set when NODE_ENV=production")]
    MissingAdminPassword,

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },

    #[error("Cannot read config file '{path}': {reason}")]
    Read { path: String, reason: String },

    #[error("Invalid config file '{path}': {reason}")]
    Parse { path: String, reason: String },
}

/// The single admin principal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminAccount {
    pub email: String,
    pub password: String,
    pub name: String,
}

/// Resolved server settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    pub environment: String,
    pub jwt_secret: String,
    /// Allowed CORS origins (comma-separated), or `*`.
    pub frontend_url: Option<String>,
    pub admin: AdminAccount,
    pub rate_limit: u32,
    pub upload_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            environment: "development".to_string(),
            jwt_secret: DEV_JWT_SECRET.to_string(),
            frontend_url: None,
            admin: AdminAccount {
                email: DEV_ADMIN_EMAIL.to_string(),
                password: DEV_ADMIN_PASSWORD.to_string(),
                name: DEV_ADMIN_NAME.to_string(),
            },
            rate_limit: DEFAULT_RATE_LIMIT,
            upload_dir: PathBuf::from("uploads"),
        }
    }
}

/// Keys accepted in `casefile.toml`. All optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub port: Option<u16>,
    pub environment: Option<String>,
    pub jwt_secret: Option<String>,
    pub frontend_url: Option<String>,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
    pub admin_name: Option<String>,
    pub rate_limit: Option<u32>,
    pub upload_dir: Option<PathBuf>,
}

impl FileConfig {
    pub fn from_toml(text: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml(&text, path)
    }
}

impl ServerConfig {
    /// Load from an optional file plus the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(p) => FileConfig::read(p)?,
            None => FileConfig::default(),
        };
        Self::resolve(file, |key| std::env::var(key).ok())
    }

    /// Merge `file` with variables looked up through `env`.
    pub fn resolve(
        file: FileConfig,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let var = |key: &str| env(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let port = match var("PORT") {
            Some(raw) => parse_number("PORT", &raw)?,
            None => file.port.unwrap_or(defaults.port),
        };
        let rate_limit = match var("CASEFILE_RATE_LIMIT") {
            Some(raw) => parse_number("CASEFILE_RATE_LIMIT", &raw)?,
            None => file.rate_limit.unwrap_or(defaults.rate_limit),
        };
        let environment = var("NODE_ENV")
            .or(file.environment)
            .unwrap_or(defaults.environment);
        let production = environment == "production";

        let jwt_secret = match var("JWT_SECRET").or(file.jwt_secret) {
            Some(secret) => secret,
            None if production => return Err(ConfigError::MissingJwtSecret),
            None => {
                tracing::warn!("JWT_SECRET not set, using the development secret");
                defaults.jwt_secret
            }
        };
        let password = match var("ADMIN_PASSWORD").or(file.admin_password) {
            Some(password) => password,
            None if production => return Err(ConfigError::MissingAdminPassword),
            None => defaults.admin.password,
        };

        Ok(Self {
            port,
            environment,
            jwt_secret,
            frontend_url: var("FRONTEND_URL").or(file.frontend_url),
            admin: AdminAccount {
                email: var("ADMIN_EMAIL")
                    .or(file.admin_email)
                    .unwrap_or(defaults.admin.email),
                password,
                name: var("ADMIN_NAME")
                    .or(file.admin_name)
                    .unwrap_or(defaults.admin.name),
            },
            rate_limit,
            upload_dir: var("CASEFILE_UPLOAD_DIR")
                .map(PathBuf::from)
                .or(file.upload_dir)
                .unwrap_or(defaults.upload_dir),
        })
    }

    #[must_use]
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

fn parse_number<T: std::str::FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: raw.to_string(),
    })
}

// =============================================================================
// TESTS
// =============================================================================
