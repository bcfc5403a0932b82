//! Configuration management for the PAJSK report server
//!
//! Configuration is read once at startup, validated, and then passed down
//! through [`crate::state::AppState`]. Nothing else in the crate reads the
//! process environment.

use std::env;
use std::fmt;
use std::time::Duration;

use chrono::Datelike;
use serde::Serialize;
use thiserror::Error;

/// Default lifetime of a signed report link (1 hour)
pub const DEFAULT_SIGNED_URL_EXPIRY_SECS: u64 = 3600;

/// Upper bound accepted by S3 presigning (7 days)
const MAX_SIGNED_URL_EXPIRY_SECS: u64 = 7 * 24 * 3600;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: Option<StorageConfig>,
    pub report: ReportConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    /// Table holding one row per student, keyed by `id_card`
    pub records_table: String,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub provider: StorageProvider,
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageProvider {
    Minio,
    R2,
    S3,
    B2,
    Supabase,
}

/// How a found record is delivered to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    /// Return a time-limited link to a pre-generated PDF in object storage
    Link,
    /// Stream a PDF generated from the record's fields
    Render,
}

impl DeliveryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryMode::Link => "link",
            DeliveryMode::Render => "render",
        }
    }
}

impl fmt::Display for DeliveryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub mode: DeliveryMode,
    /// Key prefix of stored reports: `<prefix>/<identifier>.pdf`
    pub reports_prefix: String,
    pub signed_url_expiry: Duration,
    /// Prefix of the generated file name: `<prefix>_<identifier>.pdf`
    pub filename_prefix: String,
    /// Year printed in the generated report title
    pub year: i32,
}

impl Config {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    ///
    /// Empty values are treated the same as unset ones.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mode = match get("DELIVERY_MODE").as_deref() {
            None | Some("link") => DeliveryMode::Link,
            Some("render") => DeliveryMode::Render,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "DELIVERY_MODE",
                    reason: format!("expected `link` or `render`, got `{}`", other),
                })
            }
        };

        let server = ServerConfig {
            host: get("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or("SERVER_PORT", get("SERVER_PORT"), 3000)?,
        };

        let records_table = get("RECORDS_TABLE").unwrap_or_else(|| "pajsk_records".to_string());
        if !is_sql_identifier(&records_table) {
            return Err(ConfigError::Invalid {
                key: "RECORDS_TABLE",
                reason: format!("`{}` is not a plain table name", records_table),
            });
        }

        let database = DatabaseConfig {
            url: get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?,
            max_connections: parse_or("DATABASE_MAX_CONNECTIONS", get("DATABASE_MAX_CONNECTIONS"), 5)?,
            records_table,
        };

        let storage = match get("S3_ENDPOINT") {
            Some(endpoint) => Some(StorageConfig {
                provider: match get("S3_PROVIDER").as_deref() {
                    Some("minio") => StorageProvider::Minio,
                    Some("r2") => StorageProvider::R2,
                    Some("b2") => StorageProvider::B2,
                    Some("supabase") => StorageProvider::Supabase,
                    _ => StorageProvider::S3,
                },
                endpoint,
                bucket: get("S3_BUCKET").unwrap_or_else(|| "pajsk-reports".to_string()),
                access_key: get("S3_ACCESS_KEY").ok_or(ConfigError::Missing("S3_ACCESS_KEY"))?,
                secret_key: get("S3_SECRET_KEY").ok_or(ConfigError::Missing("S3_SECRET_KEY"))?,
                region: get("S3_REGION"),
            }),
            None => None,
        };

        if mode == DeliveryMode::Link && storage.is_none() {
            return Err(ConfigError::Missing("S3_ENDPOINT"));
        }

        let expiry_secs = parse_or(
            "SIGNED_URL_EXPIRY_SECONDS",
            get("SIGNED_URL_EXPIRY_SECONDS"),
            DEFAULT_SIGNED_URL_EXPIRY_SECS,
        )?;
        if expiry_secs == 0 || expiry_secs > MAX_SIGNED_URL_EXPIRY_SECS {
            return Err(ConfigError::Invalid {
                key: "SIGNED_URL_EXPIRY_SECONDS",
                reason: format!("must be between 1 and {}", MAX_SIGNED_URL_EXPIRY_SECS),
            });
        }

        let reports_prefix = get("REPORTS_PREFIX")
            .map(|p| p.trim_matches('/').to_string())
            .unwrap_or_else(|| "reports".to_string());

        let report = ReportConfig {
            mode,
            reports_prefix,
            signed_url_expiry: Duration::from_secs(expiry_secs),
            filename_prefix: get("REPORT_FILENAME_PREFIX").unwrap_or_else(|| "PAJSK_Report".to_string()),
            year: parse_or("REPORT_YEAR", get("REPORT_YEAR"), chrono::Utc::now().year())?,
        };

        Ok(Config {
            server,
            database,
            storage,
            report,
        })
    }
}

fn parse_or<T>(key: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    match value {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

/// `table` or `schema.table`, ASCII letters, digits and underscores only
fn is_sql_identifier(name: &str) -> bool {
    let parts: Vec<&str> = name.split('.').collect();
    parts.len() <= 2
        && parts.iter().all(|part| {
            !part.is_empty()
                && !part.starts_with(|c: char| c.is_ascii_digit())
                && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}
