use secrecy::Secret;
use serde::Deserialize;
use service_core::config::{self as core_config, get_env, get_env_parsed};
use service_core::error::AppError;
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone, Deserialize)]
pub struct BillConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub storage: StorageBackend,
    pub mongodb: MongoConfig,
    pub jwt: JwtConfig,
    pub log_level: String,
    /// Traces are exported only when set.
    pub otlp_endpoint: Option<String>,
}

/// Where bills, counters and users live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Mongodb,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mongodb" | "mongo" => Ok(StorageBackend::Mongodb),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(format!("expected 'mongodb' or 'memory', got '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MongoConfig {
    /// May carry credentials.
    pub uri: Secret<String>,
    pub database: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: Secret<String>,
    pub access_token_expiry_minutes: i64,
}

impl BillConfig {
    pub fn load() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;
        let is_prod = common.is_production();

        let storage: StorageBackend = get_env_parsed("STORAGE_BACKEND", "mongodb", is_prod)?;

        // The memory backend never touches MongoDB, so its settings are optional.
        let mongo_required = is_prod && storage == StorageBackend::Mongodb;
        let mongodb = MongoConfig {
            uri: Secret::new(get_env(
                "MONGODB_URI",
                Some("mongodb://localhost:27017"),
                mongo_required,
            )?),
            database: get_env("MONGODB_DATABASE", Some("bill_db"), mongo_required)?,
        };

        let jwt = JwtConfig {
            secret: Secret::new(get_env(
                "JWT_SECRET",
                Some("dev-only-secret-change-me-0123456789"),
                is_prod,
            )?),
            access_token_expiry_minutes: get_env_parsed(
                "JWT_ACCESS_TOKEN_EXPIRY_MINUTES",
                "720",
                is_prod,
            )?,
        };

        Ok(BillConfig {
            common,
            storage,
            mongodb,
            jwt,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|e| !e.trim().is_empty()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_backend_parses_case_insensitively() {
        assert_eq!("MEMORY".parse::<StorageBackend>(), Ok(StorageBackend::Memory));
        assert_eq!("mongo".parse::<StorageBackend>(), Ok(StorageBackend::Mongodb));
        assert!("redis".parse::<StorageBackend>().is_err());
    }

    #[test]
    fn secrets_are_redacted_in_debug() {
        let jwt = JwtConfig {
            secret: Secret::new("super-secret".to_string()),
            access_token_expiry_minutes: 5,
        };
        let mongodb = MongoConfig {
            uri: Secret::new("mongodb://admin:hunter2@db:27017".to_string()),
            database: "bill_db".to_string(),
        };

        let printed = format!("{jwt:?} {mongodb:?}");
        assert!(!printed.contains("super-secret"));
        assert!(!printed.contains("hunter2"));
        assert!(printed.contains("bill_db"));
    }
}
