use anyhow::Result;
use std::path::PathBuf;

const DEFAULT_DB_NAME: &str = "solar_monitoring";

#[derive(Debug, Clone)]
pub struct PvConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub log_dir: PathBuf,
    pub log_file_enabled: bool,
}

impl PvConfig {
    pub fn from_env() -> Result<Self> {
        let database_url = env_optional_string("PV_DATABASE_URL")
            .or_else(|| env_optional_string("DATABASE_URL"))
            .unwrap_or_else(database_url_from_parts);

        let db_max_connections = env_u32("PV_DB_MAX_CONNECTIONS", 10);
        if db_max_connections == 0 {
            anyhow::bail!("PV_DB_MAX_CONNECTIONS must be at least 1");
        }

        let log_dir = PathBuf::from(env_string("PV_LOG_DIR", "logs"));
        if log_dir.as_os_str().is_empty() {
            anyhow::bail!("PV_LOG_DIR resolved to an empty path");
        }

        Ok(Self {
            database_url,
            db_max_connections,
            log_dir,
            log_file_enabled: env_bool("PV_LOG_FILE_ENABLED", true),
        })
    }

    pub fn log_file_path(&self) -> PathBuf {
        self.log_dir.join("app.log")
    }
}

fn database_url_from_parts() -> String {
    let host = env_string("DB_HOST", "localhost");
    let port = env_u16("DB_PORT", 5432);
    let username = env_string("DB_USERNAME", "postgres");
    let password = env_string("DB_PASSWORD", "postgres");
    let name = env_string("DB_NAME", DEFAULT_DB_NAME);
    format!("postgresql://{username}:{password}@{host}:{port}/{name}")
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_optional_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key)
        .ok()
        .map(|value| value.trim().to_lowercase())
    {
        Some(value) if value == "1" || value == "true" || value == "yes" => true,
        Some(value) if value == "0" || value == "false" || value == "no" => false,
        _ => default,
    }
}

fn env_u16(key: &str, default: u16) -> u16 {
    std::env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<u16>().ok())
        .unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<u32>().ok())
        .unwrap_or(default)
}
