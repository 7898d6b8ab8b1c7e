use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::rate_limit::DEFAULT_DAILY_LIMIT;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    /// Prefix used when building short URLs in responses.
    pub public_base_url: String,
    /// Exact origins allowed by CORS; `None` allows any origin.
    pub allowed_origins: Option<Vec<String>>,
    pub rate_limit_per_day: u64,
    pub snapshots: SnapshotConfig,
    pub geo: GeoConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotConfig {
    pub counter_file: PathBuf,
    pub tally_file: PathBuf,
    pub links_file: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoConfig {
    pub api_base: String,
    pub timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "5000".to_string())
            .parse::<u16>()?;

        let public_base_url = std::env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| format!("http://localhost:{port}"));

        let allowed_origins = std::env::var("ALLOWED_ORIGINS").ok().and_then(|raw| {
            let origins: Vec<String> = raw
                .split(',')
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect();
            if origins.is_empty() {
                None
            } else {
                Some(origins)
            }
        });

        let rate_limit_per_day = std::env::var("RATE_LIMIT_PER_DAY")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_DAILY_LIMIT);

        let counter_file = PathBuf::from(
            std::env::var("COUNTER_FILE").unwrap_or_else(|_| "data/recent_uuid.tmp".to_string()),
        );
        let tally_file = PathBuf::from(
            std::env::var("TALLY_FILE").unwrap_or_else(|_| "data/country_counts.tmp".to_string()),
        );
        let links_file = PathBuf::from(
            std::env::var("LINKS_FILE").unwrap_or_else(|_| "data/url_mappings.json".to_string()),
        );

        let api_base =
            std::env::var("GEO_API_BASE").unwrap_or_else(|_| "https://ipapi.co".to_string());
        let timeout_secs = std::env::var("GEO_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(2);

        Ok(Config {
            server: ServerConfig { host, port },
            public_base_url,
            allowed_origins,
            rate_limit_per_day,
            snapshots: SnapshotConfig {
                counter_file,
                tally_file,
                links_file,
            },
            geo: GeoConfig {
                api_base,
                timeout_secs,
            },
        })
    }
}
