use std::{env, fmt::Display, str::FromStr};

use anyhow::{anyhow, bail, Context, Result};
use tracing::{info, warn};

const DEV_JWT_SECRET: &str = "dev-secret-change-me";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Postgres,
    Memory,
}

impl FromStr for StoreKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreKind::Postgres),
            "memory" => Ok(StoreKind::Memory),
            other => Err(format!("unknown record store '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub store: StoreKind,
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub jwt_secret: String,
    pub token_ttl_days: i64,
    pub timeline_page_size: i64,
    pub list_page_size: i64,
}

impl Config {
    pub fn load() -> Result<Self> {
        let store: StoreKind = try_load("RECORD_STORE", "postgres")?;

        let database_url = env::var("DATABASE_URL").ok();
        if store == StoreKind::Postgres && database_url.is_none() {
            bail!("DATABASE_URL must be set when RECORD_STORE=postgres");
        }

        let jwt_secret = match (env::var("JWT_SECRET"), store) {
            (Ok(secret), _) => secret,
            (Err(_), StoreKind::Postgres) => bail!("JWT_SECRET must be set when RECORD_STORE=postgres"),
            (Err(_), StoreKind::Memory) => {
                warn!("JWT_SECRET not set, using the development secret");
                DEV_JWT_SECRET.to_string()
            }
        };

        Ok(Self {
            port: try_load("PORT", "3050")?,
            store,
            database_url,
            max_connections: try_load("DB_MAX_CONNECTIONS", "5")?,
            jwt_secret,
            token_ttl_days: try_load("TOKEN_TTL_DAYS", "30")?,
            timeline_page_size: try_load("TIMELINE_PAGE_SIZE", "20")?,
            list_page_size: try_load("LIST_PAGE_SIZE", "10")?,
        })
    }

    /// In-memory configuration used by local runs and tests.
    pub fn in_memory() -> Self {
        Self {
            port: 3050,
            store: StoreKind::Memory,
            database_url: None,
            max_connections: 5,
            jwt_secret: DEV_JWT_SECRET.to_string(),
            token_ttl_days: 30,
            timeline_page_size: 20,
            list_page_size: 10,
        }
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T>
where
    T::Err: Display,
{
    let raw = env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.parse()
        .map_err(|e| anyhow!("{e}"))
        .with_context(|| format!("Invalid {key} value: {raw}"))
}
