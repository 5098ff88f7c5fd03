use std::env;
use std::path::PathBuf;

use anyhow::Context;
use tracing::{info, warn};

pub struct Config {
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub catalog_path: Option<PathBuf>,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: var("DATABASE_URL"),
            max_connections: try_load("LEDGER_MAX_CONNECTIONS", 5)?,
            catalog_path: var("LEDGER_CATALOG").map(PathBuf::from),
        })
    }

    pub fn database_url(&self) -> anyhow::Result<&str> {
        self.database_url
            .as_deref()
            .context("DATABASE_URL must be set to a production Postgres instance")
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn try_load(key: &str, default: u32) -> anyhow::Result<u32> {
    match var(key) {
        Some(raw) => match raw.trim().parse::<u32>() {
            Ok(value) if value > 0 => Ok(value),
            Ok(_) => anyhow::bail!("{key} must be a positive integer, got {raw:?}"),
            Err(e) => {
                warn!("Invalid {key} value: {e}");
                anyhow::bail!("{key} must be a positive integer, got {raw:?}")
            }
        },
        None => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}
