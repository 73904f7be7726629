use std::net::{Ipv6Addr, SocketAddr};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use serde::Deserialize;
use todo_core::Database;

#[derive(Debug, Parser)]
#[command(name = "todo-api")]
#[command(about = "JSON CRUD backend for a todo list")]
pub struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Address to listen on, overrides `api.bind_address`
    #[arg(long)]
    pub bind_address: Option<SocketAddr>,

    /// sqlx SQLite url, overrides `database.url`
    #[arg(long)]
    pub database_url: Option<String>,

    /// Log filter, overrides `logging.level`
    #[arg(long)]
    pub log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    pub log_json: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Bind address for the API
    pub bind_address: SocketAddr,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from((Ipv6Addr::UNSPECIFIED, 8000)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Falls back to a file in the user's state directory when unset
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl AppConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;

        toml::from_str(&content).with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// File values (if any) with command line overrides applied on top.
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let mut config = match &cli.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        if let Some(bind_address) = cli.bind_address {
            config.api.bind_address = bind_address;
        }

        if let Some(url) = &cli.database_url {
            config.database.url = Some(url.clone());
        }

        if let Some(level) = &cli.log_level {
            config.logging.level = level.clone();
        }

        if cli.log_json {
            config.logging.json = true;
        }

        Ok(config)
    }

    pub fn database_url(&self) -> anyhow::Result<String> {
        match &self.database.url {
            Some(url) => Ok(url.clone()),
            None => Database::default_url(),
        }
    }
}
