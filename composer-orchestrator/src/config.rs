//! Orchestrator configuration
//!
//! Every setting can be given on the command line or through the environment.

use std::net::SocketAddr;

use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "composer-orchestrator")]
#[command(about = "Image compose orchestrator", long_about = None)]
pub struct Config {
    /// PostgreSQL connection string; without one jobs are kept in memory
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Maximum number of pooled database connections
    #[arg(long, env = "COMPOSER_DB_MAX_CONNECTIONS", default_value_t = 10)]
    pub db_max_connections: u32,

    /// Address the HTTP API listens on
    #[arg(long, env = "COMPOSER_BIND_ADDR", default_value = "0.0.0.0:8080")]
    pub bind_addr: String,

    /// Distributions composes may be requested for
    #[arg(
        long,
        env = "COMPOSER_DISTRIBUTIONS",
        value_delimiter = ',',
        default_value = "rhel-8,rhel-9,centos-9,fedora-39,fedora-40"
    )]
    pub distributions: Vec<String>,

    /// Allow images to be kept on the worker server instead of uploaded;
    /// also enabled whenever `OSBUILD_LOCALSAVE` is set, whatever its value
    #[arg(long)]
    pub local_save: bool,
}

/// Enables local save by being present, even when empty
pub const LOCAL_SAVE_ENV: &str = "OSBUILD_LOCALSAVE";

impl Config {
    /// Parses the command line and environment
    pub fn load() -> Self {
        let mut config = Self::parse();
        config.apply_local_save_env(std::env::var_os(LOCAL_SAVE_ENV));
        config
    }

    fn apply_local_save_env(&mut self, value: Option<std::ffi::OsString>) {
        if value.is_some() {
            self.local_save = true;
        }
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.bind_addr.parse::<SocketAddr>().is_err() {
            anyhow::bail!("bind_addr must be a socket address, got {}", self.bind_addr);
        }

        if self.distributions.iter().all(|d| d.trim().is_empty()) {
            anyhow::bail!("at least one distribution must be configured");
        }

        if self.db_max_connections == 0 {
            anyhow::bail!("db_max_connections must be greater than 0");
        }

        if let Some(url) = &self.database_url {
            if !url.starts_with("postgres://") && !url.starts_with("postgresql://") {
                anyhow::bail!("database_url must start with postgres:// or postgresql://");
            }
        }

        Ok(())
    }

    pub fn is_known_distribution(&self, name: &str) -> bool {
        self.distributions.iter().any(|d| d.trim() == name)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            db_max_connections: 10,
            bind_addr: "0.0.0.0:8080".to_string(),
            distributions: vec!["rhel-9".to_string(), "fedora-40".to_string()],
            local_save: false,
        }
    }
}
