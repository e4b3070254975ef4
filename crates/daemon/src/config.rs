//! Daemon configuration
//!
//! Layered with the `config` crate: built-in defaults, an optional TOML
//! file, then `CAMPUSQ_`-prefixed environment variables (`__` nests, e.g.
//! `CAMPUSQ_RPC__PORT=9600`).

use campusq_api_rpc::RpcServerConfig;
use campusq_core::application::AdminSettings;
use campusq_core::domain::Department;
use campusq_core::{AppError, Result};
use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const CONFIG_PATH_ENV: &str = "CAMPUSQ_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "~/.campusq/config.toml";
const ENV_PREFIX: &str = "CAMPUSQ";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcSection {
    pub host: String,
    pub port: u16,
}

impl Default for RpcSection {
    fn default() -> Self {
        let defaults = RpcServerConfig::default();
        Self {
            host: defaults.host,
            port: defaults.port,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub rpc: RpcSection,
    pub admin: AdminSettings,
    pub departments: Vec<Department>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            rpc: RpcSection::default(),
            admin: AdminSettings::default(),
            departments: default_departments(),
        }
    }
}

/// Departments served when the config file names none
fn default_departments() -> Vec<Department> {
    let department = |id: &str, name: &str, description: &str, icon: &str, minutes: f64| {
        let mut d = Department::new(id, name).with_service_minutes(minutes);
        d.description = description.to_string();
        d.icon = icon.to_string();
        d
    };

    vec![
        department("registrar", "Registrar", "Enrollment, transcripts and records", "scroll", 5.0),
        department("bursary", "Bursary", "Fees, payments and refunds", "wallet", 8.0),
        department("library", "Library", "Loans, renewals and fines", "book", 3.0),
        department("it-helpdesk", "IT Helpdesk", "Accounts, Wi-Fi and devices", "laptop", 10.0),
        department("health-center", "Health Center", "Walk-in consultations", "heart", 15.0),
    ]
}

impl DaemonConfig {
    /// Load from `CAMPUSQ_CONFIG` (or the default path) plus the environment
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let path = PathBuf::from(shellexpand::tilde(&path).into_owned());

        let builder = Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );
        Self::from_builder(builder)
    }

    /// Parse a TOML document on top of the defaults
    pub fn from_toml(toml: &str) -> Result<Self> {
        Self::from_builder(Config::builder().add_source(File::from_str(toml, FileFormat::Toml)))
    }

    fn from_builder(builder: ConfigBuilder<config::builder::DefaultState>) -> Result<Self> {
        let config: Self = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| AppError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.departments.is_empty() {
            return Err(AppError::Config("at least one department is required".to_string()));
        }
        self.admin
            .validate()
            .map_err(|e| AppError::Config(e.to_string()))
    }

    pub fn rpc_server_config(&self) -> RpcServerConfig {
        RpcServerConfig {
            host: self.rpc.host.clone(),
            port: self.rpc.port,
        }
    }
}
