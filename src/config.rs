// ⚙️ Configuration - limits.toml
//
// Every section is optional; missing values fall back to defaults so an
// empty file (or no file at all) gives a working local setup.

use crate::error::{LimitsError, Result};
use crate::validation::{validate_not_empty, Validate};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

pub const DEFAULT_DB_PATH: &str = "retirement_limits.db";
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:3000";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            path: DEFAULT_DB_PATH.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub verbose: bool,
    pub json: bool,
}

impl LimitsConfig {
    /// Load from a TOML file and validate it
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: LimitsConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// `path` if given, defaults otherwise
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn bind_address(&self) -> Result<SocketAddr> {
        self.server
            .bind_address
            .parse()
            .map_err(|e| LimitsError::Config {
                message: format!(
                    "server.bind_address '{}' is not a socket address: {}",
                    self.server.bind_address, e
                ),
            })
    }
}

impl Validate for LimitsConfig {
    fn validate(&self) -> Result<()> {
        validate_not_empty("database.path", &self.database.path)?;
        validate_not_empty("server.bind_address", &self.server.bind_address)?;
        self.bind_address()?;
        Ok(())
    }
}
