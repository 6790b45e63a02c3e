//! Configuration surface: providers, roles, and the deny list (§3 / §6).
//!
//! Loaded once at startup and treated as immutable for the process
//! lifetime -- hot reload is out of scope.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::provider::github::PROVIDER_NAME as GITHUB_PROVIDER_NAME;

/// Configuration error type.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("validation error: {0}")]
    Validation(String),
}

/// A role: the set of methods it grants, and the users/orgs bound to it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoleConfig {
    /// Method patterns this role grants access to, e.g. `"/pkg.Svc/Method"`,
    /// `"/pkg.Svc/*"`, or the solo `"*"`.
    #[serde(default)]
    pub allowed_methods: Vec<String>,

    /// Users bound directly to this role: `"<provider>:<username>"` or a bare
    /// username (normalised to `default_provider`).
    #[serde(default)]
    pub users: Vec<String>,

    /// Organizations bound to this role.
    #[serde(default)]
    pub orgs: Vec<String>,
}

/// HTTP transport settings for the Check endpoint (ambient, §4.8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Top-level configuration: providers, roles, default role, and deny list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Canonical name of the provider used when detection falls through to
    /// the configured default (§4.3) and when normalising bare usernames.
    #[serde(default = "default_provider_name")]
    pub default_provider: String,

    /// Roles, keyed by role name.
    #[serde(default)]
    pub roles: HashMap<String, RoleConfig>,

    /// Role granted to any identity that doesn't qualify through deny list,
    /// direct user binding, or org binding. Empty string means "none".
    #[serde(default)]
    pub default_role: String,

    /// Users forbidden regardless of role bindings: `"<provider>:<username>"`
    /// or a bare username.
    #[serde(default)]
    pub user_deny_list: Vec<String>,

    /// HTTP listener settings for the Check endpoint.
    #[serde(default)]
    pub server: ServerConfig,
}

fn default_provider_name() -> String {
    GITHUB_PROVIDER_NAME.to_string()
}

impl Config {
    /// Load configuration from a TOML or YAML file, selected by extension,
    /// and validate it.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;

        let config: Config = if path
            .extension()
            .map(|e| e == "yaml" || e == "yml")
            .unwrap_or(false)
        {
            serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?
        } else {
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate cross-references: `default_role`, if set, must name a
    /// configured role.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.default_role.is_empty() && !self.roles.contains_key(&self.default_role) {
            return Err(ConfigError::Validation(format!(
                "default_role '{}' does not match any configured role",
                self.default_role
            )));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_provider: default_provider_name(),
            roles: HashMap::new(),
            default_role: String::new(),
            user_deny_list: Vec::new(),
            server: ServerConfig::default(),
        }
    }
}
