//! Configuration management
//!
//! This module handles loading and parsing configuration for tutome.
//! Configuration can be loaded from:
//! - config.yml file
//! - Environment variables (override file settings)
//!
//! Missing optional values are filled with sensible defaults. The two tag
//! rule sets (question creation and tag search) live under `rules` and are
//! checked for consistency at load time.

use serde::{Deserialize, Serialize};

use crate::rules::{CategoryRule, RuleSet};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Tag selection rules
    #[serde(default)]
    pub rules: RulesConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origin
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_cors_origin() -> String {
    "http://localhost:5173".to_string()
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database driver (sqlite or mysql)
    #[serde(default)]
    pub driver: DatabaseDriver,
    /// Database connection URL
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: DatabaseDriver::default(),
            url: default_database_url(),
        }
    }
}

fn default_database_url() -> String {
    "data/tutome.db".to_string()
}

/// Database driver type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseDriver {
    /// SQLite (default)
    #[default]
    Sqlite,
    /// MySQL
    Mysql,
}

/// The two independent tag rule sets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulesConfig {
    /// Rules a new question's tags must satisfy
    #[serde(default = "default_create_rules")]
    pub create: RuleSet,
    /// Rules a tag search request must satisfy
    #[serde(default = "default_search_rules")]
    pub search: RuleSet,
    /// Most tag ids a single create or search request may carry
    #[serde(default = "default_max_tag_ids")]
    pub max_tag_ids: usize,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            create: default_create_rules(),
            search: default_search_rules(),
            max_tag_ids: default_max_tag_ids(),
        }
    }
}

/// Upper bound for `rules.max_tag_ids`. Tag ids are bound as query
/// parameters, and older SQLite builds allow 999 per statement.
pub const MAX_TAG_IDS_LIMIT: usize = 900;

fn default_max_tag_ids() -> usize {
    64
}

fn default_create_rules() -> RuleSet {
    RuleSet::new(CategoryRule::fallback())
        .with_category("subject", 1, 2)
        .with_category("difficulty", 1, 1)
        .with_category("progress", 1, 1)
}

fn default_search_rules() -> RuleSet {
    RuleSet::new(CategoryRule::fallback())
        .with_category("subject", 1, 3)
        .with_category("difficulty", 0, 2)
        .with_category("progress", 0, 1)
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError {
        path: String,
        message: String,
    },
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

impl Config {
    /// Load configuration from file
    ///
    /// If the file doesn't exist, returns default configuration.
    /// If the file exists but is invalid YAML, returns an error with details.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(&content).map_err(|e| {
            ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            }
        })?;

        config.validate()?;

        Ok(config)
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Environment variables follow the pattern:
    /// - TUTOME_SERVER_HOST
    /// - TUTOME_SERVER_PORT
    /// - TUTOME_SERVER_CORS_ORIGIN
    /// - TUTOME_DATABASE_DRIVER
    /// - TUTOME_DATABASE_URL
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Check that every rule has `min <= max` and the tag id cap is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rules.max_tag_ids == 0 || self.rules.max_tag_ids > MAX_TAG_IDS_LIMIT {
            return Err(ConfigError::ValidationError(format!(
                "rules.max_tag_ids must be between 1 and {}, got {}",
                MAX_TAG_IDS_LIMIT, self.rules.max_tag_ids
            )));
        }
        for (name, rules) in [("create", &self.rules.create), ("search", &self.rules.search)] {
            if let Some(category) = rules.first_malformed() {
                let rule = if category == "default" {
                    rules.default
                } else {
                    rules.rule_for(category)
                };
                return Err(ConfigError::ValidationError(format!(
                    "rules.{}.{}: max ({}) is below min ({})",
                    name, category, rule.max, rule.min
                )));
            }
        }
        Ok(())
    }

    /// Apply environment variable overrides to the configuration
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("TUTOME_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("TUTOME_SERVER_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.server.port = port;
            }
        }
        if let Ok(cors_origin) = std::env::var("TUTOME_SERVER_CORS_ORIGIN") {
            self.server.cors_origin = cors_origin;
        }

        if let Ok(driver) = std::env::var("TUTOME_DATABASE_DRIVER") {
            match driver.to_lowercase().as_str() {
                "sqlite" => self.database.driver = DatabaseDriver::Sqlite,
                "mysql" => self.database.driver = DatabaseDriver::Mysql,
                _ => {} // Ignore invalid values
            }
        }
        if let Ok(url) = std::env::var("TUTOME_DATABASE_URL") {
            self.database.url = url;
        }
    }
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

// Shared by every test that touches process environment variables.
#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());
