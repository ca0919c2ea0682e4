//! Configuration management for cultural-url-analyzer
//!
//! Configuration is loaded from `./config/cultural-url-analyzer.toml` (or the
//! path given with `--config`). The template embedded below is the single
//! place defaults live; `--init` writes it to disk.

use serde::Deserialize;
use std::fs;
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Configuration file path relative to working directory
pub const CONFIG_PATH: &str = "./config/cultural-url-analyzer.toml";

/// Default configuration file content
pub const DEFAULT_CONFIG: &str = include_str!("../config/cultural-url-analyzer.toml");

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found at {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] io::Error),

    #[error("Failed to parse configuration file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Configuration field '{field}' cannot be empty")]
    EmptyRequired { field: String },

    #[error("Configuration field '{field}' must be greater than zero")]
    Zero { field: String },

    #[error("Invalid fallback path '{path}': must start with '/'")]
    InvalidFallbackPath { path: String },
}

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub crawl: CrawlConfig,
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub data: DataConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub user_agent: String,
    pub request_timeout_secs: u64,
    pub subpage_timeout_secs: u64,
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
}

fn default_max_redirects() -> usize {
    10
}

impl HttpConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn subpage_timeout(&self) -> Duration {
        Duration::from_secs(self.subpage_timeout_secs)
    }
}

/// Sub-page discovery limits
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlConfig {
    pub link_terms: Vec<String>,
    pub max_candidate_links: usize,
    pub max_subpages: usize,
    #[serde(default)]
    pub fallback_paths: Vec<String>,
    pub max_addresses_main: usize,
    pub max_addresses_subpage: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    pub concurrency: usize,
    pub max_concurrent_fetches: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_http_requests_per_second")]
    pub http_requests_per_second: u32,
}

fn default_http_requests_per_second() -> u32 {
    2
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            http_requests_per_second: default_http_requests_per_second(),
        }
    }
}

/// Optional replacements for the embedded data files
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DataConfig {
    #[serde(default)]
    pub known_organizations_path: String,
    #[serde(default)]
    pub concepts_path: String,
}

impl DataConfig {
    pub fn known_organizations(&self) -> Option<&Path> {
        non_empty_path(&self.known_organizations_path)
    }

    pub fn concepts(&self) -> Option<&Path> {
        non_empty_path(&self.concepts_path)
    }
}

fn non_empty_path(raw: &str) -> Option<&Path> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(Path::new(trimmed))
    }
}

impl AppConfig {
    /// Load configuration from the default path
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path(Path::new(CONFIG_PATH))
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// The embedded template, parsed
    pub fn embedded_default() -> Result<Self, ConfigError> {
        Self::from_toml(DEFAULT_CONFIG)
    }

    /// Validate all configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.http.user_agent.trim().is_empty() {
            return Err(ConfigError::EmptyRequired {
                field: "http.user_agent".to_string(),
            });
        }

        let positive = [
            ("http.request_timeout_secs", self.http.request_timeout_secs as usize),
            ("http.subpage_timeout_secs", self.http.subpage_timeout_secs as usize),
            ("crawl.max_subpages", self.crawl.max_subpages),
            ("crawl.max_candidate_links", self.crawl.max_candidate_links),
            ("analysis.concurrency", self.analysis.concurrency),
            ("analysis.max_concurrent_fetches", self.analysis.max_concurrent_fetches),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(ConfigError::Zero { field: field.to_string() });
            }
        }

        if self.crawl.link_terms.iter().all(|t| t.trim().is_empty()) {
            return Err(ConfigError::EmptyRequired {
                field: "crawl.link_terms".to_string(),
            });
        }

        for path in &self.crawl.fallback_paths {
            if !path.starts_with('/') {
                return Err(ConfigError::InvalidFallbackPath { path: path.clone() });
            }
        }

        Ok(())
    }

    /// Create default configuration file at `path`
    pub fn create_default_config_at(path: &Path) -> Result<PathBuf, ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = fs::File::create(path)?;
        file.write_all(DEFAULT_CONFIG.as_bytes())?;

        Ok(path.to_path_buf())
    }

    /// Create default configuration file at the standard location
    pub fn create_default_config() -> Result<PathBuf, ConfigError> {
        Self::create_default_config_at(Path::new(CONFIG_PATH))
    }

    /// Check if stdin is a TTY (interactive terminal)
    pub fn is_interactive() -> bool {
        io::stdin().is_terminal()
    }

    /// Prompt user to create default config (only in interactive mode)
    pub fn prompt_create_config() -> Result<Option<PathBuf>, ConfigError> {
        if !Self::is_interactive() {
            return Ok(None);
        }

        print!("Configuration file not found. Create default config? [Y/n] ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        let input = input.trim().to_lowercase();

        if input.is_empty() || input == "y" || input == "yes" {
            let path = Self::create_default_config()?;
            Ok(Some(path))
        } else {
            Ok(None)
        }
    }
}
