//! Configuration management for gitprovider.
//!
//! Handles loading and saving configuration from TOML files.
//! Config files are stored in platform-specific locations:
//!
//! - **macOS/Linux**: `~/.config/gitprovider/config.toml`
//! - **Windows**: `%APPDATA%\gitprovider\config.toml`
//!
//! Tokens are never stored here; adapters read them from the environment.
//!
//! # Example
//!
//! ```ignore
//! use gitprovider_core::config::Config;
//!
//! let mut config = Config::load()?;
//! config.set("gitlab.domain", "gitlab.example.com")?;
//! config.set("gitlab.destructive_actions", "true")?;
//! config.save()?;
//! ```

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::options::ClientOptions;
use crate::{Error, Result};

/// Config file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Config directory name.
const CONFIG_DIR_NAME: &str = "gitprovider";

/// Public GitHub domain.
pub const GITHUB_DOMAIN: &str = "github.com";

/// Public GitLab domain.
pub const GITLAB_DOMAIN: &str = "gitlab.com";

// =============================================================================
// Configuration structures
// =============================================================================

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// GitHub configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<ProviderConfig>,

    /// GitLab configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gitlab: Option<ProviderConfig>,
}

/// Settings for one backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Domain served by this backend (public or self-hosted)
    pub domain: String,
    /// Allow delete-type calls
    #[serde(default)]
    pub destructive_actions: bool,
    /// Per-request timeout in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    /// Revalidate cached GET responses (GitHub only)
    #[serde(default)]
    pub conditional_requests: bool,
}

impl ProviderConfig {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            destructive_actions: false,
            timeout_secs: None,
            conditional_requests: false,
        }
    }

    /// Adapter options for this backend.
    pub fn client_options(&self) -> ClientOptions {
        let mut options = ClientOptions::default()
            .with_domain(self.domain.clone())
            .with_destructive_actions(self.destructive_actions)
            .with_conditional_requests(self.conditional_requests);
        if let Some(secs) = self.timeout_secs {
            options = options.with_timeout(Duration::from_secs(secs));
        }
        options
    }
}

/// The backends this workspace ships adapters for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    GitHub,
    GitLab,
}

impl ProviderKind {
    pub fn name(&self) -> &'static str {
        match self {
            ProviderKind::GitHub => "github",
            ProviderKind::GitLab => "gitlab",
        }
    }

    pub fn default_domain(&self) -> &'static str {
        match self {
            ProviderKind::GitHub => GITHUB_DOMAIN,
            ProviderKind::GitLab => GITLAB_DOMAIN,
        }
    }

    /// Environment variable holding the access token.
    pub fn token_env_var(&self) -> &'static str {
        match self {
            ProviderKind::GitHub => "GITHUB_TOKEN",
            ProviderKind::GitLab => "GITLAB_TOKEN",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Config implementation
// =============================================================================

impl Config {
    /// Get the configuration directory path.
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join(CONFIG_DIR_NAME))
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))
    }

    /// Get the configuration file path.
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE_NAME))
    }

    /// Load configuration from the default location.
    ///
    /// Returns a default (empty) config if the file doesn't exist.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    ///
    /// Returns a default (empty) config if the file doesn't exist.
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        if !path.exists() {
            debug!(path = ?path, "Config file does not exist, using defaults");
            return Ok(Self::default());
        }

        debug!(path = ?path, "Loading config");

        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse config file: {}", e)))?;

        info!(path = ?path, "Config loaded successfully");
        Ok(config)
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        self.save_to(&path)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Config(format!("Failed to create config directory: {}", e)))?;
        }

        debug!(path = ?path, "Saving config");

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, contents)
            .map_err(|e| Error::Config(format!("Failed to write config file: {}", e)))?;

        info!(path = ?path, "Config saved successfully");
        Ok(())
    }

    /// Configuration for `kind`, falling back to its public domain.
    pub fn provider(&self, kind: ProviderKind) -> ProviderConfig {
        let configured = match kind {
            ProviderKind::GitHub => &self.github,
            ProviderKind::GitLab => &self.gitlab,
        };
        configured
            .clone()
            .unwrap_or_else(|| ProviderConfig::new(kind.default_domain()))
    }

    /// Which backend serves `domain`: configured domains first, then the
    /// public ones.
    pub fn provider_for_domain(&self, domain: &str) -> Option<ProviderKind> {
        let matches = |c: &Option<ProviderConfig>| {
            c.as_ref()
                .is_some_and(|c| c.domain.eq_ignore_ascii_case(domain))
        };

        if matches(&self.github) {
            Some(ProviderKind::GitHub)
        } else if matches(&self.gitlab) {
            Some(ProviderKind::GitLab)
        } else if domain.eq_ignore_ascii_case(GITHUB_DOMAIN) {
            Some(ProviderKind::GitHub)
        } else if domain.eq_ignore_ascii_case(GITLAB_DOMAIN) {
            Some(ProviderKind::GitLab)
        } else {
            None
        }
    }

    /// Get a list of configured provider names.
    pub fn configured_providers(&self) -> Vec<&'static str> {
        let mut providers = Vec::new();
        if self.github.is_some() {
            providers.push("github");
        }
        if self.gitlab.is_some() {
            providers.push("gitlab");
        }
        providers
    }

    fn split_key(key: &str) -> Result<(ProviderKind, &str)> {
        let parts: Vec<&str> = key.split('.').collect();
        if parts.len() != 2 {
            return Err(Error::Config(format!(
                "Invalid config key '{}'. Expected format: provider.field",
                key
            )));
        }

        let kind = match parts[0] {
            "github" => ProviderKind::GitHub,
            "gitlab" => ProviderKind::GitLab,
            other => return Err(Error::Config(format!("Unknown provider: {}", other))),
        };
        Ok((kind, parts[1]))
    }

    /// Set a configuration value by key path.
    ///
    /// Key format: `provider.field` (e.g., `github.domain`, `gitlab.timeout_secs`)
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let (kind, field) = Self::split_key(key)?;
        let slot = match kind {
            ProviderKind::GitHub => &mut self.github,
            ProviderKind::GitLab => &mut self.gitlab,
        };
        let config = slot.get_or_insert_with(|| ProviderConfig::new(kind.default_domain()));

        let parse_bool = |value: &str| {
            value.parse::<bool>().map_err(|_| {
                Error::Config(format!(
                    "Expected true or false for {}, got '{}'",
                    key, value
                ))
            })
        };

        match field {
            "domain" => config.domain = value.to_string(),
            "destructive_actions" => config.destructive_actions = parse_bool(value)?,
            "conditional_requests" => config.conditional_requests = parse_bool(value)?,
            "timeout_secs" | "timeout" => {
                let secs = value.parse::<u64>().map_err(|_| {
                    Error::Config(format!(
                        "Expected a number of seconds for {}, got '{}'",
                        key, value
                    ))
                })?;
                config.timeout_secs = Some(secs);
            }
            _ => {
                return Err(Error::Config(format!(
                    "Unknown {} config field: {}",
                    kind, field
                )))
            }
        }

        Ok(())
    }

    /// Get a configuration value by key path.
    ///
    /// Key format: `provider.field` (e.g., `github.domain`)
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let (kind, field) = Self::split_key(key)?;
        let configured = match kind {
            ProviderKind::GitHub => &self.github,
            ProviderKind::GitLab => &self.gitlab,
        };
        let Some(config) = configured else {
            return Ok(None);
        };

        match field {
            "domain" => Ok(Some(config.domain.clone())),
            "destructive_actions" => Ok(Some(config.destructive_actions.to_string())),
            "conditional_requests" => Ok(Some(config.conditional_requests.to_string())),
            "timeout_secs" | "timeout" => Ok(config.timeout_secs.map(|s| s.to_string())),
            _ => Err(Error::Config(format!(
                "Unknown {} config field: {}",
                kind, field
            ))),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.github.is_none());
        assert!(config.gitlab.is_none());
        assert!(config.configured_providers().is_empty());
        assert_eq!(config.provider(ProviderKind::GitLab).domain, "gitlab.com");
    }

    #[test]
    fn test_set_and_get() {
        let mut config = Config::default();

        config.set("gitlab.domain", "gitlab.example.com").unwrap();
        config.set("gitlab.destructive_actions", "true").unwrap();
        config.set("gitlab.timeout_secs", "30").unwrap();

        assert_eq!(
            config.get("gitlab.domain").unwrap(),
            Some("gitlab.example.com".to_string())
        );
        assert_eq!(
            config.get("gitlab.destructive_actions").unwrap(),
            Some("true".to_string())
        );
        assert_eq!(config.get("gitlab.timeout").unwrap(), Some("30".to_string()));

        config.set("github.conditional_requests", "true").unwrap();
        assert_eq!(
            config.get("github.domain").unwrap(),
            Some("github.com".to_string())
        );

        let providers = config.configured_providers();
        assert!(providers.contains(&"github"));
        assert!(providers.contains(&"gitlab"));
    }

    #[test]
    fn test_invalid_key() {
        let mut config = Config::default();

        assert!(config.set("invalid", "value").is_err());
        assert!(config.set("too.many.parts", "value").is_err());
        assert!(config.set("unknown.field", "value").is_err());
        assert!(config.set("github.destructive_actions", "yes").is_err());
        assert!(config.set("github.timeout_secs", "soon").is_err());

        // When provider config doesn't exist, get returns Ok(None)
        assert_eq!(config.get("gitlab.domain").unwrap(), None);

        config.set("gitlab.domain", "gitlab.example.com").unwrap();
        assert!(config.get("gitlab.unknown_field").is_err());
    }

    #[test]
    fn test_provider_for_domain() {
        let mut config = Config::default();
        assert_eq!(
            config.provider_for_domain("github.com"),
            Some(ProviderKind::GitHub)
        );
        assert_eq!(
            config.provider_for_domain("GitLab.com"),
            Some(ProviderKind::GitLab)
        );
        assert_eq!(config.provider_for_domain("git.example.com"), None);

        config.set("gitlab.domain", "git.example.com").unwrap();
        assert_eq!(
            config.provider_for_domain("git.example.com"),
            Some(ProviderKind::GitLab)
        );
    }

    #[test]
    fn test_client_options() {
        let mut provider = ProviderConfig::new("ghe.example.com");
        provider.destructive_actions = true;
        provider.timeout_secs = Some(5);

        let options = provider.client_options();
        assert_eq!(options.domain.as_deref(), Some("ghe.example.com"));
        assert!(options.destructive_actions);
        assert_eq!(options.timeout, Some(Duration::from_secs(5)));
        assert!(!options.conditional_requests);
    }

    #[test]
    fn test_save_and_load() {
        let mut config = Config::default();
        config.gitlab = Some(ProviderConfig::new("gitlab.example.com"));

        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path().to_path_buf();

        config.save_to(&path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("[gitlab]"));
        assert!(contents.contains("domain = \"gitlab.example.com\""));
        assert!(!contents.contains("[github]"));

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.gitlab, config.gitlab);
        assert!(loaded.github.is_none());
    }

    #[test]
    fn test_load_nonexistent() {
        let path = PathBuf::from("/nonexistent/path/config.toml");
        let config = Config::load_from(&path).unwrap();
        assert!(config.github.is_none());
    }

    #[test]
    fn test_load_minimal_section() {
        let parsed: Config = toml::from_str("[github]\ndomain = \"ghe.local\"\n").unwrap();
        let github = parsed.github.unwrap();
        assert_eq!(github.domain, "ghe.local");
        assert!(!github.destructive_actions);
        assert!(github.timeout_secs.is_none());
    }
}
