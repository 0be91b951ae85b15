//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use crate::addons::{AddonSettings, BulkEnableScope, ReenablePolicy};
use crate::application::errors::ConfigError;

/// Host configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    #[serde(default)]
    pub host: HostConfig,
    #[serde(default)]
    pub addons: AddonsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct HostConfig {
    pub name: String,
    pub prefix: String,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").to_string(),
            prefix: "/".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct AddonsConfig {
    pub directory: PathBuf,
    pub extensions: Vec<String>,
    pub auto_load: bool,
    pub auto_enable: bool,
    pub reenable: ReenablePolicy,
    pub bulk_enable: BulkEnableScope,
    pub host_plugins: bool,
}

impl Default for AddonsConfig {
    fn default() -> Self {
        let settings = AddonSettings::default();
        Self {
            directory: settings.root_dir,
            extensions: settings.extensions,
            auto_load: settings.auto_load,
            auto_enable: settings.auto_enable,
            reenable: settings.reenable,
            bulk_enable: settings.bulk_enable,
            host_plugins: settings.host_plugins,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: HostConfig::default(),
            addons: AddonsConfig::default(),
        }
    }
}

impl Config {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::Parse(format!("Failed to read config: {}", e)))?;

        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(content)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.host.prefix.trim().is_empty() {
            return Err(ConfigError::MissingField("host.prefix".to_string()));
        }
        if self.addons.extensions.is_empty() {
            return Err(ConfigError::InvalidValue("addons.extensions is empty".to_string()));
        }
        Ok(())
    }

    pub fn load_env() -> Self {
        let mut config = Config::default();
        config.apply_env();
        config
    }

    /// Override values from the environment
    pub fn apply_env(&mut self) {
        if let Ok(dir) = std::env::var("ADDON_HOST_DIR") {
            self.addons.directory = PathBuf::from(dir);
        }

        if let Ok(prefix) = std::env::var("ADDON_HOST_PREFIX") {
            if !prefix.trim().is_empty() {
                self.host.prefix = prefix;
            }
        }
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self)
            .map_err(|e| ConfigError::Parse(format!("Failed to serialize config: {}", e)))
    }

    /// Settings for the addon manager
    pub fn to_settings(&self) -> AddonSettings {
        AddonSettings {
            root_dir: self.addons.directory.clone(),
            extensions: self.addons.extensions.clone(),
            auto_load: self.addons.auto_load,
            auto_enable: self.addons.auto_enable,
            reenable: self.addons.reenable,
            bulk_enable: self.addons.bulk_enable,
            host_plugins: self.addons.host_plugins,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_addons_section_uses_defaults() {
        let config = Config::parse(
            "host:\n  name: test-host\n  prefix: '!'\naddons:\n  directory: /srv/addons\n  reenable: rerun\n",
        )
        .unwrap();

        assert_eq!(config.host.prefix, "!");
        let settings = config.to_settings();
        assert_eq!(settings.root_dir, PathBuf::from("/srv/addons"));
        assert_eq!(settings.reenable, ReenablePolicy::Rerun);
        assert_eq!(settings.bulk_enable, BulkEnableScope::Loaded);
        assert_eq!(settings.extensions, vec!["addon", "zip"]);
        assert!(settings.auto_enable);
    }

    #[test]
    fn test_sections_may_be_omitted() {
        let config = Config::parse("addons:\n  directory: /srv/addons\n").unwrap();
        assert_eq!(config.host.name, env!("CARGO_PKG_NAME"));
        assert_eq!(config.host.prefix, "/");
        assert_eq!(config.to_settings().root_dir, PathBuf::from("/srv/addons"));

        let config = Config::parse("host:\n  name: lobby\n").unwrap();
        assert_eq!(config.host.name, "lobby");
        assert_eq!(config.host.prefix, "/");
        assert_eq!(config.addons.extensions, vec!["addon", "zip"]);
    }

    #[test]
    fn test_default_round_trips_through_yaml() {
        let yaml = Config::default().to_yaml().unwrap();
        assert!(yaml.contains("bulk-enable: loaded"));
        assert!(yaml.contains("auto-load: true"));
        let config = Config::parse(&yaml).unwrap();
        assert_eq!(config.host.prefix, "/");
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            Config::parse("host:\n  name: x\n  prefix: ''\naddons: {}\n"),
            Err(ConfigError::MissingField(_))
        ));
        assert!(matches!(
            Config::parse("host:\n  name: x\n  prefix: /\naddons:\n  bulk-enable: sometimes\n"),
            Err(ConfigError::Parse(_))
        ));
    }
}
