//! Per-addon YAML configuration, stored in the addon's data directory

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use serde_yaml::{Mapping, Value};
use crate::application::errors::ConfigError;

/// File name of an addon's configuration inside its data directory
pub const CONFIG_FILE: &str = "config.yml";

/// An addon's configuration; keys may be dotted (`shop.currency`)
pub struct AddonConfiguration {
    path: PathBuf,
    values: RwLock<Mapping>,
}

impl AddonConfiguration {
    /// Load from `path`; a missing or unreadable file yields an empty configuration
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = match read_mapping(&path) {
            Ok(values) => values,
            Err(e) => {
                tracing::warn!("Ignoring configuration {}: {}", path.display(), e);
                Mapping::new()
            }
        };
        Self {
            path,
            values: RwLock::new(values),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        let values = self.values.read().unwrap_or_else(|e| e.into_inner());
        lookup(&values, key).cloned()
    }

    pub fn get_str(&self, key: &str) -> Option<String> {
        self.get(key).and_then(|v| v.as_str().map(|s| s.to_string()))
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|v| v.as_bool())
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(|v| v.as_i64())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Set a value in memory; call `save` to persist it
    pub fn set(&self, key: &str, value: impl Into<Value>) {
        let mut values = self.values.write().unwrap_or_else(|e| e.into_inner());
        insert(&mut values, key, value.into());
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        let content = {
            let values = self.values.read().unwrap_or_else(|e| e.into_inner());
            serde_yaml::to_string(&*values)
                .map_err(|e| ConfigError::Parse(format!("Failed to serialize config: {}", e)))?
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, content)?;
        Ok(())
    }

    /// Replace in-memory values with the file's contents
    pub fn reload(&self) -> Result<(), ConfigError> {
        let fresh = read_mapping(&self.path)?;
        *self.values.write().unwrap_or_else(|e| e.into_inner()) = fresh;
        Ok(())
    }
}

fn read_mapping(path: &Path) -> Result<Mapping, ConfigError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Mapping::new()),
        Err(e) => return Err(e.into()),
    };

    match serde_yaml::from_str::<Value>(&content)
        .map_err(|e| ConfigError::Parse(format!("Failed to parse config: {}", e)))?
    {
        Value::Mapping(mapping) => Ok(mapping),
        Value::Null => Ok(Mapping::new()),
        _ => Err(ConfigError::InvalidValue(format!("{} is not a mapping", path.display()))),
    }
}

fn lookup<'a>(values: &'a Mapping, key: &str) -> Option<&'a Value> {
    let mut parts = key.split('.');
    let mut current = values.get(parts.next()?)?;
    for part in parts {
        current = current.get(part)?;
    }
    Some(current)
}

fn insert(values: &mut Mapping, key: &str, value: Value) {
    match key.split_once('.') {
        None => {
            values.insert(Value::String(key.to_string()), value);
        }
        Some((head, rest)) => {
            let is_mapping = values.get(head).map(|v| v.is_mapping()).unwrap_or(false);
            if !is_mapping {
                values.insert(Value::String(head.to_string()), Value::Mapping(Mapping::new()));
            }
            if let Some(Value::Mapping(child)) = values.get_mut(head) {
                insert(child, rest, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let config = AddonConfiguration::load(dir.path().join(CONFIG_FILE));
        assert!(config.get("anything").is_none());
    }

    #[test]
    fn test_dotted_set_save_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("econ").join(CONFIG_FILE);

        let config = AddonConfiguration::load(&path);
        config.set("shop.currency", "coins");
        config.set("shop.tax", 5);
        config.set("debug", true);
        config.save().unwrap();

        let reread = AddonConfiguration::load(&path);
        assert_eq!(reread.get_str("shop.currency").as_deref(), Some("coins"));
        assert_eq!(reread.get_i64("shop.tax"), Some(5));
        assert_eq!(reread.get_bool("debug"), Some(true));
        assert!(reread.get("shop.missing").is_none());

        std::fs::write(&path, "shop:\n  currency: gems\n").unwrap();
        reread.reload().unwrap();
        assert_eq!(reread.get_str("shop.currency").as_deref(), Some("gems"));
        assert!(!reread.contains("debug"));
    }

    #[test]
    fn test_set_replaces_scalar_with_mapping() {
        let dir = tempfile::tempdir().unwrap();
        let config = AddonConfiguration::load(dir.path().join(CONFIG_FILE));
        config.set("limits", 3);
        config.set("limits.daily", 10);
        assert_eq!(config.get_i64("limits.daily"), Some(10));
    }

    #[test]
    fn test_reload_reports_bad_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "- just\n- a list\n").unwrap();

        let config = AddonConfiguration::load(&path);
        assert!(config.get("just").is_none());
        assert!(matches!(config.reload(), Err(ConfigError::InvalidValue(_))));
    }
}
