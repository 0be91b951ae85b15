//! In-memory host plugin table - tracks addons also registered as host plugins

use std::path::{Path, PathBuf};
use std::sync::RwLock;
use indexmap::IndexMap;
use tracing::info;
use crate::application::errors::HostError;
use crate::domain::entities::AddonDescriptor;
use crate::domain::traits::{HostPluginHandle, HostPlugins};

/// A package registered with the host
#[derive(Debug, Clone, serde::Serialize)]
pub struct HostPluginInfo {
    pub name: String,
    pub version: String,
    pub package: PathBuf,
    pub enabled: bool,
}

/// Host plugins known to this process, in registration order
#[derive(Default)]
pub struct HostPluginTable {
    plugins: RwLock<IndexMap<String, HostPluginInfo>>,
}

impl HostPluginTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget a host plugin
    pub fn unregister(&self, name: &str) -> Result<(), HostError> {
        let mut plugins = self.plugins.write()
            .map_err(|_| HostError::Internal("Lock poisoned".to_string()))?;
        if plugins.shift_remove(name).is_some() {
            info!("Unregistered host plugin: {}", name);
            Ok(())
        } else {
            Err(HostError::NotFound(format!("Host plugin '{}' not found", name)))
        }
    }

    pub fn list_plugins(&self) -> Vec<HostPluginInfo> {
        self.plugins.read()
            .map(|p| p.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn has_plugin(&self, name: &str) -> bool {
        self.plugins.read().map(|p| p.contains_key(name)).unwrap_or(false)
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.plugins.read()
            .map(|p| p.get(name).map(|i| i.enabled).unwrap_or(false))
            .unwrap_or(false)
    }
}

impl HostPlugins for HostPluginTable {
    fn load_host_plugin(&self, package: &Path, descriptor: &AddonDescriptor) -> Result<HostPluginHandle, HostError> {
        if !package.is_file() {
            return Err(HostError::HostPlugin(format!("Package {} not found", package.display())));
        }

        let mut plugins = self.plugins.write()
            .map_err(|_| HostError::Internal("Lock poisoned".to_string()))?;
        if plugins.contains_key(&descriptor.name) {
            return Err(HostError::HostPlugin(format!("Host plugin '{}' already registered", descriptor.name)));
        }

        info!("Registering host plugin: {}", descriptor.name);
        plugins.insert(descriptor.name.clone(), HostPluginInfo {
            name: descriptor.name.clone(),
            version: descriptor.version.clone(),
            package: package.to_path_buf(),
            enabled: false,
        });
        Ok(HostPluginHandle(descriptor.name.clone()))
    }

    fn enable_host_plugin(&self, handle: &HostPluginHandle) -> Result<(), HostError> {
        let mut plugins = self.plugins.write()
            .map_err(|_| HostError::Internal("Lock poisoned".to_string()))?;
        let plugin = plugins.get_mut(handle.name())
            .ok_or_else(|| HostError::NotFound(format!("Host plugin '{}' not found", handle.name())))?;
        plugin.enabled = true;
        Ok(())
    }

    fn unload_host_plugin(&self, handle: &HostPluginHandle) -> Result<(), HostError> {
        self.unregister(handle.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor() -> AddonDescriptor {
        AddonDescriptor::new("Economy", "econ", "1.0", "economy").as_host_plugin()
    }

    #[test]
    fn test_register_and_enable() {
        let dir = tempfile::tempdir().unwrap();
        let package = dir.path().join("econ.addon");
        std::fs::write(&package, b"stub").unwrap();

        let table = HostPluginTable::new();
        let handle = table.load_host_plugin(&package, &descriptor()).unwrap();
        assert!(table.has_plugin("Economy"));
        assert!(!table.is_enabled("Economy"));

        table.enable_host_plugin(&handle).unwrap();
        assert!(table.is_enabled("Economy"));
        assert!(table.load_host_plugin(&package, &descriptor()).is_err());

        table.unload_host_plugin(&handle).unwrap();
        assert!(table.list_plugins().is_empty());
        assert!(matches!(table.unload_host_plugin(&handle), Err(HostError::NotFound(_))));

        let handle = table.load_host_plugin(&package, &descriptor()).unwrap();
        assert_eq!(handle.name(), "Economy");
        table.unregister("Economy").unwrap();
        assert!(!table.has_plugin("Economy"));
    }

    #[test]
    fn test_missing_package_is_rejected() {
        let table = HostPluginTable::new();
        let result = table.load_host_plugin(Path::new("/nonexistent/econ.addon"), &descriptor());
        assert!(matches!(result, Err(HostError::HostPlugin(_))));
        assert!(!table.has_plugin("Economy"));
    }
}
