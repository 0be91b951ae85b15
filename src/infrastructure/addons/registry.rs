//! Addon registry - Tracks loaded and enabled addons by name

use std::sync::{Arc, RwLock};
use indexmap::IndexMap;
use crate::addons::instance::AddonInstance;
use crate::application::errors::AddonError;

#[derive(Default)]
struct Maps {
    loaded: IndexMap<String, Arc<AddonInstance>>,
    enabled: IndexMap<String, Arc<AddonInstance>>,
}

/// Registry of loaded addons.
///
/// `enabled` is always a subset of `loaded`; both keep insertion order.
pub struct AddonRegistry {
    maps: RwLock<Maps>,
}

impl AddonRegistry {
    pub fn new() -> Self {
        Self {
            maps: RwLock::new(Maps::default()),
        }
    }

    /// Register a loaded addon
    pub fn insert(&self, instance: Arc<AddonInstance>) -> Result<(), AddonError> {
        let mut maps = self.maps.write()
            .map_err(|_| AddonError::Internal("Lock poisoned".to_string()))?;

        let descriptor = instance.descriptor();
        if maps.loaded.contains_key(&descriptor.name) {
            return Err(AddonError::DuplicateAddon(descriptor.name.clone()));
        }
        if let Some(owner) = maps.loaded.values().find(|a| a.descriptor().id == descriptor.id) {
            return Err(AddonError::DuplicateId {
                id: descriptor.id.clone(),
                owner: owner.name().to_string(),
            });
        }

        maps.loaded.insert(descriptor.name.clone(), instance);
        Ok(())
    }

    /// Remove an addon from both maps
    pub fn remove(&self, name: &str) -> Result<Option<Arc<AddonInstance>>, AddonError> {
        let mut maps = self.maps.write()
            .map_err(|_| AddonError::Internal("Lock poisoned".to_string()))?;

        maps.enabled.shift_remove(name);
        Ok(maps.loaded.shift_remove(name))
    }

    /// Mark a loaded addon enabled, returning false if it is not loaded
    pub fn mark_enabled(&self, name: &str) -> Result<bool, AddonError> {
        let mut maps = self.maps.write()
            .map_err(|_| AddonError::Internal("Lock poisoned".to_string()))?;

        let Some(instance) = maps.loaded.get(name).cloned() else {
            return Ok(false);
        };
        maps.enabled.insert(name.to_string(), instance);
        Ok(true)
    }

    /// Take an addon out of the enabled map, keeping it loaded
    pub fn mark_disabled(&self, name: &str) -> Result<Option<Arc<AddonInstance>>, AddonError> {
        let mut maps = self.maps.write()
            .map_err(|_| AddonError::Internal("Lock poisoned".to_string()))?;

        Ok(maps.enabled.shift_remove(name))
    }

    /// Get a loaded addon by name
    pub fn get(&self, name: &str) -> Option<Arc<AddonInstance>> {
        self.maps.read()
            .ok()?
            .loaded
            .get(name)
            .cloned()
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.maps.read()
            .ok()
            .map(|m| m.loaded.contains_key(name))
            .unwrap_or(false)
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.maps.read()
            .ok()
            .map(|m| m.enabled.contains_key(name))
            .unwrap_or(false)
    }

    /// Loaded addon names in registry order
    pub fn loaded_names(&self) -> Vec<String> {
        self.maps.read()
            .ok()
            .map(|m| m.loaded.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Enabled addon names in registry order
    pub fn enabled_names(&self) -> Vec<String> {
        self.maps.read()
            .ok()
            .map(|m| m.enabled.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Loaded addons in registry order
    pub fn loaded(&self) -> Vec<Arc<AddonInstance>> {
        self.maps.read()
            .ok()
            .map(|m| m.loaded.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Get the number of loaded addons
    pub fn len(&self) -> usize {
        self.maps.read()
            .ok()
            .map(|m| m.loaded.len())
            .unwrap_or(0)
    }

    /// Check if no addons are loaded
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for AddonRegistry {
    fn default() -> Self {
        Self::new()
    }
}
