//! Addon trait definitions and lifecycle outcomes

use std::path::PathBuf;
use serde::{Deserialize, Serialize};
use crate::addons::instance::AddonContext;
use crate::application::errors::{AddonError, HookError};

/// Lifecycle contract every addon entry point implements.
///
/// Hooks run to completion on the thread driving the transition. They may
/// look addons up through the manager, but must not call `load`, `unload`,
/// `enable` or `disable` themselves.
pub trait Addon: Send {
    /// Called once, right after the addon is registered as loaded
    fn on_load(&mut self, ctx: &AddonContext) -> Result<(), HookError>;

    /// Called every time the addon is enabled
    fn on_enable(&mut self, ctx: &AddonContext) -> Result<(), HookError>;

    /// Called when the addon is disabled or unloaded
    fn on_disable(&mut self, ctx: &AddonContext) -> Result<(), HookError>;

    /// Name of the concrete type, for diagnostics
    fn type_name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// What `enable` does for an addon that is already enabled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReenablePolicy {
    /// Leave it alone and report `Transition::Unchanged`
    #[default]
    Skip,
    /// Run `on_enable` again
    Rerun,
}

/// Which addons `enable_all` sweeps over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BulkEnableScope {
    /// Every loaded addon
    #[default]
    Loaded,
    /// Only addons already enabled
    Enabled,
}

/// Addon manager settings
#[derive(Debug, Clone)]
pub struct AddonSettings {
    /// Addon root: packages live here, data directories are `<root>/<id>`
    pub root_dir: PathBuf,
    /// Package file extensions picked up by discovery
    pub extensions: Vec<String>,
    /// Discover packages on startup
    pub auto_load: bool,
    /// Enable everything after startup discovery
    pub auto_enable: bool,
    pub reenable: ReenablePolicy,
    pub bulk_enable: BulkEnableScope,
    /// Honour `register-as-host-plugin` requests
    pub host_plugins: bool,
}

impl AddonSettings {
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            ..Self::default()
        }
    }

    pub fn with_reenable(mut self, policy: ReenablePolicy) -> Self {
        self.reenable = policy;
        self
    }

    pub fn with_bulk_enable(mut self, scope: BulkEnableScope) -> Self {
        self.bulk_enable = scope;
        self
    }

    pub fn with_auto_enable(mut self, auto_enable: bool) -> Self {
        self.auto_enable = auto_enable;
        self
    }

    /// Whether `path` looks like an addon package
    pub fn is_package(&self, path: &std::path::Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| self.extensions.iter().any(|x| x.eq_ignore_ascii_case(ext)))
            .unwrap_or(false)
    }
}

impl Default for AddonSettings {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("./addons"),
            extensions: vec!["addon".to_string(), "zip".to_string()],
            auto_load: true,
            auto_enable: true,
            reenable: ReenablePolicy::default(),
            bulk_enable: BulkEnableScope::default(),
            host_plugins: true,
        }
    }
}

/// Outcome of `enable`, `disable` and `unload`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Applied,
    /// Nothing to do, the addon was already in the requested state
    Unchanged,
    NotFound,
}

impl Transition {
    pub fn is_applied(&self) -> bool {
        matches!(self, Transition::Applied)
    }
}

/// Result of the secondary host plugin registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostPluginStatus {
    NotRequested,
    Registered,
    Failed(String),
}

/// Successful load
#[derive(Debug, Clone)]
pub struct LoadReport {
    pub name: String,
    pub id: String,
    pub version: String,
    pub host_plugin: HostPluginStatus,
}

/// Result of scanning a directory
#[derive(Debug, Default)]
pub struct DiscoveryReport {
    pub loaded: Vec<LoadReport>,
    pub failed: Vec<(PathBuf, AddonError)>,
}

impl DiscoveryReport {
    pub fn loaded_names(&self) -> Vec<&str> {
        self.loaded.iter().map(|r| r.name.as_str()).collect()
    }
}

/// Result of `enable_all` / `disable_all`
#[derive(Debug, Default)]
pub struct BulkReport {
    pub applied: Vec<String>,
    pub failed: Vec<(String, AddonError)>,
}

/// Listing entry for a loaded addon
#[derive(Debug, Clone, Serialize)]
pub struct AddonSummary {
    pub name: String,
    pub id: String,
    pub version: String,
    pub description: Option<String>,
    pub enabled: bool,
}
