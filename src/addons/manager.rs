//! Addon manager - drives addons through load, enable, disable and unload

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, Weak};
use tracing::{debug, error, info, warn};
use crate::addons::instance::{AddonContext, AddonInstance};
use crate::addons::trait_def::{
    AddonSettings, AddonSummary, BulkEnableScope, BulkReport, DiscoveryReport, HostPluginStatus,
    LoadReport, ReenablePolicy, Transition,
};
use crate::application::errors::{AddonError, Hook};
use crate::application::services::CommandService;
use crate::domain::traits::HostPlugins;
use crate::infrastructure::addons::{
    manifest, AddonRegistry, CodeLoader, ExportTable, NativeLoader, PackageArchive,
};
use crate::infrastructure::host_plugins::HostPluginTable;

/// Host facilities the manager is built on
#[derive(Clone)]
pub struct HostServices {
    pub loader: Arc<dyn CodeLoader>,
    pub exports: Arc<ExportTable>,
    pub host_plugins: Arc<dyn HostPlugins>,
    pub commands: Arc<RwLock<CommandService>>,
}

impl HostServices {
    /// Native loading, an empty host export table and an in-memory host plugin table
    pub fn new(commands: Arc<RwLock<CommandService>>) -> Self {
        Self {
            loader: Arc::new(NativeLoader::new()),
            exports: Arc::new(ExportTable::new()),
            host_plugins: Arc::new(HostPluginTable::new()),
            commands,
        }
    }

    pub fn with_loader(mut self, loader: Arc<dyn CodeLoader>) -> Self {
        self.loader = loader;
        self
    }

    pub fn with_exports(mut self, exports: ExportTable) -> Self {
        self.exports = Arc::new(exports);
        self
    }

    pub fn with_host_plugins(mut self, host_plugins: Arc<dyn HostPlugins>) -> Self {
        self.host_plugins = host_plugins;
        self
    }
}

/// Manages every addon of the host.
///
/// Lifecycle transitions are serialized by one lock; lookups only take the
/// registry's read lock and never wait for a running hook.
pub struct AddonManager {
    settings: AddonSettings,
    registry: AddonRegistry,
    lifecycle: Mutex<()>,
    services: HostServices,
    this: Weak<AddonManager>,
}

impl AddonManager {
    pub fn new(settings: AddonSettings, services: HostServices) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            settings,
            registry: AddonRegistry::new(),
            lifecycle: Mutex::new(()),
            services,
            this: this.clone(),
        })
    }

    pub fn settings(&self) -> &AddonSettings {
        &self.settings
    }

    /// Addon root directory
    pub fn root_dir(&self) -> &Path {
        &self.settings.root_dir
    }

    pub fn commands(&self) -> &Arc<RwLock<CommandService>> {
        &self.services.commands
    }

    /// Create the addon root, then load and enable its packages as configured
    pub fn start(&self) -> Result<DiscoveryReport, AddonError> {
        std::fs::create_dir_all(&self.settings.root_dir)?;
        if !self.settings.auto_load {
            info!("Addon discovery disabled");
            return Ok(DiscoveryReport::default());
        }
        let report = self.discover_and_load_all(&self.settings.root_dir)?;

        if self.settings.auto_enable {
            let enabled = self.enable_all()?;
            info!(
                "Enabled {} addons ({} failed)",
                enabled.applied.len(),
                enabled.failed.len()
            );
        }
        Ok(report)
    }

    /// Disable every enabled addon
    pub fn shutdown(&self) -> Result<BulkReport, AddonError> {
        let report = self.disable_all()?;
        info!("Disabled {} addons", report.applied.len());
        Ok(report)
    }

    /// Load every package in `directory`; one bad package never stops the others
    pub fn discover_and_load_all(&self, directory: impl AsRef<Path>) -> Result<DiscoveryReport, AddonError> {
        let directory = directory.as_ref();
        if !directory.is_dir() {
            return Err(AddonError::NotADirectory(directory.to_path_buf()));
        }

        let mut packages = Vec::new();
        for entry in std::fs::read_dir(directory)? {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!("Failed to read directory entry: {}", e);
                    continue;
                }
            };
            let path = entry.path();
            if path.is_file() && self.settings.is_package(&path) {
                packages.push(path);
            }
        }
        packages.sort();

        let mut report = DiscoveryReport::default();
        for path in packages {
            match self.load(&path) {
                Ok(loaded) => report.loaded.push(loaded),
                Err(e) => {
                    error!("Unable to load addon {}: {}", path.display(), e);
                    report.failed.push((path, e));
                }
            }
        }

        info!(
            "Discovered {} addons in {} ({} failed)",
            report.loaded.len(),
            directory.display(),
            report.failed.len()
        );
        Ok(report)
    }

    /// Load a package by file name, relative to the addon root
    pub fn load_file(&self, file_name: &str) -> Result<Option<LoadReport>, AddonError> {
        let path = self.package_path(file_name);
        if !path.is_file() {
            return Ok(None);
        }
        self.load(path).map(Some)
    }

    /// Load a package and run its `on_load` hook
    pub fn load(&self, package: impl AsRef<Path>) -> Result<LoadReport, AddonError> {
        let package = package.as_ref();
        let _guard = self.lock()?;
        info!("Loading addon: {}", package.display());

        let archive = PackageArchive::open(package)?;
        let descriptor = manifest::descriptor_from_archive(&archive)?;
        if self.registry.is_loaded(&descriptor.name) {
            return Err(AddonError::DuplicateAddon(descriptor.name));
        }

        let execution = Arc::new(
            self.services
                .loader
                .build(&archive, &descriptor, self.services.exports.clone())?,
        );
        let addon = execution.instantiate(&descriptor.entry_point)?;
        debug!("Instantiated {} for {}", addon.type_name(), descriptor.name);

        let data_dir = self.settings.root_dir.join(&descriptor.id);
        std::fs::create_dir_all(&data_dir)?;

        let context = AddonContext::new(
            descriptor.clone(),
            package,
            data_dir,
            self.this.clone(),
            self.services.commands.clone(),
            execution,
        );
        let instance = Arc::new(AddonInstance::new(addon, context));
        self.registry.insert(instance.clone())?;

        if let Err(e) = instance.run_hook(Hook::Load) {
            self.registry.remove(&descriptor.name)?;
            self.drop_commands(&descriptor.name);
            return Err(e);
        }

        let host_plugin = if descriptor.register_as_host_plugin && self.settings.host_plugins {
            self.register_host_plugin(package, &instance)
        } else {
            HostPluginStatus::NotRequested
        };

        info!(
            "Loaded addon: {} ({}) v{}",
            descriptor.name, descriptor.id, descriptor.version
        );
        Ok(LoadReport {
            name: descriptor.name,
            id: descriptor.id,
            version: descriptor.version,
            host_plugin,
        })
    }

    /// Forget the addon, running `on_disable` first unless it already ran since
    /// the last `on_load`/`on_enable`. Removal happens even if the hook fails,
    /// and releases the addon's host plugin registration.
    pub fn unload(&self, name: &str) -> Result<Transition, AddonError> {
        let _guard = self.lock()?;
        let Some(instance) = self.registry.get(name) else {
            return Ok(Transition::NotFound);
        };

        let hook = if instance.cleanup_pending() {
            instance.run_hook(Hook::Disable)
        } else {
            Ok(())
        };
        self.registry.remove(name)?;
        self.drop_commands(name);
        self.release_host_plugin(&instance);
        drop(instance);
        info!("Unloaded addon: {}", name);

        hook.map(|_| Transition::Applied)
    }

    /// Run `on_enable` and mark the addon enabled
    pub fn enable(&self, name: &str) -> Result<Transition, AddonError> {
        let _guard = self.lock()?;
        self.enable_locked(name)
    }

    /// Mark the addon disabled and run `on_disable`
    pub fn disable(&self, name: &str) -> Result<Transition, AddonError> {
        let _guard = self.lock()?;
        self.disable_locked(name)
    }

    /// Enable every addon in scope, in registry order
    pub fn enable_all(&self) -> Result<BulkReport, AddonError> {
        let _guard = self.lock()?;
        let names = match self.settings.bulk_enable {
            BulkEnableScope::Loaded => self.registry.loaded_names(),
            BulkEnableScope::Enabled => self.registry.enabled_names(),
        };

        let mut report = BulkReport::default();
        for name in names {
            match self.enable_locked(&name) {
                Ok(Transition::Applied) => report.applied.push(name),
                Ok(_) => {}
                Err(e) => {
                    error!("Failed to enable addon {}: {}", name, e);
                    report.failed.push((name, e));
                }
            }
        }
        Ok(report)
    }

    /// Disable every enabled addon, in registry order
    pub fn disable_all(&self) -> Result<BulkReport, AddonError> {
        let _guard = self.lock()?;
        let mut report = BulkReport::default();
        for name in self.registry.enabled_names() {
            match self.disable_locked(&name) {
                Ok(_) => report.applied.push(name),
                Err(e) => {
                    error!("Failed to disable addon {}: {}", name, e);
                    report.failed.push((name, e));
                }
            }
        }
        Ok(report)
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.registry.is_loaded(name)
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.registry.is_enabled(name)
    }

    pub fn get_addon(&self, name: &str) -> Option<Arc<AddonInstance>> {
        self.registry.get(name)
    }

    /// Loaded addons in registry order
    pub fn list(&self) -> Vec<AddonSummary> {
        self.registry
            .loaded()
            .iter()
            .map(|addon| {
                let descriptor = addon.descriptor();
                AddonSummary {
                    name: descriptor.name.clone(),
                    id: descriptor.id.clone(),
                    version: descriptor.version.clone(),
                    description: descriptor.description.clone(),
                    enabled: self.registry.is_enabled(&descriptor.name),
                }
            })
            .collect()
    }

    pub fn loaded_names(&self) -> Vec<String> {
        self.registry.loaded_names()
    }

    pub fn enabled_names(&self) -> Vec<String> {
        self.registry.enabled_names()
    }

    fn enable_locked(&self, name: &str) -> Result<Transition, AddonError> {
        let Some(instance) = self.registry.get(name) else {
            debug!("Cannot enable unknown addon: {}", name);
            return Ok(Transition::NotFound);
        };
        if self.registry.is_enabled(name) && self.settings.reenable == ReenablePolicy::Skip {
            return Ok(Transition::Unchanged);
        }

        if let Err(e) = instance.run_hook(Hook::Enable) {
            self.registry.mark_disabled(name)?;
            return Err(e);
        }
        self.registry.mark_enabled(name)?;
        info!("Enabled addon: {}", name);
        Ok(Transition::Applied)
    }

    fn disable_locked(&self, name: &str) -> Result<Transition, AddonError> {
        let Some(instance) = self.registry.mark_disabled(name)? else {
            return Ok(Transition::NotFound);
        };
        instance.run_hook(Hook::Disable)?;
        info!("Disabled addon: {}", name);
        Ok(Transition::Applied)
    }

    fn register_host_plugin(&self, package: &Path, instance: &AddonInstance) -> HostPluginStatus {
        let host_plugins = &self.services.host_plugins;
        let result = host_plugins
            .load_host_plugin(package, instance.descriptor())
            .and_then(|handle| match host_plugins.enable_host_plugin(&handle) {
                Ok(()) => Ok(handle),
                Err(e) => {
                    if let Err(undo) = host_plugins.unload_host_plugin(&handle) {
                        debug!("Could not undo host plugin registration {}: {}", handle.name(), undo);
                    }
                    Err(e)
                }
            });

        match result {
            Ok(handle) => {
                instance.set_host_plugin(handle);
                HostPluginStatus::Registered
            }
            Err(e) => {
                warn!(
                    "Addon {} loaded, but registering it as a host plugin failed: {}",
                    instance.name(),
                    e
                );
                HostPluginStatus::Failed(e.to_string())
            }
        }
    }

    fn release_host_plugin(&self, instance: &AddonInstance) {
        let Some(handle) = instance.take_host_plugin() else {
            return;
        };
        if let Err(e) = self.services.host_plugins.unload_host_plugin(&handle) {
            warn!("Failed to unregister host plugin {}: {}", handle.name(), e);
        }
    }

    fn drop_commands(&self, owner: &str) {
        match self.services.commands.write() {
            Ok(mut commands) => {
                let removed = commands.unregister_owned_by(owner);
                if removed > 0 {
                    debug!("Removed {} commands registered by {}", removed, owner);
                }
            }
            Err(_) => error!("Command registry lock poisoned, commands of {} kept", owner),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, ()>, AddonError> {
        self.lifecycle
            .lock()
            .map_err(|_| AddonError::Internal("Lock poisoned".to_string()))
    }

    /// Package path for a file name inside the addon root
    pub fn package_path(&self, file_name: &str) -> PathBuf {
        self.settings.root_dir.join(file_name)
    }
}
