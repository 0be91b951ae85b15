use std::path::Path;
use crate::application::errors::HostError;
use crate::domain::entities::AddonDescriptor;

/// Handle to a package registered as a first-class host plugin
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostPluginHandle(pub String);

impl HostPluginHandle {
    pub fn name(&self) -> &str {
        &self.0
    }
}

/// The host's plugin registration facility.
///
/// Only used for addons whose descriptor asks to be registered as a host plugin.
pub trait HostPlugins: Send + Sync {
    /// Register the package with the host
    fn load_host_plugin(&self, package: &Path, descriptor: &AddonDescriptor) -> Result<HostPluginHandle, HostError>;

    /// Enable a previously registered package
    fn enable_host_plugin(&self, handle: &HostPluginHandle) -> Result<(), HostError>;

    /// Release a registration, called when the addon behind it is unloaded
    fn unload_host_plugin(&self, handle: &HostPluginHandle) -> Result<(), HostError>;
}
