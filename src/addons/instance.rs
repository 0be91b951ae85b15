//! Loaded addon instances and the context their hooks run with

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};
use once_cell::sync::OnceCell;
use tracing::Span;
use crate::addons::configuration::{AddonConfiguration, CONFIG_FILE};
use crate::addons::manager::AddonManager;
use crate::addons::trait_def::Addon;
use crate::application::errors::{AddonError, CommandError, Hook};
use crate::application::services::CommandService;
use crate::domain::entities::{AddonDescriptor, Command, CommandHandler, Message};
use crate::domain::traits::HostPluginHandle;
use crate::infrastructure::addons::{ExecutionContext, PackageArchive};

/// Logger scoped to one addon
#[derive(Debug, Clone)]
pub struct AddonLogger {
    name: String,
}

impl AddonLogger {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn debug(&self, message: impl fmt::Display) {
        tracing::debug!(addon = %self.name, "{}", message);
    }

    pub fn info(&self, message: impl fmt::Display) {
        tracing::info!(addon = %self.name, "{}", message);
    }

    pub fn warn(&self, message: impl fmt::Display) {
        tracing::warn!(addon = %self.name, "{}", message);
    }

    pub fn error(&self, message: impl fmt::Display) {
        tracing::error!(addon = %self.name, "{}", message);
    }
}

/// Everything an addon can reach from its hooks
pub struct AddonContext {
    descriptor: AddonDescriptor,
    package: PathBuf,
    data_dir: PathBuf,
    logger: AddonLogger,
    configuration: OnceCell<AddonConfiguration>,
    manager: Weak<AddonManager>,
    commands: Arc<RwLock<CommandService>>,
    execution: Arc<ExecutionContext>,
}

impl AddonContext {
    pub(crate) fn new(
        descriptor: AddonDescriptor,
        package: impl Into<PathBuf>,
        data_dir: impl Into<PathBuf>,
        manager: Weak<AddonManager>,
        commands: Arc<RwLock<CommandService>>,
        execution: Arc<ExecutionContext>,
    ) -> Self {
        let logger = AddonLogger::new(&descriptor.name);
        Self {
            descriptor,
            package: package.into(),
            data_dir: data_dir.into(),
            logger,
            configuration: OnceCell::new(),
            manager,
            commands,
            execution,
        }
    }

    pub fn descriptor(&self) -> &AddonDescriptor {
        &self.descriptor
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn id(&self) -> &str {
        &self.descriptor.id
    }

    /// The package this addon was loaded from
    pub fn package(&self) -> &Path {
        &self.package
    }

    /// Private data directory, `<addon root>/<id>`
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn logger(&self) -> &AddonLogger {
        &self.logger
    }

    /// The manager that loaded this addon, gone once the host shuts down
    pub fn manager(&self) -> Option<Arc<AddonManager>> {
        self.manager.upgrade()
    }

    /// The addon's configuration, loaded on first use
    pub fn configuration(&self) -> &AddonConfiguration {
        self.configuration
            .get_or_init(|| AddonConfiguration::load(self.data_dir.join(CONFIG_FILE)))
    }

    /// Copy the bundled `config.yml` into the data directory unless one exists
    pub fn save_default_config(&self) -> Result<(), AddonError> {
        self.save_resource(CONFIG_FILE, false)?;
        if let Some(config) = self.configuration.get() {
            config.reload().map_err(|e| AddonError::Internal(e.to_string()))?;
        }
        Ok(())
    }

    /// Read a file bundled in the package
    pub fn resource(&self, name: &str) -> Result<Option<Vec<u8>>, AddonError> {
        PackageArchive::open(&self.package)?.read(name)
    }

    /// Copy a bundled file into the data directory, returning whether it was written
    pub fn save_resource(&self, name: &str, replace: bool) -> Result<bool, AddonError> {
        let relative = Path::new(name);
        if !relative.components().all(|c| matches!(c, Component::Normal(_))) {
            return Err(AddonError::Internal(format!("resource path '{}' escapes the data directory", name)));
        }

        let dest = self.data_dir.join(relative);
        if dest.exists() && !replace {
            return Ok(false);
        }

        let Some(data) = self.resource(name)? else {
            self.logger.warn(format!("Resource {} not found in the addon", name));
            return Ok(false);
        };
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&dest, data)?;
        Ok(true)
    }

    /// Register a command owned by this addon; it goes away when the addon is unloaded.
    ///
    /// Fails with `CommandConflict` if the name or an alias belongs to the
    /// host or another addon. The handler keeps this addon's code loaded for
    /// as long as the host can still call it.
    pub fn register_command(&self, mut command: Command) -> Result<(), AddonError> {
        command.owner = Some(self.name().to_string());
        if let Some(handler) = command.handler.take() {
            let owned = OwnedHandler {
                handler,
                _execution: self.execution.clone(),
            };
            command = command.with_handler(move |message| owned.call(message));
        }

        let mut commands = self.commands.write()
            .map_err(|_| AddonError::Internal("Lock poisoned".to_string()))?;
        if let Some(existing) = commands.conflicting(&command) {
            return Err(AddonError::CommandConflict {
                command: command.name,
                owner: existing.owner.clone().unwrap_or_else(|| "the host".to_string()),
            });
        }
        commands.register(command);
        Ok(())
    }

    /// A value the host shares with addons
    pub fn shared<T: std::any::Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        self.execution.host_exports().shared(name)
    }

    pub(crate) fn execution(&self) -> &Arc<ExecutionContext> {
        &self.execution
    }
}

// handler first: its code may live in the library the execution context holds
struct OwnedHandler {
    handler: CommandHandler,
    _execution: Arc<ExecutionContext>,
}

impl OwnedHandler {
    fn call(&self, message: Message) -> Result<String, CommandError> {
        (self.handler)(message)
    }
}

/// A loaded addon: its code and its context, which holds the execution context it came from
pub struct AddonInstance {
    // dropped in order: the addon before the code it was built from
    addon: Mutex<Box<dyn Addon>>,
    context: AddonContext,
    // set by on_load/on_enable, cleared by on_disable
    cleanup_pending: AtomicBool,
    host_plugin: Mutex<Option<HostPluginHandle>>,
}

impl AddonInstance {
    pub(crate) fn new(addon: Box<dyn Addon>, context: AddonContext) -> Self {
        Self {
            addon: Mutex::new(addon),
            context,
            cleanup_pending: AtomicBool::new(false),
            host_plugin: Mutex::new(None),
        }
    }

    pub fn descriptor(&self) -> &AddonDescriptor {
        self.context.descriptor()
    }

    pub fn name(&self) -> &str {
        self.context.name()
    }

    pub fn context(&self) -> &AddonContext {
        &self.context
    }

    pub fn data_dir(&self) -> &Path {
        self.context.data_dir()
    }

    pub fn execution(&self) -> &Arc<ExecutionContext> {
        self.context.execution()
    }

    /// Handle of the host plugin registration made for this addon, if any
    pub fn host_plugin(&self) -> Option<HostPluginHandle> {
        self.host_plugin.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub(crate) fn set_host_plugin(&self, handle: HostPluginHandle) {
        *self.host_plugin.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);
    }

    pub(crate) fn take_host_plugin(&self) -> Option<HostPluginHandle> {
        self.host_plugin.lock().unwrap_or_else(|e| e.into_inner()).take()
    }

    /// Run a lifecycle hook inside the addon's span, turning errors and panics into `LifecycleHook`
    pub(crate) fn run_hook(&self, hook: Hook) -> Result<(), AddonError> {
        let span = self.span();
        let _entered = span.enter();

        let mut addon = self.addon.lock().unwrap_or_else(|e| e.into_inner());
        self.cleanup_pending.store(hook != Hook::Disable, Ordering::SeqCst);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| match hook {
            Hook::Load => addon.on_load(&self.context),
            Hook::Enable => addon.on_enable(&self.context),
            Hook::Disable => addon.on_disable(&self.context),
        }));

        let message = match outcome {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(e)) => e.to_string(),
            Err(payload) => panic_message(payload.as_ref()),
        };
        Err(AddonError::LifecycleHook {
            name: self.name().to_string(),
            hook,
            message,
        })
    }

    /// Whether `on_disable` still has to run before the addon can be dropped
    pub fn cleanup_pending(&self) -> bool {
        self.cleanup_pending.load(Ordering::SeqCst)
    }

    /// Span that covers this addon's activity
    pub fn span(&self) -> Span {
        tracing::info_span!("addon", name = %self.name(), id = %self.descriptor().id)
    }
}

impl fmt::Debug for AddonInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AddonInstance")
            .field("descriptor", self.descriptor())
            .field("data_dir", &self.data_dir())
            .field("execution", self.execution())
            .finish()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {}", s)
    } else {
        "panicked".to_string()
    }
}
