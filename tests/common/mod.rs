//! Shared fixtures: test addons that write every hook call to a journal
//! the host shares with them.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Barrier, Mutex, RwLock};

use addon_host::addons::{Addon, AddonContext, AddonManager, AddonSettings, HostServices};
use addon_host::application::errors::{AddonError, HookError};
use addon_host::application::services::CommandService;
use addon_host::domain::entities::Command;
use addon_host::infrastructure::addons::{CodeLoader, ExportTable, PackageWriter, StaticLoader};
use tempfile::TempDir;

pub type Journal = Mutex<Vec<(String, &'static str)>>;

fn record(ctx: &AddonContext, event: &'static str) {
    if let Some(journal) = ctx.shared::<Journal>("journal") {
        journal.lock().unwrap().push((ctx.name().to_string(), event));
    }
}

/// Records every hook
pub struct Recorder;

impl Addon for Recorder {
    fn on_load(&mut self, ctx: &AddonContext) -> Result<(), HookError> {
        record(ctx, "load");
        Ok(())
    }

    fn on_enable(&mut self, ctx: &AddonContext) -> Result<(), HookError> {
        record(ctx, "enable");
        Ok(())
    }

    fn on_disable(&mut self, ctx: &AddonContext) -> Result<(), HookError> {
        record(ctx, "disable");
        Ok(())
    }
}

/// Registers a command, then refuses to load
pub struct FailsLoad;

impl Addon for FailsLoad {
    fn on_load(&mut self, ctx: &AddonContext) -> Result<(), HookError> {
        ctx.register_command(Command::new("half-baked"))?;
        record(ctx, "load");
        Err(HookError::new("database unreachable"))
    }

    fn on_enable(&mut self, ctx: &AddonContext) -> Result<(), HookError> {
        record(ctx, "enable");
        Ok(())
    }

    fn on_disable(&mut self, ctx: &AddonContext) -> Result<(), HookError> {
        record(ctx, "disable");
        Ok(())
    }
}

pub struct FailsEnable;

impl Addon for FailsEnable {
    fn on_load(&mut self, ctx: &AddonContext) -> Result<(), HookError> {
        record(ctx, "load");
        Ok(())
    }

    fn on_enable(&mut self, ctx: &AddonContext) -> Result<(), HookError> {
        record(ctx, "enable");
        Err("missing dependency".into())
    }

    fn on_disable(&mut self, ctx: &AddonContext) -> Result<(), HookError> {
        record(ctx, "disable");
        Ok(())
    }
}

pub struct PanicsOnEnable;

impl Addon for PanicsOnEnable {
    fn on_load(&mut self, ctx: &AddonContext) -> Result<(), HookError> {
        record(ctx, "load");
        Ok(())
    }

    fn on_enable(&mut self, _ctx: &AddonContext) -> Result<(), HookError> {
        panic!("enable exploded");
    }

    fn on_disable(&mut self, ctx: &AddonContext) -> Result<(), HookError> {
        record(ctx, "disable");
        Ok(())
    }
}

pub struct FailsDisable;

impl Addon for FailsDisable {
    fn on_load(&mut self, ctx: &AddonContext) -> Result<(), HookError> {
        record(ctx, "load");
        Ok(())
    }

    fn on_enable(&mut self, ctx: &AddonContext) -> Result<(), HookError> {
        record(ctx, "enable");
        Ok(())
    }

    fn on_disable(&mut self, ctx: &AddonContext) -> Result<(), HookError> {
        record(ctx, "disable");
        Err("could not flush".into())
    }
}

/// Uses the context services: commands, resources, configuration, the manager
pub struct Shopkeeper;

impl Addon for Shopkeeper {
    fn on_load(&mut self, ctx: &AddonContext) -> Result<(), HookError> {
        ctx.save_default_config()?;
        ctx.save_resource("prices/default.yml", false)?;
        let currency = ctx.configuration().get_str("currency").unwrap_or_default();
        ctx.register_command(
            Command::new("balance")
                .with_description("Show your balance")
                .with_handler(move |_| Ok(format!("0 {}", currency))),
        )?;
        record(ctx, "load");
        Ok(())
    }

    fn on_enable(&mut self, ctx: &AddonContext) -> Result<(), HookError> {
        let manager = ctx.manager().ok_or("manager gone")?;
        if manager.is_loaded(ctx.name()) && !manager.is_enabled(ctx.name()) {
            record(ctx, "enable");
        }
        Ok(())
    }

    fn on_disable(&mut self, ctx: &AddonContext) -> Result<(), HookError> {
        ctx.configuration().set("last-shutdown", "clean");
        ctx.configuration().save()?;
        record(ctx, "disable");
        Ok(())
    }
}

/// Tries to take over the host's `addons` command, then settles for its own
pub struct Squatter;

impl Addon for Squatter {
    fn on_load(&mut self, ctx: &AddonContext) -> Result<(), HookError> {
        let takeovers = [
            Command::new("addons").with_handler(|_| Ok("hijacked".to_string())),
            Command::new("plugins").with_aliases(vec!["ADDON".to_string()]),
        ];
        for command in takeovers {
            match ctx.register_command(command) {
                Err(AddonError::CommandConflict { .. }) => record(ctx, "rejected"),
                other => other?,
            }
        }
        ctx.register_command(Command::new("squat").with_handler(|_| Ok("squatting".to_string())))?;
        record(ctx, "load");
        Ok(())
    }

    fn on_enable(&mut self, _ctx: &AddonContext) -> Result<(), HookError> {
        Ok(())
    }

    fn on_disable(&mut self, ctx: &AddonContext) -> Result<(), HookError> {
        record(ctx, "disable");
        Ok(())
    }
}

/// Holds `on_enable` at the shared gate until the test lets it go
pub struct Parked;

impl Addon for Parked {
    fn on_load(&mut self, ctx: &AddonContext) -> Result<(), HookError> {
        record(ctx, "load");
        Ok(())
    }

    fn on_enable(&mut self, ctx: &AddonContext) -> Result<(), HookError> {
        let gate = ctx.shared::<Barrier>("gate").ok_or("no gate")?;
        gate.wait();
        gate.wait();
        record(ctx, "enable");
        Ok(())
    }

    fn on_disable(&mut self, ctx: &AddonContext) -> Result<(), HookError> {
        record(ctx, "disable");
        Ok(())
    }
}

/// Package-local replacement for the host's `Recorder`
pub struct Shadow;

impl Addon for Shadow {
    fn on_load(&mut self, ctx: &AddonContext) -> Result<(), HookError> {
        record(ctx, "shadow-load");
        Ok(())
    }

    fn on_enable(&mut self, _ctx: &AddonContext) -> Result<(), HookError> {
        Ok(())
    }

    fn on_disable(&mut self, _ctx: &AddonContext) -> Result<(), HookError> {
        Ok(())
    }
}

pub fn register_shadow(exports: &mut ExportTable) {
    exports.register_addon("Recorder", || Box::new(Shadow));
}

pub fn host_exports(journal: Arc<Journal>, gate: Arc<Barrier>) -> ExportTable {
    let mut exports = ExportTable::new();
    exports
        .register_addon("Recorder", || Box::new(Recorder))
        .register_addon("FailsLoad", || Box::new(FailsLoad))
        .register_addon("FailsEnable", || Box::new(FailsEnable))
        .register_addon("PanicsOnEnable", || Box::new(PanicsOnEnable))
        .register_addon("FailsDisable", || Box::new(FailsDisable))
        .register_addon("Shopkeeper", || Box::new(Shopkeeper))
        .register_addon("Squatter", || Box::new(Squatter))
        .register_addon("Parked", || Box::new(Parked))
        .register_shared("journal", journal)
        .register_shared("gate", gate);
    exports
}

pub struct Harness {
    pub dir: TempDir,
    pub journal: Arc<Journal>,
    /// Two-party barrier `Parked` waits on twice: once on entry, once to leave
    pub gate: Arc<Barrier>,
    pub commands: Arc<RwLock<CommandService>>,
    pub manager: Arc<AddonManager>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(|settings| settings, |services| services)
    }

    pub fn with_settings(configure: impl FnOnce(AddonSettings) -> AddonSettings) -> Self {
        Self::with(configure, |services| services)
    }

    pub fn with(
        configure: impl FnOnce(AddonSettings) -> AddonSettings,
        services: impl FnOnce(HostServices) -> HostServices,
    ) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let journal = Arc::new(Journal::default());
        let gate = Arc::new(Barrier::new(2));
        let commands = Arc::new(RwLock::new(CommandService::new("/")));

        let loader: Arc<dyn CodeLoader> = Arc::new(StaticLoader::new());
        let base = HostServices::new(commands.clone())
            .with_loader(loader)
            .with_exports(host_exports(journal.clone(), gate.clone()));
        let settings = configure(AddonSettings::new(dir.path().join("addons")));
        std::fs::create_dir_all(&settings.root_dir).unwrap();

        let manager = AddonManager::new(settings, services(base));
        Self { dir, journal, gate, commands, manager }
    }

    pub fn root(&self) -> &Path {
        self.manager.root_dir()
    }

    /// Write `<root>/<file>` holding a descriptor for `entry`
    pub fn package(&self, file: &str, name: &str, id: &str, entry: &str) -> PathBuf {
        let yaml = format!("name: {}\nid: {}\nversion: 1.0.0\nmain: {}\n", name, id, entry);
        self.package_with(file, &yaml, &[])
    }

    pub fn package_with(&self, file: &str, yaml: &str, extra: &[(&str, &str)]) -> PathBuf {
        let path = self.root().join(file);
        let mut writer = PackageWriter::new();
        writer.add_file("addon.yml", yaml);
        for (name, content) in extra {
            writer.add_file(*name, *content);
        }
        writer.write_to(&path).unwrap();
        path
    }

    /// Hook calls so far
    pub fn events(&self) -> Vec<(String, &'static str)> {
        self.journal.lock().unwrap().clone()
    }

    pub fn events_for(&self, name: &str) -> Vec<&'static str> {
        self.events()
            .into_iter()
            .filter(|(n, _)| n == name)
            .map(|(_, e)| e)
            .collect()
    }
}
