use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use addon_host::addons::{AddonManager, HostServices};
use addon_host::application::errors::HostError;
use addon_host::application::messaging::MessageParser;
use addon_host::application::services::{register_addons_command, CommandService};
use addon_host::domain::traits::Messenger;
use addon_host::infrastructure::adapters::ConsoleAdapter;
use addon_host::infrastructure::addons::{manifest, PackageArchive, PackageWriter, METADATA_ENTRY};
use addon_host::infrastructure::config::Config;

#[derive(Parser)]
#[command(name = "addon-host")]
#[command(about = "Loads, enables and manages addon packages", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Addon directory (overrides config)
    #[arg(short, long)]
    addons_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the host and its console
    Run,
    /// Print a package's descriptor
    Inspect {
        package: PathBuf,
    },
    /// Build a package from a directory holding addon.yml
    Pack {
        dir: PathBuf,
        out: PathBuf,
        /// Store entries without compression
        #[arg(long)]
        stored: bool,
    },
    /// Generate default config
    InitConfig {
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show version
    Version,
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run => run_host(&cli.config, cli.addons_dir),
        Commands::Inspect { package } => inspect(&package),
        Commands::Pack { dir, out, stored } => pack(&dir, &out, stored),
        Commands::InitConfig { output } => init_config(output.as_deref()),
        Commands::Version => {
            println!("{} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    };

    if let Err(e) = result {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn load_config(config_path: &str, addons_dir: Option<PathBuf>) -> Config {
    let mut config = if Path::new(config_path).exists() {
        Config::load(config_path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config: {}, using defaults", e);
            Config::default()
        })
    } else {
        Config::default()
    };
    config.apply_env();

    if let Some(dir) = addons_dir {
        config.addons.directory = dir;
    }
    config
}

fn run_host(config_path: &str, addons_dir: Option<PathBuf>) -> Result<(), HostError> {
    let config = load_config(config_path, addons_dir);
    tracing::info!("Starting {}", config.host.name);

    let commands = Arc::new(RwLock::new(CommandService::new(config.host.prefix.clone())));
    let manager = AddonManager::new(config.to_settings(), HostServices::new(commands.clone()));
    {
        let mut commands = commands.write()
            .map_err(|_| HostError::Internal("Lock poisoned".to_string()))?;
        commands.register_defaults();
        register_addons_command(&mut commands, Arc::downgrade(&manager));
    }

    let report = manager.start()?;
    for (path, e) in &report.failed {
        tracing::warn!("Skipped {}: {}", path.display(), e);
    }
    tracing::info!("Addons loaded: {:?}", report.loaded_names());

    let rt = tokio::runtime::Runtime::new()?;
    let console = ConsoleAdapter::new(config.host.name.clone());
    let outcome = rt.block_on(run_console(&console, commands, &config.host.prefix));

    let shutdown = manager.shutdown()?;
    for (name, e) in &shutdown.failed {
        tracing::warn!("Addon {} did not shut down cleanly: {}", name, e);
    }
    outcome
}

async fn run_console(
    console: &ConsoleAdapter,
    commands: Arc<RwLock<CommandService>>,
    prefix: &str,
) -> Result<(), HostError> {
    console.start().await?;
    let parser = MessageParser::console(prefix);
    let mut lines = console.lines();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let info = console.info();
    tracing::debug!("Messenger {} ready on {}", info.id, info.platform);
    println!("{} console. Type 'help' for commands, 'exit' to quit.", info.name);
    loop {
        let line = tokio::select! {
            _ = &mut ctrl_c => {
                tracing::info!("Interrupted, shutting down");
                break;
            }
            line = lines.next_line() => line?,
        };

        let Some(line) = line else {
            break;
        };
        if matches!(line.trim(), "exit" | "quit" | "stop") {
            break;
        }

        let message = parser.parse("console", line);
        let Some(name) = message.command_name() else {
            continue;
        };
        tracing::debug!("Console command: {}", name);
        let chat_id = message.chat_id.clone();

        // Lifecycle hooks are synchronous and may block
        let commands = commands.clone();
        let reply = tokio::task::spawn_blocking(move || CommandService::dispatch(&commands, &message))
            .await
            .map_err(|e| HostError::Internal(format!("Command task failed: {}", e)))?;

        match reply {
            Ok(Some(text)) => {
                console.send_message(&chat_id, &text).await?;
            }
            Ok(None) => {}
            Err(e) => {
                console.send_message(&chat_id, &e.to_string()).await?;
            }
        }
    }
    Ok(())
}

fn inspect(package: &Path) -> Result<(), HostError> {
    let archive = PackageArchive::open(package)?;
    let descriptor = manifest::descriptor_from_archive(&archive)?;
    let json = serde_json::json!({
        "descriptor": descriptor,
        "entries": archive.entry_names()?,
    });
    let text = serde_json::to_string_pretty(&json)
        .map_err(|e| HostError::Internal(e.to_string()))?;
    println!("{}", text);
    Ok(())
}

fn pack(dir: &Path, out: &Path, stored: bool) -> Result<(), HostError> {
    let metadata = std::fs::read(dir.join(METADATA_ENTRY))
        .map_err(|e| HostError::NotFound(format!("{} in {}: {}", METADATA_ENTRY, dir.display(), e)))?;
    let descriptor = manifest::parse_descriptor(&metadata)?;

    let mut writer = if stored { PackageWriter::new().stored() } else { PackageWriter::new() };
    writer.add_dir(dir)?;
    writer.write_to(out)?;

    println!(
        "Packed {} v{} ({} entries) into {}",
        descriptor.name,
        descriptor.version,
        writer.len(),
        out.display()
    );
    Ok(())
}

fn init_config(output: Option<&Path>) -> Result<(), HostError> {
    let yaml = Config::default().to_yaml()?;
    match output {
        Some(path) => {
            std::fs::write(path, yaml)?;
            println!("Wrote default config to {}", path.display());
        }
        None => {
            println!("{}", yaml);
            println!("\nSave this to config.yaml and adjust as needed.");
        }
    }
    Ok(())
}
