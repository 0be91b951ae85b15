//! The `addons` command - operator control over the addon manager

use std::sync::{Arc, Weak};
use crate::addons::{AddonManager, Transition};
use crate::application::errors::CommandError;
use crate::application::services::CommandService;
use crate::domain::entities::{Command, Message};

const HELP: &[(&str, &str)] = &[
    ("list", "Lists loaded addons"),
    ("info <addon>", "Displays info about an addon"),
    ("enable <addon>", "Enables an addon"),
    ("disable <addon>", "Disables an addon"),
    ("load <addon_file>", "Loads an addon from the addon directory"),
    ("unload <addon>", "Unloads an addon"),
];

/// Register the `addons` command; it holds the manager weakly
pub fn register_addons_command(commands: &mut CommandService, manager: Weak<AddonManager>) {
    commands.register(
        Command::new("addons")
            .with_description("Manages addons")
            .with_aliases(vec!["addon".to_string()])
            .with_usage("addons <help|list|info|enable|disable|load|unload> [addon]")
            .with_handler(move |msg| {
                let manager = manager
                    .upgrade()
                    .ok_or_else(|| CommandError::ExecutionFailed("Addon manager is gone".to_string()))?;
                execute(&manager, &msg)
            }),
    );
}

fn execute(manager: &Arc<AddonManager>, msg: &Message) -> Result<String, CommandError> {
    let args = msg.content.args();
    let Some(subcommand) = args.first() else {
        return Ok(help());
    };
    let target = args.get(1).map(String::as_str);

    match (subcommand.as_str(), target) {
        ("help", _) => Ok(help()),
        ("list", _) => Ok(list(manager)),
        ("info", Some(name)) => Ok(info(manager, name)),
        ("enable", Some(name)) => match manager.enable(name) {
            Ok(Transition::Applied) => Ok(format!("Enabled addon {}", name)),
            Ok(Transition::Unchanged) => Ok(format!("Addon {} is already enabled", name)),
            Ok(Transition::NotFound) => Ok(invalid(name)),
            Err(e) => Ok(format!("Couldn't enable addon {}: {}", name, e)),
        },
        ("disable", Some(name)) => match manager.disable(name) {
            Ok(Transition::Applied) => Ok(format!("Disabled addon {}", name)),
            Ok(_) if manager.is_loaded(name) => Ok(format!("Addon {} is not enabled", name)),
            Ok(_) => Ok(invalid(name)),
            Err(e) => Ok(format!("Couldn't disable addon {}: {}", name, e)),
        },
        ("load", Some(file)) => match manager.load_file(file) {
            Ok(Some(report)) => Ok(format!("Loaded addon {} v{}", report.name, report.version)),
            Ok(None) => Ok(invalid(file)),
            Err(e) => Ok(format!("Couldn't load addon {}: {}", file, e)),
        },
        ("unload", Some(name)) => match manager.unload(name) {
            Ok(Transition::NotFound) => Ok(invalid(name)),
            Ok(_) => Ok(format!("Unloaded addon {}", name)),
            Err(e) => Ok(format!("Unloaded addon {}, but it reported: {}", name, e)),
        },
        ("info" | "enable" | "disable" | "load" | "unload", None) => Ok(help()),
        (other, _) => Err(CommandError::InvalidArgs(format!("Unknown subcommand: {}", other))),
    }
}

fn invalid(name: &str) -> String {
    format!("Invalid addon: {}", name)
}

fn help() -> String {
    let mut out = "Addons help:\n".to_string();
    for (usage, description) in HELP {
        out.push_str(&format!("  addons {} | {}\n", usage, description));
    }
    out
}

fn list(manager: &AddonManager) -> String {
    let addons = manager.list();
    if addons.is_empty() {
        return "No addons loaded".to_string();
    }

    let mut out = format!("Addons ({}):\n", addons.len());
    for addon in addons {
        let state = if addon.enabled { "enabled" } else { "disabled" };
        out.push_str(&format!("  {} v{} [{}]\n", addon.name, addon.version, state));
    }
    out
}

fn info(manager: &AddonManager, name: &str) -> String {
    let Some(addon) = manager.get_addon(name) else {
        return invalid(name);
    };
    let descriptor = addon.descriptor();

    let mut out = format!("Addon: {} ({})\n", descriptor.name, descriptor.id);
    out.push_str(&format!("  Name: {}\n", descriptor.name));
    out.push_str(&format!("  ID: {}\n", descriptor.id));
    out.push_str(&format!("  Version: {}\n", descriptor.version));
    out.push_str(&format!("  Description: {}\n", descriptor.display_description()));
    if let Some(author) = &descriptor.author {
        out.push_str(&format!("  Author: {}\n", author));
    }
    out.push_str(&format!(
        "  Host plugin: {}\n",
        if descriptor.register_as_host_plugin { "Yes" } else { "No" }
    ));
    out.push_str(&format!(
        "  Enabled: {}\n",
        if manager.is_enabled(name) { "Yes" } else { "No" }
    ));
    out
}
