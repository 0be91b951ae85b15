mod common;

use std::sync::Arc;

use addon_host::application::errors::CommandError;
use addon_host::application::services::{register_addons_command, CommandService};
use addon_host::domain::entities::Message;
use common::Harness;

fn run(h: &Harness, line: &str) -> Result<Option<String>, CommandError> {
    let mut parts = line.split_whitespace().map(|s| s.to_string());
    let name = parts.next().unwrap();
    let message = Message::from_command("console", name, parts.collect());
    CommandService::dispatch(&h.commands, &message)
}

fn reply(h: &Harness, line: &str) -> String {
    run(h, line).unwrap().unwrap()
}

fn harness() -> Harness {
    let h = Harness::new();
    {
        let mut commands = h.commands.write().unwrap();
        commands.register_defaults();
        register_addons_command(&mut commands, Arc::downgrade(&h.manager));
    }
    h
}

#[test]
fn test_help_and_unknown_subcommand() {
    let h = harness();
    assert!(reply(&h, "addons").contains("addons unload <addon>"));
    assert!(reply(&h, "addons help").contains("addons info <addon>"));
    assert!(reply(&h, "addons info").starts_with("Addons help"));
    assert!(matches!(run(&h, "addons frobnicate"), Err(CommandError::InvalidArgs(_))));
    assert!(reply(&h, "help addons").contains("Usage: addons"));
}

#[test]
fn test_unknown_addon_is_invalid() {
    let h = harness();
    for sub in ["info", "enable", "disable", "unload"] {
        assert_eq!(reply(&h, &format!("addons {} Ghost", sub)), "Invalid addon: Ghost");
    }
    assert_eq!(reply(&h, "addons load ghost.addon"), "Invalid addon: ghost.addon");
}

#[test]
fn test_operator_session() {
    let h = harness();
    h.package("econ.addon", "Economy", "econ", "Recorder");

    assert_eq!(reply(&h, "addons list"), "No addons loaded");
    assert_eq!(reply(&h, "addons load econ.addon"), "Loaded addon Economy v1.0.0");
    assert!(reply(&h, "addons load econ.addon").contains("already loaded"));

    let info = reply(&h, "addons info Economy");
    assert!(info.contains("ID: econ"));
    assert!(info.contains("Description: Addon"));
    assert!(info.contains("Enabled: No"));

    assert_eq!(reply(&h, "addons enable Economy"), "Enabled addon Economy");
    assert_eq!(reply(&h, "addons enable Economy"), "Addon Economy is already enabled");
    assert!(reply(&h, "addons list").contains("Economy v1.0.0 [enabled]"));

    assert_eq!(reply(&h, "addons disable Economy"), "Disabled addon Economy");
    assert_eq!(reply(&h, "addons disable Economy"), "Addon Economy is not enabled");
    assert_eq!(reply(&h, "addons unload Economy"), "Unloaded addon Economy");
    assert!(!h.manager.is_loaded("Economy"));

    assert_eq!(h.events_for("Economy"), vec!["load", "enable", "disable"]);
}

#[test]
fn test_hook_failures_are_reported() {
    let h = harness();
    h.package("picky.addon", "Picky", "picky", "FailsEnable");
    reply(&h, "addons load picky.addon");

    let text = reply(&h, "addons enable Picky");
    assert!(text.starts_with("Couldn't enable addon Picky"));
    assert!(text.contains("missing dependency"));
    assert!(h.manager.is_loaded("Picky"));
}

#[test]
fn test_command_outlives_manager_gracefully() {
    let h = harness();
    let Harness { commands, manager, .. } = h;
    drop(manager);

    let message = Message::from_command("console", "addons", vec!["list".to_string()]);
    assert!(matches!(
        CommandService::dispatch(&commands, &message),
        Err(CommandError::ExecutionFailed(_))
    ));
}

#[test]
fn test_addon_cannot_take_over_host_command() {
    let h = harness();
    h.package("squat.addon", "Squatter", "squat", "Squatter");

    assert_eq!(reply(&h, "addons load squat.addon"), "Loaded addon Squatter v1.0.0");
    assert_eq!(h.events_for("Squatter"), vec!["rejected", "rejected", "load"]);
    assert_eq!(reply(&h, "squat"), "squatting");
    assert!(reply(&h, "addons list").contains("Squatter v1.0.0 [disabled]"));
    assert!(!reply(&h, "help addons").contains("Provided by"));

    assert_eq!(reply(&h, "addons unload Squatter"), "Unloaded addon Squatter");
    assert_eq!(reply(&h, "addons list"), "No addons loaded");
    assert!(reply(&h, "addon help").starts_with("Addons help"));
    assert!(matches!(run(&h, "squat"), Err(CommandError::NotFound(_))));
}
