//! Addon system - the lifecycle contract addons implement and the manager driving it

pub mod configuration;
pub mod instance;
pub mod manager;
pub mod trait_def;

pub use configuration::{AddonConfiguration, CONFIG_FILE};
pub use instance::{AddonContext, AddonInstance, AddonLogger};
pub use manager::{AddonManager, HostServices};
pub use trait_def::{
    Addon, AddonSettings, AddonSummary, BulkEnableScope, BulkReport, DiscoveryReport,
    HostPluginStatus, LoadReport, ReenablePolicy, Transition,
};
