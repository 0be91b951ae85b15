//! Infrastructure layer - External concerns
//! 
//! This layer contains:
//! - Config: Configuration loading
//! - Addons: package reading, code loading and the addon registry
//! - Host plugins: the host's own plugin table
//! - Adapters: the operator console

pub mod config;
pub mod addons;
pub mod host_plugins;
pub mod adapters;
