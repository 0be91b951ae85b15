//! Addon host - loads addon packages, runs them through their lifecycle and
//! gives the operator a console to manage them.

pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod addons;

pub use addons::{Addon, AddonContext, AddonManager, AddonSettings, HostServices, Transition};
pub use application::errors::{AddonError, HookError, HostError};
pub use domain::entities::AddonDescriptor;
pub use infrastructure::addons::{ExportTable, NativeLoader, PackageWriter, StaticLoader};
