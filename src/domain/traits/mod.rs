//! Domain traits - Abstractions for host collaborators

pub mod messenger;
pub mod host;

pub use messenger::{Messenger, MessengerInfo};
pub use host::{HostPlugins, HostPluginHandle};
