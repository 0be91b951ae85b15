//! Application services - command handling for the host console

pub mod addons_command;
pub mod command_service;

pub use addons_command::register_addons_command;
pub use command_service::CommandService;
