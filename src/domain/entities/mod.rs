//! Domain entities - Core business objects with no external dependencies

pub mod message;
pub mod command;
pub mod descriptor;

pub use message::{Message, Content};
pub use command::{Command, CommandHandler, CommandRegistry};
pub use descriptor::AddonDescriptor;
