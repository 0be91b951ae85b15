//! Application layer - Use cases and business logic
//! 
//! This layer contains:
//! - Services: command handling, including the `addons` command
//! - Errors: error types shared across the host
//! - Messaging: parsing operator input

pub mod errors;
pub mod services;
pub mod messaging;
