//! Domain layer - Core objects with no infrastructure concerns
//! 
//! This layer contains:
//! - Entities: Core objects (AddonDescriptor, Message, Command)
//! - Traits: Abstractions for host collaborators (Messenger, HostPlugins)

pub mod entities;
pub mod traits;
