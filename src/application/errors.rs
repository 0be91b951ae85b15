//! Application layer errors

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// General host errors
#[derive(Error, Debug)]
pub enum HostError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Addon error: {0}")]
    Addon(#[from] AddonError),

    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    #[error("Host plugin error: {0}")]
    HostPlugin(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Lifecycle hook names, used when reporting hook failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hook {
    Load,
    Enable,
    Disable,
}

impl Hook {
    pub fn as_str(&self) -> &str {
        match self {
            Hook::Load => "on_load",
            Hook::Enable => "on_enable",
            Hook::Disable => "on_disable",
        }
    }
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Addon lifecycle errors
#[derive(Error, Debug)]
pub enum AddonError {
    #[error("Addon metadata missing: {0}")]
    MetadataMissing(String),

    #[error("Addon metadata invalid: {0}")]
    MetadataInvalid(String),

    #[error("Addon '{0}' is already loaded")]
    DuplicateAddon(String),

    #[error("Addon id '{id}' is already bound to '{owner}'")]
    DuplicateId { id: String, owner: String },

    #[error("Entry point not found: {0}")]
    EntryPointNotFound(String),

    #[error("Entry point incompatible: {0}")]
    EntryPointIncompatible(String),

    #[error("Command '{command}' is already provided by {owner}")]
    CommandConflict { command: String, owner: String },

    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("Addon '{name}' failed in {hook}: {message}")]
    LifecycleHook {
        name: String,
        hook: Hook,
        message: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error raised by an addon's own lifecycle hook
#[derive(Error, Debug)]
#[error("{0}")]
pub struct HookError(String);

impl HookError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

impl From<String> for HookError {
    fn from(message: String) -> Self {
        Self(message)
    }
}

impl From<&str> for HookError {
    fn from(message: &str) -> Self {
        Self(message.to_string())
    }
}

impl From<std::io::Error> for HookError {
    fn from(e: std::io::Error) -> Self {
        Self(e.to_string())
    }
}

impl From<ConfigError> for HookError {
    fn from(e: ConfigError) -> Self {
        Self(e.to_string())
    }
}

impl From<AddonError> for HookError {
    fn from(e: AddonError) -> Self {
        Self(e.to_string())
    }
}

/// Command execution errors
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Command not found: {0}")]
    NotFound(String),

    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
