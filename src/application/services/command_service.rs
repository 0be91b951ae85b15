use std::sync::RwLock;
use crate::domain::entities::{Command, CommandHandler, CommandRegistry, Content, Message};
use crate::application::errors::CommandError;

/// Service for managing and executing commands
pub struct CommandService {
    registry: CommandRegistry,
    prefix: String,
}

impl CommandService {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            registry: CommandRegistry::new(),
            prefix: prefix.into(),
        }
    }

    /// Register a command, returning the one it replaced
    pub fn register(&mut self, command: Command) -> Option<Command> {
        self.registry.register(command)
    }

    /// A command of another owner that `command` would shadow
    pub fn conflicting(&self, command: &Command) -> Option<&Command> {
        self.registry.conflicting(command)
    }

    pub fn register_defaults(&mut self) {
        // Answered by `get_help`, the handler never runs
        self.register(Command::new("help")
            .with_description("Show help message")
            .with_usage("help [command]"));

        self.register(Command::new("version")
            .with_description("Show host version")
            .with_handler(|_| {
                Ok(format!("{} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")))
            }));
    }

    /// Remove the commands an addon registered
    pub fn unregister_owned_by(&mut self, owner: &str) -> usize {
        self.registry.remove_owned_by(owner)
    }

    pub fn handle(&self, message: &Message) -> Result<Option<String>, CommandError> {
        let Content::Command { name, args } = &message.content else {
            return Ok(None);
        };

        let cmd = self.registry.find(name)
            .ok_or_else(|| CommandError::NotFound(name.clone()))?;

        if cmd.name == "help" {
            return Ok(Some(self.get_help(args.first().map(String::as_str))));
        }

        if let Some(handler) = &cmd.handler {
            Ok(Some(handler(message.clone())?))
        } else {
            Ok(Some(format!("Command {} not implemented", cmd.name)))
        }
    }

    /// Handle a message without holding the lock while the handler runs,
    /// so handlers may register or remove commands themselves
    pub fn dispatch(service: &RwLock<CommandService>, message: &Message) -> Result<Option<String>, CommandError> {
        let Content::Command { name, args } = &message.content else {
            return Ok(None);
        };

        let handler = {
            let service = service.read()
                .map_err(|_| CommandError::ExecutionFailed("Lock poisoned".to_string()))?;
            let cmd = service.registry.find(name)
                .ok_or_else(|| CommandError::NotFound(name.clone()))?;

            if cmd.name == "help" {
                return Ok(Some(service.get_help(args.first().map(String::as_str))));
            }
            match &cmd.handler {
                Some(handler) => handler.clone(),
                None => return Ok(Some(format!("Command {} not implemented", cmd.name))),
            }
        };

        Ok(Some(handler(message.clone())?))
    }

    pub fn get_help(&self, command: Option<&str>) -> String {
        if let Some(name) = command {
            if let Some(cmd) = self.registry.find(name) {
                let mut help = format!("{} - {}", cmd.name, cmd.description.as_deref().unwrap_or("No description"));
                if let Some(usage) = &cmd.usage {
                    help.push_str(&format!("\nUsage: {}", usage));
                }
                if let Some(owner) = &cmd.owner {
                    help.push_str(&format!("\nProvided by: {}", owner));
                }
                return help;
            }
            return format!("Command {} not found", name);
        }

        let mut help = "Available commands:\n".to_string();
        for cmd in self.registry.all() {
            help.push_str(&format!("  {} - {}\n", cmd.name, cmd.description.as_deref().unwrap_or("")));
        }
        help
    }

    /// Handler of the command `input` names, shareable beyond the registry lock
    pub fn handler(&self, input: &str) -> Option<CommandHandler> {
        self.registry.find(input)?.handler.clone()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.registry.get(name).is_some()
    }

    pub fn names(&self) -> Vec<String> {
        self.registry.all().map(|c| c.name.clone()).collect()
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}
