use std::sync::Arc;
use indexmap::IndexMap;

/// Represents a host command
pub struct Command {
    pub name: String,
    pub description: Option<String>,
    pub aliases: Vec<String>,
    pub usage: Option<String>,
    pub handler: Option<CommandHandler>,
    /// Name of the addon that registered this command, if any
    pub owner: Option<String>,
}

/// Command handler function type
pub type CommandHandler = Arc<dyn Fn(crate::domain::entities::Message) -> Result<String, crate::application::errors::CommandError> + Send + Sync>;

impl Command {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            aliases: Vec::new(),
            usage: None,
            handler: None,
            owner: None,
        }
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn with_aliases(mut self, aliases: Vec<String>) -> Self {
        self.aliases = aliases;
        self
    }

    pub fn with_usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = Some(usage.into());
        self
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    pub fn with_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(crate::domain::entities::Message) -> Result<String, crate::application::errors::CommandError> + Send + Sync + 'static,
    {
        self.handler = Some(Arc::new(handler));
        self
    }

    pub fn matches(&self, input: &str) -> bool {
        let input_lower = input.to_lowercase();
        self.name.to_lowercase() == input_lower ||
            self.aliases.iter().any(|a| a.to_lowercase() == input_lower)
    }
}

/// Command registry for managing available commands, in registration order
#[derive(Default)]
pub struct CommandRegistry {
    commands: IndexMap<String, Command>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command, replacing any command with the same name
    pub fn register(&mut self, command: Command) -> Option<Command> {
        self.commands.insert(command.name.clone(), command)
    }

    /// A registered command of another owner that `command`'s name or aliases would shadow
    pub fn conflicting(&self, command: &Command) -> Option<&Command> {
        self.commands.values().find(|existing| {
            existing.owner != command.owner
                && std::iter::once(&existing.name)
                    .chain(existing.aliases.iter())
                    .any(|name| command.matches(name))
        })
    }

    pub fn get(&self, name: &str) -> Option<&Command> {
        self.commands.get(name)
    }

    pub fn find(&self, input: &str) -> Option<&Command> {
        self.commands.values().find(|c| c.matches(input))
    }

    pub fn all(&self) -> impl Iterator<Item = &Command> {
        self.commands.values()
    }

    /// Remove every command registered by `owner`, returning how many were removed
    pub fn remove_owned_by(&mut self, owner: &str) -> usize {
        let before = self.commands.len();
        self.commands.retain(|_, c| c.owner.as_deref() != Some(owner));
        before - self.commands.len()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_aliases_case_insensitive() {
        let cmd = Command::new("addons").with_aliases(vec!["ad".to_string()]);
        assert!(cmd.matches("ADDONS"));
        assert!(cmd.matches("ad"));
        assert!(!cmd.matches("add"));
    }

    #[test]
    fn test_remove_owned_by() {
        let mut registry = CommandRegistry::new();
        registry.register(Command::new("help"));
        registry.register(Command::new("balance").with_owner("Economy"));
        registry.register(Command::new("pay").with_owner("Economy"));
        registry.register(Command::new("warp").with_owner("Warps"));

        assert_eq!(registry.remove_owned_by("Economy"), 2);
        assert_eq!(registry.len(), 2);
        assert!(registry.get("help").is_some());
        assert!(registry.get("warp").is_some());
        assert_eq!(registry.remove_owned_by("Economy"), 0);
    }

    #[test]
    fn test_conflicting_ignores_own_commands() {
        let mut registry = CommandRegistry::new();
        registry.register(Command::new("addons").with_aliases(vec!["addon".to_string()]));
        registry.register(Command::new("balance").with_owner("Economy"));

        let hijack = Command::new("addons").with_owner("Squatter");
        assert!(registry.conflicting(&hijack).is_some());

        let by_alias = Command::new("plugins").with_aliases(vec!["Addon".to_string()]).with_owner("Squatter");
        assert_eq!(registry.conflicting(&by_alias).map(|c| c.name.as_str()), Some("addons"));

        let rename = Command::new("bal").with_aliases(vec!["balance".to_string()]).with_owner("Warps");
        assert_eq!(registry.conflicting(&rename).and_then(|c| c.owner.as_deref()), Some("Economy"));

        let again = Command::new("balance").with_owner("Economy");
        assert!(registry.conflicting(&again).is_none());
        assert!(registry.conflicting(&Command::new("warp").with_owner("Warps")).is_none());
    }
}
