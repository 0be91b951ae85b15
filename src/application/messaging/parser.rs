//! Message parser - Parses raw console lines into structured messages

use crate::domain::entities::{Message, Content};

/// Parses operator input into Message objects
pub struct MessageParser {
    command_prefix: String,
    bare_commands: bool,
}

impl MessageParser {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            command_prefix: prefix.into(),
            bare_commands: false,
        }
    }

    /// Parser for the host console, where every line is a command and the prefix is optional
    pub fn console(prefix: impl Into<String>) -> Self {
        Self {
            bare_commands: true,
            ..Self::new(prefix)
        }
    }

    pub fn parse(&self, chat_id: impl Into<String>, text: impl Into<String>) -> Message {
        let text = text.into();
        let chat_id = chat_id.into();

        if text.trim().is_empty() {
            return Message::new(chat_id, Content::Empty);
        }

        if self.bare_commands || text.starts_with(&self.command_prefix) {
            return self.parse_command(chat_id, &text);
        }

        Message::from_text(chat_id, text)
    }

    fn parse_command(&self, chat_id: String, text: &str) -> Message {
        let cmd_text = text.trim_start().strip_prefix(&self.command_prefix).unwrap_or(text);

        let mut parts = cmd_text.split_whitespace().map(|s| s.to_string());
        let name = parts.next().unwrap_or_default();
        Message::from_command(chat_id, name, parts.collect())
    }

    pub fn prefix(&self) -> &str {
        &self.command_prefix
    }
}
