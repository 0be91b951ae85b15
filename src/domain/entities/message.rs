/// Message content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Text(String),
    Command { name: String, args: Vec<String> },
    Empty,
}

impl Content {
    pub fn text(&self) -> Option<&str> {
        match self {
            Content::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_command(&self) -> bool {
        matches!(self, Content::Command { .. })
    }

    /// Arguments of a command, empty for anything else
    pub fn args(&self) -> &[String] {
        match self {
            Content::Command { args, .. } => args,
            _ => &[],
        }
    }
}

/// A line of operator input, parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub chat_id: String,
    pub content: Content,
}

impl Message {
    pub fn new(chat_id: impl Into<String>, content: Content) -> Self {
        Self {
            chat_id: chat_id.into(),
            content,
        }
    }

    pub fn from_text(chat_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(chat_id, Content::Text(text.into()))
    }

    pub fn from_command(chat_id: impl Into<String>, name: impl Into<String>, args: Vec<String>) -> Self {
        Self::new(chat_id, Content::Command { name: name.into(), args })
    }

    /// Command name, if this message is a command
    pub fn command_name(&self) -> Option<&str> {
        match &self.content {
            Content::Command { name, .. } => Some(name),
            _ => None,
        }
    }
}
