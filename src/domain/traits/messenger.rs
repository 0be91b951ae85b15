use async_trait::async_trait;
use crate::application::errors::HostError;

/// Messenger trait - the host's messaging collaborator that command replies go through
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Start the messenger and begin accepting input
    async fn start(&self) -> Result<(), HostError>;

    /// Send a message to a chat
    async fn send_message(&self, chat_id: &str, text: &str) -> Result<String, HostError>;

    /// Get messenger info
    fn info(&self) -> MessengerInfo;
}

/// Messenger information
#[derive(Debug, Clone)]
pub struct MessengerInfo {
    pub id: String,
    pub name: String,
    pub platform: String,
}
