//! Console adapter - the operator's terminal

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use crate::domain::traits::{Messenger, MessengerInfo};
use crate::application::errors::HostError;

/// Messenger backed by stdin/stdout
pub struct ConsoleAdapter {
    info: MessengerInfo,
}

impl ConsoleAdapter {
    pub fn new(host_name: impl Into<String>) -> Self {
        Self {
            info: MessengerInfo {
                id: "console".to_string(),
                name: host_name.into(),
                platform: "console".to_string(),
            },
        }
    }

    /// Operator input, one line at a time
    pub fn lines(&self) -> Lines<BufReader<Stdin>> {
        BufReader::new(tokio::io::stdin()).lines()
    }
}

impl Default for ConsoleAdapter {
    fn default() -> Self {
        Self::new(env!("CARGO_PKG_NAME"))
    }
}

#[async_trait]
impl Messenger for ConsoleAdapter {
    async fn start(&self) -> Result<(), HostError> {
        tracing::info!("Starting console for {}", self.info.name);
        Ok(())
    }

    async fn send_message(&self, _chat_id: &str, text: &str) -> Result<String, HostError> {
        println!("{}", text.trim_end());
        Ok(uuid::Uuid::new_v4().to_string())
    }

    fn info(&self) -> MessengerInfo {
        self.info.clone()
    }
}
