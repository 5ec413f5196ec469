//! Fan-out of formatted feed messages to authenticated chats.

use crate::config::ChatPrefs;
use crate::db::Database;
use crate::telegram::TelegramBot;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

#[derive(Error, Debug)]
pub enum NotifierError {
    #[error("Database error: {0}")]
    Db(#[from] crate::db::DbError),
}

/// One formatted message: `(type_tag, html)`.
pub type Delivery = (String, String);

/// Chats that should receive a message of this type.
pub fn recipients<'a>(chats: &'a [ChatPrefs], tag: &'a str) -> impl Iterator<Item = i64> + 'a {
    chats
        .iter()
        .filter(move |prefs| prefs.should_deliver(tag))
        .map(|prefs| prefs.chat_id)
}

/// Sends feed messages to every authenticated chat that did not disable
/// the message type.
pub struct Notifier {
    db: Database,
    bot: Arc<TelegramBot>,
}

impl Notifier {
    /// Create a new notifier.
    pub fn new(db: Database, bot: Arc<TelegramBot>) -> Self {
        Self { db, bot }
    }

    /// Deliver one message. Returns how many chats received it.
    pub async fn process(&self, tag: &str, text: &str) -> Result<u32, NotifierError> {
        let chats = self.db.authenticated_chats().await?;
        let mut sent_count = 0u32;

        for chat_id in recipients(&chats, tag) {
            match self.bot.send_html(chat_id, text).await {
                Ok(()) => sent_count += 1,
                Err(e) => {
                    error!(chat_id, tag, error = %e, "Failed to send message");
                }
            }
        }

        debug!(tag, sent = sent_count, "Message delivered");
        Ok(sent_count)
    }

    /// Consume deliveries until every sender is gone.
    pub async fn run(self, mut rx: mpsc::Receiver<Delivery>) {
        info!("Notifier started");
        while let Some((tag, text)) = rx.recv().await {
            if let Err(e) = self.process(&tag, &text).await {
                error!(tag = %tag, error = %e, "Failed to deliver message");
            }
        }
        info!("Notifier stopped");
    }
}
