//! Telegram front-end for the account feed.
//!
//! This crate provides:
//! - SQLite-based per-chat preference storage
//! - Telegram bot commands (auth, options, message type suppression, calc)
//! - Fan-out of formatted feed messages to authenticated chats

pub mod config;
pub mod db;
pub mod notifier;
pub mod telegram;

pub use config::{AuthOutcome, ChatPrefs};
pub use db::Database;
pub use notifier::{Delivery, Notifier};
pub use telegram::{CalcRequester, ChatIdentity, Command, CommandHandler, TelegramBot};
