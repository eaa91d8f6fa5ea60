//! Admin notification adapters.
//!
//! - `TelegramNotifier` posts to a bot chat
//! - `LogNotifier` writes to the log when no chat is configured
//! - `RecordingNotifier` keeps messages in memory for tests

mod bot_notifier;
mod log_notifier;

pub use bot_notifier::{split_message, TelegramNotifier, MAX_MESSAGE_CHARS};
pub use log_notifier::{LogNotifier, RecordingNotifier};
