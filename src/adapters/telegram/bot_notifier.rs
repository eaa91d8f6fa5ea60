//! Telegram Bot API notifier.
//!
//! Sends admin notices to a single chat. Messages longer than the Bot API
//! limit are split on character boundaries. Send failures are logged and
//! swallowed; the caller never learns about them.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use crate::adapters::{http_client, DEFAULT_HTTP_TIMEOUT};
use crate::ports::AdminNotifier;

/// Bot API limit on message text, in characters.
pub const MAX_MESSAGE_CHARS: usize = 4096;

const DEFAULT_BASE_URL: &str = "https://api.telegram.org";

/// Admin notifier backed by a Telegram bot.
pub struct TelegramNotifier {
    bot_token: SecretString,
    chat_id: i64,
    base_url: String,
    http_client: reqwest::Client,
}

impl TelegramNotifier {
    pub fn new(bot_token: impl Into<String>, chat_id: i64) -> Self {
        Self {
            bot_token: SecretString::new(bot_token.into()),
            chat_id,
            base_url: DEFAULT_BASE_URL.to_string(),
            http_client: http_client(DEFAULT_HTTP_TIMEOUT),
        }
    }

    /// Bound every Bot API call to `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.http_client = http_client(timeout);
        self
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim().trim_end_matches('/').to_string();
        self
    }

    async fn send(&self, text: &str) -> Result<(), String> {
        let url = format!(
            "{}/bot{}/sendMessage",
            self.base_url,
            self.bot_token.expose_secret()
        );
        let response = self
            .http_client
            .post(&url)
            .json(&SendMessage {
                chat_id: self.chat_id,
                text,
            })
            .send()
            .await
            .map_err(|e| e.without_url().to_string())?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(format!("{}: {}", status, body.trim()));
        }
        Ok(())
    }
}

#[async_trait]
impl AdminNotifier for TelegramNotifier {
    async fn notify(&self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        tracing::info!(target: "admin", text = %text, "Admin notice");

        let chunks = split_message(text, MAX_MESSAGE_CHARS);
        let total = chunks.len();
        for (index, chunk) in chunks.iter().enumerate() {
            let chunk = chunk.trim();
            if chunk.is_empty() {
                continue;
            }
            if let Err(error) = self.send(chunk).await {
                tracing::error!(
                    error = %error,
                    chat_id = self.chat_id,
                    chunk_idx = index,
                    chunks_total = total,
                    "Failed to send admin notification"
                );
            }
        }
    }
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
}

/// Splits `text` into pieces of at most `max_chars` characters.
pub fn split_message(text: &str, max_chars: usize) -> Vec<String> {
    if max_chars == 0 || text.chars().count() <= max_chars {
        return vec![text.to_string()];
    }
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(max_chars)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_message_is_one_chunk() {
        assert_eq!(split_message("привет", 4096), vec!["привет".to_string()]);
    }

    #[test]
    fn long_message_splits_on_characters_not_bytes() {
        let text = "ж".repeat(10);
        let chunks = split_message(&text, 4);
        assert_eq!(chunks, vec!["жжжж", "жжжж", "жж"]);
    }

    #[test]
    fn zero_limit_keeps_message_whole() {
        assert_eq!(split_message("abc", 0).len(), 1);
    }

    #[tokio::test]
    async fn send_failure_is_swallowed() {
        let notifier = TelegramNotifier::new("token", 42).with_base_url("http://127.0.0.1:1");
        notifier.notify("payment accepted").await;
    }
}
