//! Admin notification channel configuration (Telegram)

use std::time::Duration;

use serde::Deserialize;

use super::cloudpayments::default_request_timeout;
use super::error::ValidationError;

/// Telegram bot configuration.
///
/// Both fields absent means admin notices go to the log only.
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    /// Bot API token
    pub bot_token: Option<String>,

    /// Chat that receives admin notices
    pub admin_chat_id: Option<i64>,

    /// Bot API base URL
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Per-request timeout for Bot API calls, in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl TelegramConfig {
    /// Token and chat id when the channel is configured.
    pub fn credentials(&self) -> Option<(&str, i64)> {
        match (self.bot_token.as_deref(), self.admin_chat_id) {
            (Some(token), Some(chat_id)) if !token.trim().is_empty() => Some((token, chat_id)),
            _ => None,
        }
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Validate Telegram configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        let has_token = self
            .bot_token
            .as_deref()
            .is_some_and(|t| !t.trim().is_empty());
        if has_token != self.admin_chat_id.is_some() {
            return Err(ValidationError::IncompleteTelegramConfig);
        }
        if self.request_timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            admin_chat_id: None,
            api_base_url: default_api_base_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_api_base_url() -> String {
    "https://api.telegram.org".to_string()
}
