//! Mailing-list service configuration (UniSender)

use std::time::Duration;

use serde::Deserialize;

use super::cloudpayments::{default_request_timeout, is_http_url};
use super::error::ValidationError;
use crate::ports::Campaigns;

/// UniSender configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UniSenderConfig {
    /// API key
    pub api_key: String,

    /// API base URL
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// List joined at trial signup
    #[serde(default = "default_after_trial_expired")]
    pub after_trial_expired_list: String,

    /// List joined on renewal charges
    #[serde(default = "default_after_recurring_payment")]
    pub after_recurring_payment_list: String,

    /// List joined when autopayment is cancelled
    #[serde(default = "default_after_autopayment_cancelled")]
    pub after_autopayment_cancelled_list: String,

    /// Per-request timeout for API calls, in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl UniSenderConfig {
    /// List titles as the engine consumes them
    pub fn campaigns(&self) -> Campaigns {
        Campaigns {
            after_trial_expired: self.after_trial_expired_list.clone(),
            after_recurring_payment: self.after_recurring_payment_list.clone(),
            after_autopayment_cancelled: self.after_autopayment_cancelled_list.clone(),
        }
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Validate UniSender configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.api_key.trim().is_empty() {
            return Err(ValidationError::MissingRequired("UNISENDER__API_KEY"));
        }
        if !is_http_url(&self.api_base_url) {
            return Err(ValidationError::InvalidUrl("UNISENDER__API_BASE_URL"));
        }
        if self.request_timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        let lists = [
            ("UNISENDER__AFTER_TRIAL_EXPIRED_LIST", &self.after_trial_expired_list),
            ("UNISENDER__AFTER_RECURRING_PAYMENT_LIST", &self.after_recurring_payment_list),
            ("UNISENDER__AFTER_AUTOPAYMENT_CANCELLED_LIST", &self.after_autopayment_cancelled_list),
        ];
        for (name, title) in lists {
            if title.trim().is_empty() {
                return Err(ValidationError::MissingRequired(name));
            }
        }
        Ok(())
    }
}

impl Default for UniSenderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base_url: default_api_base_url(),
            after_trial_expired_list: default_after_trial_expired(),
            after_recurring_payment_list: default_after_recurring_payment(),
            after_autopayment_cancelled_list: default_after_autopayment_cancelled(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_api_base_url() -> String {
    "https://api.unisender.com/ru/api".to_string()
}

fn default_after_trial_expired() -> String {
    Campaigns::default().after_trial_expired
}

fn default_after_recurring_payment() -> String {
    Campaigns::default().after_recurring_payment
}

fn default_after_autopayment_cancelled() -> String {
    Campaigns::default().after_autopayment_cancelled
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_titles_match_campaign_defaults() {
        let config = UniSenderConfig::default();
        assert_eq!(config.campaigns(), Campaigns::default());
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let config = UniSenderConfig {
            api_key: "key".to_string(),
            request_timeout_secs: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidTimeout));
    }

    #[test]
    fn missing_api_key_is_rejected() {
        assert_eq!(
            UniSenderConfig::default().validate(),
            Err(ValidationError::MissingRequired("UNISENDER__API_KEY"))
        );
    }

    #[test]
    fn blank_list_title_is_rejected() {
        let config = UniSenderConfig {
            api_key: "key".to_string(),
            after_recurring_payment_list: " ".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::MissingRequired("UNISENDER__AFTER_RECURRING_PAYMENT_LIST"))
        );
    }

    #[test]
    fn custom_titles_flow_into_campaigns() {
        let config = UniSenderConfig {
            api_key: "key".to_string(),
            after_trial_expired_list: "Trial over".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.campaigns().after_trial_expired, "Trial over");
    }
}
