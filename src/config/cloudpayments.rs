//! Recurring-billing provider configuration (CloudPayments)

use std::time::Duration;

use serde::Deserialize;

use super::error::ValidationError;

/// CloudPayments configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CloudPaymentsConfig {
    /// Public terminal id, used as the Basic auth user
    pub public_id: String,

    /// API secret, used as the Basic auth password and webhook HMAC key
    pub api_secret: String,

    /// API base URL
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Reject webhooks whose Content-HMAC header does not match the body
    #[serde(default = "default_verify_hmac")]
    pub verify_hmac: bool,

    /// Per-request timeout for outbound API calls, in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl CloudPaymentsConfig {
    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Validate CloudPayments configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.public_id.trim().is_empty() {
            return Err(ValidationError::MissingRequired("CLOUDPAYMENTS__PUBLIC_ID"));
        }
        if self.api_secret.trim().is_empty() {
            return Err(ValidationError::MissingRequired("CLOUDPAYMENTS__API_SECRET"));
        }
        if !is_http_url(&self.api_base_url) {
            return Err(ValidationError::InvalidUrl("CLOUDPAYMENTS__API_BASE_URL"));
        }
        if self.request_timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

impl Default for CloudPaymentsConfig {
    fn default() -> Self {
        Self {
            public_id: String::new(),
            api_secret: String::new(),
            api_base_url: default_api_base_url(),
            verify_hmac: default_verify_hmac(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

pub(super) fn is_http_url(raw: &str) -> bool {
    raw.starts_with("https://") || raw.starts_with("http://")
}

fn default_api_base_url() -> String {
    "https://api.cloudpayments.ru".to_string()
}

fn default_verify_hmac() -> bool {
    true
}

pub(super) fn default_request_timeout() -> u64 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> CloudPaymentsConfig {
        CloudPaymentsConfig {
            public_id: "pk_test".to_string(),
            api_secret: "secret".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn defaults_point_at_production_api() {
        let config = CloudPaymentsConfig::default();
        assert_eq!(config.api_base_url, "https://api.cloudpayments.ru");
        assert!(config.verify_hmac);
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let config = CloudPaymentsConfig {
            request_timeout_secs: 0,
            ..valid()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidTimeout));
    }

    #[test]
    fn missing_credentials_are_rejected() {
        let config = CloudPaymentsConfig {
            api_secret: String::new(),
            ..valid()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::MissingRequired("CLOUDPAYMENTS__API_SECRET"))
        );
    }

    #[test]
    fn base_url_must_be_http() {
        let config = CloudPaymentsConfig {
            api_base_url: "ftp://api".to_string(),
            ..valid()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn valid_config_passes() {
        assert!(valid().validate().is_ok());
    }
}
