//! Inbound webhook route configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Secret path segments and access-check settings for the HTTP routes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhooksConfig {
    /// Path segment of the trial signup form route
    pub trial_route_hash: String,

    /// Path segment of the one-time checkout (Prodamus) webhook
    pub prodamus_route_hash: String,

    /// Path segment of the CloudPayments payment webhook
    pub cloudpayments_pay_route_hash: String,

    /// Path segment of the CloudPayments recurrent status webhook
    pub cloudpayments_recurrent_route_hash: String,

    /// Project id the site sends with access checks
    pub project_id: String,
}

impl WebhooksConfig {
    /// Validate webhook configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        let required = [
            ("WEBHOOKS__TRIAL_ROUTE_HASH", &self.trial_route_hash),
            ("WEBHOOKS__PRODAMUS_ROUTE_HASH", &self.prodamus_route_hash),
            ("WEBHOOKS__CLOUDPAYMENTS_PAY_ROUTE_HASH", &self.cloudpayments_pay_route_hash),
            (
                "WEBHOOKS__CLOUDPAYMENTS_RECURRENT_ROUTE_HASH",
                &self.cloudpayments_recurrent_route_hash,
            ),
            ("WEBHOOKS__PROJECT_ID", &self.project_id),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(ValidationError::MissingRequired(name));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> WebhooksConfig {
        WebhooksConfig {
            trial_route_hash: "t".to_string(),
            prodamus_route_hash: "p".to_string(),
            cloudpayments_pay_route_hash: "c".to_string(),
            cloudpayments_recurrent_route_hash: "r".to_string(),
            project_id: "42".to_string(),
        }
    }

    #[test]
    fn all_hashes_are_required() {
        let config = WebhooksConfig {
            prodamus_route_hash: String::new(),
            ..valid()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::MissingRequired("WEBHOOKS__PRODAMUS_ROUTE_HASH"))
        );
    }

    #[test]
    fn project_id_is_required() {
        let config = WebhooksConfig {
            project_id: "  ".to_string(),
            ..valid()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn complete_config_passes() {
        assert!(valid().validate().is_ok());
    }
}
