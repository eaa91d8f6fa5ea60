//! Entitlement policy configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Entitlement policy knobs
#[derive(Debug, Clone, Deserialize)]
pub struct EntitlementConfig {
    /// Trial length used when the signup form sends no duration
    #[serde(default = "default_trial_days")]
    pub default_trial_days: u32,
}

impl EntitlementConfig {
    /// Validate entitlement configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.default_trial_days == 0 || self.default_trial_days > 365 {
            return Err(ValidationError::InvalidTrialDays);
        }
        Ok(())
    }
}

impl Default for EntitlementConfig {
    fn default() -> Self {
        Self {
            default_trial_days: default_trial_days(),
        }
    }
}

fn default_trial_days() -> u32 {
    14
}
