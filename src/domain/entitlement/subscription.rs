//! Recurring-subscription identifiers and statuses as reported by the billing provider.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::ValidationError;

/// Provider-issued identifier of a recurring schedule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(String);

impl SubscriptionId {
    /// Trims the raw id.
    ///
    /// # Errors
    ///
    /// Returns `EmptyField` when the id is blank.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::empty_field("subscription_id"));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Mirror of the provider's subscription status.
///
/// This is not the local entitlement validity, which is always derived from
/// the expiry. Statuses the provider adds later are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SubscriptionStatus {
    Active,
    PastDue,
    Cancelled,
    Rejected,
    Expired,
    Other(String),
}

impl SubscriptionStatus {
    /// Parses a provider status string.
    ///
    /// Matching is case-insensitive. A blank status means the provider
    /// omitted it, which it only does for live schedules, so it maps to `Active`.
    pub fn from_provider(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "" | "active" => SubscriptionStatus::Active,
            "pastdue" | "past_due" => SubscriptionStatus::PastDue,
            "cancelled" | "canceled" => SubscriptionStatus::Cancelled,
            "rejected" => SubscriptionStatus::Rejected,
            "expired" => SubscriptionStatus::Expired,
            _ => SubscriptionStatus::Other(trimmed.to_string()),
        }
    }

    /// Provider spelling, also used for storage.
    pub fn as_str(&self) -> &str {
        match self {
            SubscriptionStatus::Active => "Active",
            SubscriptionStatus::PastDue => "PastDue",
            SubscriptionStatus::Cancelled => "Cancelled",
            SubscriptionStatus::Rejected => "Rejected",
            SubscriptionStatus::Expired => "Expired",
            SubscriptionStatus::Other(s) => s,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, SubscriptionStatus::Cancelled)
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for SubscriptionStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SubscriptionStatus {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(SubscriptionStatus::from_provider(&raw))
    }
}
