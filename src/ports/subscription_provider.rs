//! Subscription provider port for the external recurring-billing service.
//!
//! The reconciliation engine only ever pushes state to the provider: it
//! moves a schedule's next charge date or cancels a schedule. It never
//! reads provider state back except for the status returned by an update.

use crate::domain::entitlement::{SubscriptionId, SubscriptionStatus};
use crate::domain::foundation::{DomainError, ErrorCode, Timestamp};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Port for recurring-schedule management.
#[async_trait]
pub trait SubscriptionProvider: Send + Sync {
    /// Moves the schedule so its next charge happens at `update.start_date`
    /// and repeats every `update.period` `update.interval`s.
    ///
    /// Returns the provider's authoritative status (`Active` when omitted).
    ///
    /// # Errors
    ///
    /// Returns `SubscriptionProviderError` on transport failure or when the
    /// provider rejects the update.
    async fn update_schedule(
        &self,
        update: &ScheduleUpdate,
    ) -> Result<SubscriptionStatus, SubscriptionProviderError>;

    /// Cancels a schedule so it never charges again.
    async fn cancel_schedule(
        &self,
        subscription_id: &SubscriptionId,
    ) -> Result<(), SubscriptionProviderError>;
}

/// Request to reschedule a recurring subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleUpdate {
    pub subscription_id: SubscriptionId,
    pub start_date: Timestamp,
    pub interval: IntervalUnit,
    pub period: u32,
}

impl ScheduleUpdate {
    /// A schedule charging every `months` calendar months from `start_date`.
    pub fn monthly(subscription_id: SubscriptionId, start_date: Timestamp, months: u32) -> Self {
        Self {
            subscription_id,
            start_date,
            interval: IntervalUnit::Month,
            period: months,
        }
    }
}

/// Unit of a recurring interval, spelled the way billing providers expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntervalUnit {
    Day,
    Week,
    Month,
}

impl IntervalUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntervalUnit::Day => "Day",
            IntervalUnit::Week => "Week",
            IntervalUnit::Month => "Month",
        }
    }
}

/// Error from the subscription provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionProviderError {
    pub code: ProviderErrorCode,
    pub message: String,
    /// HTTP status returned by the provider, if any.
    pub http_status: Option<u16>,
}

impl SubscriptionProviderError {
    pub fn new(code: ProviderErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            http_status: None,
        }
    }

    pub fn with_http_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        self
    }

    /// Transport-level failure (DNS, TLS, connection reset, timeout).
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::NetworkError, message)
    }

    /// Credentials were refused.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::AuthenticationError, message)
    }

    /// The provider answered but reported failure.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::Rejected, message)
    }

    /// The response could not be understood.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InvalidResponse, message)
    }

    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }
}

impl std::fmt::Display for SubscriptionProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for SubscriptionProviderError {}

impl From<SubscriptionProviderError> for DomainError {
    fn from(err: SubscriptionProviderError) -> Self {
        DomainError::new(ErrorCode::InternalError, err.to_string())
            .with_detail("provider_code", err.code.to_string())
    }
}

/// Categories of provider failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorCode {
    NetworkError,
    AuthenticationError,
    Rejected,
    InvalidResponse,
}

impl ProviderErrorCode {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProviderErrorCode::NetworkError)
    }
}

impl std::fmt::Display for ProviderErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ProviderErrorCode::NetworkError => "network_error",
            ProviderErrorCode::AuthenticationError => "authentication_error",
            ProviderErrorCode::Rejected => "rejected",
            ProviderErrorCode::InvalidResponse => "invalid_response",
        };
        write!(f, "{}", s)
    }
}
