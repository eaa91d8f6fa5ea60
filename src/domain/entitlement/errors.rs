//! Entitlement-specific error types.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | AlreadyRegistered | 409 |
//! | NotFound | 404 |
//! | SubscriptionNotFound | 404 |
//! | Forbidden | 403 |
//! | Timeout | 408 |
//! | ValidationFailed | 400 |
//! | Provider | 500 |
//! | MailingList | 500 |
//! | Infrastructure | 500 |

use crate::domain::foundation::{DomainError, ErrorCode, ValidationError};

/// Errors surfaced by the reconciliation engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntitlementError {
    /// A record already exists for this email (trial signup conflict).
    AlreadyRegistered(String),

    /// The record targeted by an update no longer exists.
    NotFound(String),

    /// No record currently holds this subscription id.
    SubscriptionNotFound(String),

    /// Caller is not allowed to read this entitlement.
    Forbidden,

    /// A key lock or the caller's deadline elapsed; the transaction was rolled back.
    Timeout(String),

    /// The billing provider refused or failed an operation.
    Provider(String),

    /// The mailing-list service failed.
    MailingList(String),

    /// Validation failed.
    ValidationFailed { field: String, message: String },

    /// Infrastructure error.
    Infrastructure(String),
}

impl EntitlementError {
    pub fn already_registered(email: impl Into<String>) -> Self {
        EntitlementError::AlreadyRegistered(email.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        EntitlementError::NotFound(what.into())
    }

    pub fn subscription_not_found(subscription_id: impl Into<String>) -> Self {
        EntitlementError::SubscriptionNotFound(subscription_id.into())
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        EntitlementError::Timeout(message.into())
    }

    pub fn provider(message: impl Into<String>) -> Self {
        EntitlementError::Provider(message.into())
    }

    pub fn mailing_list(message: impl Into<String>) -> Self {
        EntitlementError::MailingList(message.into())
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        EntitlementError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        EntitlementError::Infrastructure(message.into())
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            EntitlementError::AlreadyRegistered(_) => ErrorCode::EntitlementExists,
            EntitlementError::NotFound(_) => ErrorCode::EntitlementNotFound,
            EntitlementError::SubscriptionNotFound(_) => ErrorCode::SubscriptionNotFound,
            EntitlementError::Forbidden => ErrorCode::Forbidden,
            EntitlementError::Timeout(_) => ErrorCode::LockTimeout,
            EntitlementError::ValidationFailed { .. } => ErrorCode::ValidationFailed,
            EntitlementError::Provider(_) | EntitlementError::MailingList(_) => {
                ErrorCode::InternalError
            }
            EntitlementError::Infrastructure(_) => ErrorCode::DatabaseError,
        }
    }

    /// Returns a human-readable error message.
    pub fn message(&self) -> String {
        match self {
            EntitlementError::AlreadyRegistered(email) => {
                format!("User {} is already registered", email)
            }
            EntitlementError::NotFound(what) => format!("Entitlement not found: {}", what),
            EntitlementError::SubscriptionNotFound(id) => {
                format!("No entitlement holds subscription {}", id)
            }
            EntitlementError::Forbidden => "Access to this project is forbidden".to_string(),
            EntitlementError::Timeout(msg) => format!("Timed out: {}", msg),
            EntitlementError::Provider(msg) => format!("Subscription provider error: {}", msg),
            EntitlementError::MailingList(msg) => format!("Mailing list error: {}", msg),
            EntitlementError::ValidationFailed { field, message } => {
                format!("Validation failed for '{}': {}", field, message)
            }
            EntitlementError::Infrastructure(msg) => format!("Error: {}", msg),
        }
    }

    /// Returns true if the caller may retry the same event later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EntitlementError::Timeout(_)
                | EntitlementError::Provider(_)
                | EntitlementError::MailingList(_)
                | EntitlementError::Infrastructure(_)
        )
    }
}

impl std::fmt::Display for EntitlementError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for EntitlementError {}

impl From<DomainError> for EntitlementError {
    fn from(err: DomainError) -> Self {
        let detail = |key: &str| err.details.get(key).cloned();
        match err.code {
            ErrorCode::EntitlementExists => EntitlementError::AlreadyRegistered(
                detail("email").unwrap_or_else(|| err.message.clone()),
            ),
            ErrorCode::EntitlementNotFound => EntitlementError::NotFound(err.message.clone()),
            ErrorCode::SubscriptionNotFound => EntitlementError::SubscriptionNotFound(
                detail("subscription_id").unwrap_or_else(|| err.message.clone()),
            ),
            ErrorCode::Forbidden => EntitlementError::Forbidden,
            ErrorCode::LockTimeout => EntitlementError::Timeout(err.message.clone()),
            ErrorCode::ValidationFailed => EntitlementError::ValidationFailed {
                field: detail("field").unwrap_or_else(|| "unknown".to_string()),
                message: err.message.clone(),
            },
            ErrorCode::DatabaseError | ErrorCode::InternalError => {
                EntitlementError::Infrastructure(err.to_string())
            }
        }
    }
}

impl From<ValidationError> for EntitlementError {
    fn from(err: ValidationError) -> Self {
        let field = match &err {
            ValidationError::EmptyField { field }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::InvalidFormat { field, .. } => field.clone(),
        };
        EntitlementError::ValidationFailed {
            field,
            message: err.to_string(),
        }
    }
}

impl From<EntitlementError> for DomainError {
    fn from(err: EntitlementError) -> Self {
        DomainError::new(err.code(), err.message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn already_registered_maps_to_conflict_code() {
        let err = EntitlementError::already_registered("a@x.com");
        assert_eq!(err.code(), ErrorCode::EntitlementExists);
        assert_eq!(err.to_string(), "User a@x.com is already registered");
    }

    #[test]
    fn store_failures_are_retryable() {
        assert!(EntitlementError::timeout("lock").is_retryable());
        assert!(EntitlementError::infrastructure("conn reset").is_retryable());
        assert!(EntitlementError::provider("502").is_retryable());
    }

    #[test]
    fn conflicts_and_bad_input_are_not_retryable() {
        assert!(!EntitlementError::already_registered("a@x.com").is_retryable());
        assert!(!EntitlementError::validation("email", "empty").is_retryable());
        assert!(!EntitlementError::subscription_not_found("sc_1").is_retryable());
    }

    #[test]
    fn domain_error_with_email_detail_becomes_already_registered() {
        let domain = DomainError::new(ErrorCode::EntitlementExists, "duplicate key")
            .with_detail("email", "a@x.com");
        assert_eq!(
            EntitlementError::from(domain),
            EntitlementError::AlreadyRegistered("a@x.com".to_string())
        );
    }

    #[test]
    fn lock_timeout_becomes_timeout() {
        let domain = DomainError::new(ErrorCode::LockTimeout, "lock wait exceeded");
        assert!(matches!(
            EntitlementError::from(domain),
            EntitlementError::Timeout(_)
        ));
    }

    #[test]
    fn subscription_not_found_keeps_the_id() {
        let domain = DomainError::new(ErrorCode::SubscriptionNotFound, "no rows")
            .with_detail("subscription_id", "sc_9");
        assert_eq!(
            EntitlementError::from(domain),
            EntitlementError::SubscriptionNotFound("sc_9".to_string())
        );
    }

    #[test]
    fn validation_error_keeps_field_name() {
        let err: EntitlementError = ValidationError::empty_field("email").into();
        assert!(matches!(
            err,
            EntitlementError::ValidationFailed { ref field, .. } if field == "email"
        ));
    }

    #[test]
    fn round_trips_code_through_domain_error() {
        let domain: DomainError = EntitlementError::Forbidden.into();
        assert_eq!(domain.code, ErrorCode::Forbidden);
    }
}
