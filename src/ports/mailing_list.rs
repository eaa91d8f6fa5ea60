//! Mailing-list port for marketing automation side effects.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entitlement::Email;

/// Subscribes and unsubscribes addresses on named lists.
#[async_trait]
pub trait MailingList: Send + Sync {
    /// Adds `email` to the list titled `list`.
    async fn subscribe(&self, email: &Email, list: &str) -> Result<(), MailingListError>;

    /// Removes `email` from the list titled `list`.
    async fn unsubscribe(&self, email: &Email, list: &str) -> Result<(), MailingListError>;
}

/// Mailing-list failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MailingListError {
    #[error("mailing list '{0}' not found")]
    ListNotFound(String),

    #[error("mailing list transport error: {0}")]
    Transport(String),

    #[error("mailing list API error: {0}")]
    Api(String),
}

/// Titles of the lists each lifecycle event drives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Campaigns {
    /// Joined at trial signup; its automation fires once the trial has run out.
    pub after_trial_expired: String,
    /// Joined on each renewal charge of an existing schedule.
    pub after_recurring_payment: String,
    /// Joined when the provider reports the schedule cancelled.
    pub after_autopayment_cancelled: String,
}

impl Default for Campaigns {
    fn default() -> Self {
        Self {
            after_trial_expired: "Lumos закончился пробный".to_string(),
            after_recurring_payment: "Lumos после автооплаты".to_string(),
            after_autopayment_cancelled: "Lumos отмена автоплатежа".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mailing_list_is_object_safe() {
        fn _accepts_dyn(_list: &dyn MailingList) {}
    }

    #[test]
    fn list_not_found_names_the_list() {
        let err = MailingListError::ListNotFound("Lumos".to_string());
        assert_eq!(err.to_string(), "mailing list 'Lumos' not found");
    }
}
