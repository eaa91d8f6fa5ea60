//! RegisterRecurringStatusHandler - Command handler for provider status notifications.

use std::sync::Arc;

use crate::domain::entitlement::{Email, EntitlementError, SubscriptionId, SubscriptionStatus};
use crate::ports::{AdminNotifier, Campaigns, EntitlementStore, MailingList};

/// Command carrying a schedule status reported by the provider.
#[derive(Debug, Clone)]
pub struct RegisterRecurringStatusCommand {
    pub subscription_id: String,
    /// Payer email, used only for the cancellation mail.
    pub email: String,
    pub status: String,
}

/// Outcome of a status notification. Every variant is a success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterRecurringStatusResult {
    Updated { status: SubscriptionStatus },
    /// No record holds this schedule, typically because a migration superseded it.
    UnknownSubscription,
    MissingSubscriptionId,
    /// The notification carried no status; nothing changed.
    MissingStatus,
}

/// Handler for recurring status notifications.
pub struct RegisterRecurringStatusHandler {
    store: Arc<dyn EntitlementStore>,
    mailing_list: Arc<dyn MailingList>,
    notifier: Arc<dyn AdminNotifier>,
    campaigns: Campaigns,
}

impl RegisterRecurringStatusHandler {
    pub fn new(
        store: Arc<dyn EntitlementStore>,
        mailing_list: Arc<dyn MailingList>,
        notifier: Arc<dyn AdminNotifier>,
        campaigns: Campaigns,
    ) -> Self {
        Self {
            store,
            mailing_list,
            notifier,
            campaigns,
        }
    }

    pub async fn handle(
        &self,
        cmd: RegisterRecurringStatusCommand,
    ) -> Result<RegisterRecurringStatusResult, EntitlementError> {
        let email = cmd.email.trim().to_lowercase();

        let Ok(subscription_id) = SubscriptionId::parse(&cmd.subscription_id) else {
            tracing::warn!(email = %email, "Status notification without subscription id");
            self.notifier
                .notify(&format!(
                    "Status notification for {} skipped: subscription id is empty",
                    email
                ))
                .await;
            return Ok(RegisterRecurringStatusResult::MissingSubscriptionId);
        };

        if cmd.status.trim().is_empty() {
            tracing::warn!(email = %email, subscription_id = %subscription_id, "Status notification without status");
            self.notifier
                .notify(&format!(
                    "Status notification for {} skipped: status is empty",
                    email
                ))
                .await;
            return Ok(RegisterRecurringStatusResult::MissingStatus);
        }

        let status = SubscriptionStatus::from_provider(&cmd.status);

        if status.is_cancelled() {
            self.schedule_cancellation_mail(&email).await;
        }

        match self.apply(&subscription_id, &status).await {
            Ok(()) => {
                tracing::info!(
                    subscription_id = %subscription_id,
                    status = %status,
                    "Subscription status updated"
                );
                self.notifier
                    .notify(&format!(
                        "Subscription {} of {} is now {}",
                        subscription_id, email, status
                    ))
                    .await;
                Ok(RegisterRecurringStatusResult::Updated { status })
            }
            Err(EntitlementError::SubscriptionNotFound(_)) => {
                tracing::info!(
                    subscription_id = %subscription_id,
                    status = %status,
                    "Status notification for unknown subscription ignored"
                );
                self.notifier
                    .notify(&format!(
                        "Status {} for unknown subscription {} ({}) ignored",
                        status, subscription_id, email
                    ))
                    .await;
                Ok(RegisterRecurringStatusResult::UnknownSubscription)
            }
            Err(err) => {
                tracing::error!(
                    subscription_id = %subscription_id,
                    error = %err,
                    "Status notification failed"
                );
                self.notifier
                    .notify(&format!(
                        "Status notification for subscription {} failed: {}",
                        subscription_id, err
                    ))
                    .await;
                Err(err)
            }
        }
    }

    async fn apply(
        &self,
        subscription_id: &SubscriptionId,
        status: &SubscriptionStatus,
    ) -> Result<(), EntitlementError> {
        let mut tx = self.store.begin().await?;
        tx.set_subscription_status(subscription_id, status).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn schedule_cancellation_mail(&self, raw_email: &str) {
        let email = match Email::parse(raw_email) {
            Ok(email) => email,
            Err(err) => {
                tracing::warn!(error = %err, "Cancellation mail skipped: invalid email");
                return;
            }
        };
        if let Err(err) = self
            .mailing_list
            .subscribe(&email, &self.campaigns.after_autopayment_cancelled)
            .await
        {
            tracing::warn!(email = %email, error = %err, "Failed to schedule cancellation mail");
            self.notifier
                .notify(&format!(
                    "Could not schedule cancellation mail for {}: {}",
                    email, err
                ))
                .await;
        }
    }
}
