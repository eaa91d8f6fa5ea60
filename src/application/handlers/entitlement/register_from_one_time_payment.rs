//! RegisterFromOneTimePaymentHandler - Command handler for one-off purchases.

use std::sync::Arc;

use crate::domain::entitlement::{Email, Entitlement, EntitlementError, Tariff, TariffResolver};
use crate::ports::{AdminNotifier, Campaigns, Clock, EntitlementStore, MailingList};

/// Command to record a one-time purchase.
#[derive(Debug, Clone)]
pub struct RegisterFromOneTimePaymentCommand {
    /// Free-text plan name as sent by the payment form.
    pub plan_text: String,
    pub email: String,
    pub name: String,
    pub amount: f64,
}

/// Outcome of a one-time payment.
#[derive(Debug, Clone)]
pub enum RegisterFromOneTimePaymentResult {
    /// The entitlement was extended.
    Applied { entitlement: Entitlement },
    /// The plan text matched no tariff; nothing changed.
    UnknownPlan { plan_text: String },
}

/// Handler for one-time payments.
pub struct RegisterFromOneTimePaymentHandler {
    store: Arc<dyn EntitlementStore>,
    mailing_list: Arc<dyn MailingList>,
    notifier: Arc<dyn AdminNotifier>,
    campaigns: Campaigns,
    clock: Arc<dyn Clock>,
}

impl RegisterFromOneTimePaymentHandler {
    pub fn new(
        store: Arc<dyn EntitlementStore>,
        mailing_list: Arc<dyn MailingList>,
        notifier: Arc<dyn AdminNotifier>,
        campaigns: Campaigns,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            mailing_list,
            notifier,
            campaigns,
            clock,
        }
    }

    pub async fn handle(
        &self,
        cmd: RegisterFromOneTimePaymentCommand,
    ) -> Result<RegisterFromOneTimePaymentResult, EntitlementError> {
        let email = Email::parse(&cmd.email)?;

        let Some(tariff) = TariffResolver::resolve(&cmd.plan_text) else {
            tracing::warn!(email = %email, plan_text = %cmd.plan_text, "Unknown plan in one-time payment");
            self.notifier
                .notify(&format!(
                    "One-time payment from {} skipped: unknown plan '{}'",
                    email,
                    cmd.plan_text.trim()
                ))
                .await;
            return Ok(RegisterFromOneTimePaymentResult::UnknownPlan {
                plan_text: cmd.plan_text,
            });
        };

        let entitlement = match self.apply(&email, &tariff, &cmd).await {
            Ok(entitlement) => entitlement,
            Err(err) => {
                tracing::error!(email = %email, error = %err, "One-time payment failed");
                self.notifier
                    .notify(&format!("One-time payment from {} failed: {}", email, err))
                    .await;
                return Err(err);
            }
        };

        self.cancel_trial_follow_up(&email).await;

        tracing::info!(
            email = %email,
            plan = %entitlement.plan,
            expires_at = %entitlement.expires_at,
            "One-time payment applied"
        );
        self.notifier
            .notify(&format!(
                "Payment accepted: {}, plan {}, expires at {}",
                email,
                entitlement.plan,
                entitlement.expires_at.to_rfc3339()
            ))
            .await;

        Ok(RegisterFromOneTimePaymentResult::Applied { entitlement })
    }

    async fn apply(
        &self,
        email: &Email,
        tariff: &Tariff,
        cmd: &RegisterFromOneTimePaymentCommand,
    ) -> Result<Entitlement, EntitlementError> {
        let now = self.clock.now();
        let mut tx = self.store.begin().await?;

        let candidate =
            Entitlement::payment_candidate(email.clone(), cmd.name.trim(), tariff, cmd.amount, now);
        let mut record = tx.find_or_create(&candidate).await?;

        let expires_at = record.next_expiry(tariff, now)?;
        record.rename(&cmd.name);
        record.apply_one_time_payment(tariff, cmd.amount, expires_at, now);

        tx.replace_entitlement(&record).await?;
        tx.commit().await?;
        Ok(record)
    }

    /// Removes the customer from the trial follow-up list. Failures are reported, never raised.
    async fn cancel_trial_follow_up(&self, email: &Email) {
        if let Err(err) = self
            .mailing_list
            .unsubscribe(email, &self.campaigns.after_trial_expired)
            .await
        {
            tracing::warn!(email = %email, error = %err, "Failed to cancel trial follow-up");
            self.notifier
                .notify(&format!("Could not cancel trial follow-up for {}: {}", email, err))
                .await;
        }
    }
}
