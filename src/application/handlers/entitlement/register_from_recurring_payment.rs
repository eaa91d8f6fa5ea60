//! RegisterFromRecurringPaymentHandler - Command handler for recurring charges.
//!
//! # Ordering
//!
//! 1. Lock the customer (find-or-create inside a transaction)
//! 2. Compute the new expiry
//! 3. Move the provider schedule to that expiry
//! 4. Write and commit the local record
//! 5. Drop the customer from the trial follow-up list
//! 6. Reconcile the previous schedule (cancel it, or send the renewal mail)
//!
//! The local record never names a schedule the provider has not confirmed:
//! a failed provider update drops the transaction before any write.

use std::sync::Arc;

use crate::domain::entitlement::{
    Email, Entitlement, EntitlementError, RecurringSchedule, SubscriptionId, Tariff,
    TariffResolver,
};
use crate::ports::{
    AdminNotifier, Campaigns, Clock, EntitlementStore, MailingList, ScheduleUpdate,
    SubscriptionProvider,
};

/// Command to record a recurring charge.
#[derive(Debug, Clone)]
pub struct RegisterFromRecurringPaymentCommand {
    pub plan_text: String,
    pub email: String,
    pub name: String,
    pub amount: f64,
    pub subscription_id: String,
}

/// How the charged schedule relates to the one stored before.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleChange {
    /// No schedule was stored; this is the customer's first recurring charge.
    First,
    /// Same schedule charged again.
    Renewal,
    /// A different schedule replaced the stored one, which was then cancelled.
    Migration { previous: SubscriptionId },
}

/// Outcome of a recurring payment.
#[derive(Debug, Clone)]
pub enum RegisterFromRecurringPaymentResult {
    Applied {
        entitlement: Entitlement,
        change: ScheduleChange,
    },
    /// The plan text matched no tariff; nothing changed.
    UnknownPlan { plan_text: String },
    /// The notification named no schedule; nothing changed.
    MissingSubscriptionId,
}

/// Handler for recurring payments.
pub struct RegisterFromRecurringPaymentHandler {
    store: Arc<dyn EntitlementStore>,
    provider: Arc<dyn SubscriptionProvider>,
    mailing_list: Arc<dyn MailingList>,
    notifier: Arc<dyn AdminNotifier>,
    campaigns: Campaigns,
    clock: Arc<dyn Clock>,
}

impl RegisterFromRecurringPaymentHandler {
    pub fn new(
        store: Arc<dyn EntitlementStore>,
        provider: Arc<dyn SubscriptionProvider>,
        mailing_list: Arc<dyn MailingList>,
        notifier: Arc<dyn AdminNotifier>,
        campaigns: Campaigns,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            provider,
            mailing_list,
            notifier,
            campaigns,
            clock,
        }
    }

    pub async fn handle(
        &self,
        cmd: RegisterFromRecurringPaymentCommand,
    ) -> Result<RegisterFromRecurringPaymentResult, EntitlementError> {
        let email = Email::parse(&cmd.email)?;

        let Some(tariff) = TariffResolver::resolve(&cmd.plan_text) else {
            tracing::warn!(email = %email, plan_text = %cmd.plan_text, "Unknown plan in recurring payment");
            self.notifier
                .notify(&format!(
                    "Recurring payment from {} skipped: unknown plan '{}'",
                    email,
                    cmd.plan_text.trim()
                ))
                .await;
            return Ok(RegisterFromRecurringPaymentResult::UnknownPlan {
                plan_text: cmd.plan_text,
            });
        };

        let Ok(subscription_id) = SubscriptionId::parse(&cmd.subscription_id) else {
            tracing::warn!(email = %email, "Recurring payment without subscription id");
            self.notifier
                .notify(&format!(
                    "Recurring payment from {} skipped: subscription id is empty",
                    email
                ))
                .await;
            return Ok(RegisterFromRecurringPaymentResult::MissingSubscriptionId);
        };

        let (entitlement, previous) = match self.apply(&email, &tariff, &subscription_id, &cmd).await {
            Ok(applied) => applied,
            Err(err) => {
                tracing::error!(
                    email = %email,
                    subscription_id = %subscription_id,
                    error = %err,
                    "Recurring payment failed"
                );
                self.notifier
                    .notify(&format!("Recurring payment from {} failed: {}", email, err))
                    .await;
                return Err(err);
            }
        };

        self.cancel_trial_follow_up(&email).await;

        let change = self.reconcile(&email, &subscription_id, previous).await;

        tracing::info!(
            email = %email,
            plan = %entitlement.plan,
            subscription_id = %subscription_id,
            expires_at = %entitlement.expires_at,
            change = ?change,
            "Recurring payment applied"
        );
        self.notifier
            .notify(&format!(
                "Payment accepted: {}, plan {}, expires at {}",
                email,
                entitlement.plan,
                entitlement.expires_at.to_rfc3339()
            ))
            .await;

        Ok(RegisterFromRecurringPaymentResult::Applied {
            entitlement,
            change,
        })
    }

    /// Runs the locked part. Returns the committed record and the schedule id
    /// it held before.
    async fn apply(
        &self,
        email: &Email,
        tariff: &Tariff,
        subscription_id: &SubscriptionId,
        cmd: &RegisterFromRecurringPaymentCommand,
    ) -> Result<(Entitlement, Option<SubscriptionId>), EntitlementError> {
        let now = self.clock.now();
        let mut tx = self.store.begin().await?;

        let candidate =
            Entitlement::payment_candidate(email.clone(), cmd.name.trim(), tariff, cmd.amount, now);
        let mut record = tx.find_or_create(&candidate).await?;

        let expires_at = record.next_expiry(tariff, now)?;

        let update = ScheduleUpdate::monthly(subscription_id.clone(), expires_at, tariff.interval_months);
        let status = self
            .provider
            .update_schedule(&update)
            .await
            .map_err(|e| EntitlementError::provider(e.to_string()))?;

        record.rename(&cmd.name);
        let previous = record.apply_recurring_payment(
            tariff,
            cmd.amount,
            expires_at,
            RecurringSchedule {
                id: subscription_id.clone(),
                status,
            },
            now,
        );

        tx.replace_entitlement(&record).await?;
        tx.commit().await?;
        Ok((record, previous))
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

    /// Post-commit follow-up on the previous schedule. Never fails.
    async fn reconcile(
        &self,
        email: &Email,
        current: &SubscriptionId,
        previous: Option<SubscriptionId>,
    ) -> ScheduleChange {
        match previous {
            None => ScheduleChange::First,
            Some(previous) if previous == *current => {
                if let Err(err) = self
                    .mailing_list
                    .subscribe(email, &self.campaigns.after_recurring_payment)
                    .await
                {
                    tracing::warn!(email = %email, error = %err, "Failed to schedule renewal mail");
                    self.notifier
                        .notify(&format!("Could not schedule renewal mail for {}: {}", email, err))
                        .await;
                }
                ScheduleChange::Renewal
            }
            Some(previous) => {
                if let Err(err) = self.provider.cancel_schedule(&previous).await {
                    tracing::warn!(
                        email = %email,
                        subscription_id = %previous,
                        error = %err,
                        "Failed to cancel superseded schedule"
                    );
                    self.notifier
                        .notify(&format!(
                            "Could not cancel superseded subscription {} for {}: {}",
                            previous, email, err
                        ))
                        .await;
                }
                ScheduleChange::Migration { previous }
            }
        }
    }
}
