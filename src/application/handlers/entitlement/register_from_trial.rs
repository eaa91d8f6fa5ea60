//! RegisterFromTrialHandler - Command handler for trial signups.

use std::sync::Arc;

use chrono::Duration;

use crate::domain::entitlement::{Email, Entitlement, EntitlementError};
use crate::ports::{AdminNotifier, Campaigns, Clock, EntitlementStore, MailingList};

/// Command to start a trial for a new customer.
#[derive(Debug, Clone)]
pub struct RegisterFromTrialCommand {
    pub email: String,
    pub name: String,
    pub duration: Duration,
}

/// Result of a successful trial signup.
#[derive(Debug, Clone)]
pub struct RegisterFromTrialResult {
    pub entitlement: Entitlement,
}

/// Handler for trial signups.
///
/// The record is committed before the mailing-list call. A mailing-list
/// failure still fails the command even though the record now exists.
pub struct RegisterFromTrialHandler {
    store: Arc<dyn EntitlementStore>,
    mailing_list: Arc<dyn MailingList>,
    notifier: Arc<dyn AdminNotifier>,
    campaigns: Campaigns,
    clock: Arc<dyn Clock>,
}

impl RegisterFromTrialHandler {
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
        cmd: RegisterFromTrialCommand,
    ) -> Result<RegisterFromTrialResult, EntitlementError> {
        let email = Email::parse(&cmd.email)?;
        if cmd.duration <= Duration::zero() {
            return Err(EntitlementError::validation(
                "duration",
                "trial duration must be positive",
            ));
        }

        let entitlement = match self.create(&email, &cmd).await {
            Ok(entitlement) => entitlement,
            Err(EntitlementError::AlreadyRegistered(_)) => {
                tracing::info!(email = %email, "Trial signup for existing customer skipped");
                self.notifier
                    .notify(&format!(
                        "Trial signup skipped: {} is already registered",
                        email
                    ))
                    .await;
                return Err(EntitlementError::already_registered(email.as_str()));
            }
            Err(err) => {
                tracing::error!(email = %email, error = %err, "Trial signup failed");
                self.notifier
                    .notify(&format!("Trial signup failed for {}: {}", email, err))
                    .await;
                return Err(err);
            }
        };

        if let Err(err) = self
            .mailing_list
            .subscribe(&email, &self.campaigns.after_trial_expired)
            .await
        {
            tracing::error!(email = %email, error = %err, "Failed to schedule trial follow-up");
            self.notifier
                .notify(&format!(
                    "Trial registered for {} but the follow-up list failed: {}",
                    email, err
                ))
                .await;
            return Err(EntitlementError::mailing_list(err.to_string()));
        }

        tracing::info!(
            email = %email,
            expires_at = %entitlement.expires_at,
            "Trial registered"
        );
        self.notifier
            .notify(&format!(
                "Trial registered: {}, duration {} days",
                email,
                cmd.duration.num_days()
            ))
            .await;

        Ok(RegisterFromTrialResult { entitlement })
    }

    async fn create(
        &self,
        email: &Email,
        cmd: &RegisterFromTrialCommand,
    ) -> Result<Entitlement, EntitlementError> {
        let mut tx = self.store.begin().await?;

        if tx.find_by_email(email).await?.is_some() {
            return Err(EntitlementError::already_registered(email.as_str()));
        }

        let record = Entitlement::trial(
            email.clone(),
            cmd.name.trim(),
            cmd.duration,
            self.clock.now(),
        );
        // A concurrent signup that won the insert surfaces as AlreadyRegistered.
        let created = tx.create(&record).await?;
        tx.commit().await?;
        Ok(created)
    }
}
