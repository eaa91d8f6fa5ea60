//! Integration tests for entitlement reconciliation flows.
//!
//! These tests drive the command/query handlers end to end against the
//! in-memory store and recording adapters:
//! 1. Trial followed by a one-time purchase
//! 2. Concurrent payments for one customer
//! 3. Recurring renewal versus schedule migration
//! 4. Status notifications for superseded schedules

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use futures::future::join_all;

use lumos_access::adapters::cloudpayments::MockSubscriptionProvider;
use lumos_access::adapters::memory::InMemoryEntitlementStore;
use lumos_access::adapters::telegram::RecordingNotifier;
use lumos_access::adapters::unisender::{ListOperation, MockMailingList};
use lumos_access::application::{
    CheckAccessHandler, CheckAccessQuery, RegisterFromOneTimePaymentCommand,
    RegisterFromOneTimePaymentHandler, RegisterFromOneTimePaymentResult,
    RegisterFromRecurringPaymentCommand, RegisterFromRecurringPaymentHandler,
    RegisterFromRecurringPaymentResult, RegisterFromTrialCommand, RegisterFromTrialHandler,
    RegisterRecurringStatusCommand, RegisterRecurringStatusHandler,
    RegisterRecurringStatusResult, ScheduleChange,
};
use lumos_access::domain::entitlement::{
    Email, EntitlementError, Plan, SubscriptionId, SubscriptionStatus,
};
use lumos_access::domain::foundation::Timestamp;
use lumos_access::ports::{Campaigns, EntitlementStore, ManualClock};

// =============================================================================
// Test Infrastructure
// =============================================================================

fn t0() -> Timestamp {
    Timestamp::from_datetime(Utc.with_ymd_and_hms(2026, 1, 10, 9, 0, 0).unwrap())
}

struct Fixture {
    store: Arc<InMemoryEntitlementStore>,
    provider: MockSubscriptionProvider,
    mailing_list: MockMailingList,
    notifier: RecordingNotifier,
    clock: Arc<ManualClock>,
    campaigns: Campaigns,
}

impl Fixture {
    fn new() -> Self {
        Self {
            store: Arc::new(InMemoryEntitlementStore::default()),
            provider: MockSubscriptionProvider::new(),
            mailing_list: MockMailingList::new(),
            notifier: RecordingNotifier::new(),
            clock: Arc::new(ManualClock::new(t0())),
            campaigns: Campaigns::default(),
        }
    }

    fn trial(&self) -> RegisterFromTrialHandler {
        RegisterFromTrialHandler::new(
            self.store.clone(),
            Arc::new(self.mailing_list.clone()),
            Arc::new(self.notifier.clone()),
            self.campaigns.clone(),
            self.clock.clone(),
        )
    }

    fn one_time(&self) -> RegisterFromOneTimePaymentHandler {
        RegisterFromOneTimePaymentHandler::new(
            self.store.clone(),
            Arc::new(self.mailing_list.clone()),
            Arc::new(self.notifier.clone()),
            self.campaigns.clone(),
            self.clock.clone(),
        )
    }

    fn recurring(&self) -> RegisterFromRecurringPaymentHandler {
        RegisterFromRecurringPaymentHandler::new(
            self.store.clone(),
            Arc::new(self.provider.clone()),
            Arc::new(self.mailing_list.clone()),
            Arc::new(self.notifier.clone()),
            self.campaigns.clone(),
            self.clock.clone(),
        )
    }

    fn status(&self) -> RegisterRecurringStatusHandler {
        RegisterRecurringStatusHandler::new(
            self.store.clone(),
            Arc::new(self.mailing_list.clone()),
            Arc::new(self.notifier.clone()),
            self.campaigns.clone(),
        )
    }

    fn access(&self) -> CheckAccessHandler {
        CheckAccessHandler::new(self.store.clone(), "42", self.clock.clone())
    }

    async fn has_access(&self, email: &str) -> bool {
        self.access()
            .handle(CheckAccessQuery {
                email: email.to_string(),
                project_id: "42".to_string(),
            })
            .await
            .unwrap()
            .has_access
    }
}

fn recurring_cmd(email: &str, plan: &str, subscription_id: &str) -> RegisterFromRecurringPaymentCommand {
    RegisterFromRecurringPaymentCommand {
        plan_text: plan.to_string(),
        email: email.to_string(),
        name: "Alice".to_string(),
        amount: 990.0,
        subscription_id: subscription_id.to_string(),
    }
}

fn one_time_cmd(email: &str, plan: &str) -> RegisterFromOneTimePaymentCommand {
    RegisterFromOneTimePaymentCommand {
        plan_text: plan.to_string(),
        email: email.to_string(),
        name: "Alice".to_string(),
        amount: 990.0,
    }
}

// =============================================================================
// Trial then purchase
// =============================================================================

#[tokio::test]
async fn trial_then_one_time_purchase_restarts_from_payment_date() {
    let f = Fixture::new();

    f.trial()
        .handle(RegisterFromTrialCommand {
            email: "Alice@Example.com".to_string(),
            name: "Alice".to_string(),
            duration: Duration::days(14),
        })
        .await
        .unwrap();
    assert!(f.has_access("alice@example.com").await);

    f.clock.set(t0().add_days(2));
    let result = f
        .one_time()
        .handle(one_time_cmd("alice@example.com", "Доступ на месяц"))
        .await
        .unwrap();

    let RegisterFromOneTimePaymentResult::Applied { entitlement } = result else {
        panic!("expected Applied");
    };
    assert_eq!(entitlement.plan, Plan::OneMonth);
    assert_eq!(
        entitlement.expires_at,
        t0().add_days(2).add_calendar_months(1).unwrap()
    );
    assert!(entitlement.schedule.is_none());
    assert_eq!(f.store.len(), 1);

    let trial_list = &f.campaigns.after_trial_expired;
    assert_eq!(f.mailing_list.calls_to(ListOperation::Subscribe, trial_list).len(), 1);
    assert_eq!(f.mailing_list.calls_to(ListOperation::Unsubscribe, trial_list).len(), 1);
}

#[tokio::test]
async fn second_trial_signup_is_rejected_and_reported() {
    let f = Fixture::new();
    let cmd = RegisterFromTrialCommand {
        email: "a@x.com".to_string(),
        name: "A".to_string(),
        duration: Duration::days(14),
    };

    f.trial().handle(cmd.clone()).await.unwrap();
    f.clock.advance(Duration::days(20));
    let err = f.trial().handle(cmd).await.unwrap_err();

    assert!(matches!(err, EntitlementError::AlreadyRegistered(_)));
    assert!(f.notifier.contains("already registered"));
    assert!(!f.has_access("a@x.com").await);
}

#[tokio::test]
async fn early_renewal_extends_live_paid_period() {
    let f = Fixture::new();

    f.one_time()
        .handle(one_time_cmd("a@x.com", "Доступ на 3 месяца"))
        .await
        .unwrap();
    f.clock.set(t0().add_days(30));
    f.one_time()
        .handle(one_time_cmd("a@x.com", "Продление 1 месяц"))
        .await
        .unwrap();

    let record = f
        .store
        .find_by_email(&Email::parse("a@x.com").unwrap())
        .await
        .unwrap()
        .unwrap();
    let expected = t0()
        .add_calendar_months(3)
        .and_then(|t| t.add_calendar_months(1))
        .unwrap();
    assert_eq!(record.plan, Plan::OneMonth);
    assert_eq!(record.expires_at, expected);
}

// =============================================================================
// Concurrency
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_payments_create_one_record_and_apply_every_payment() {
    let f = Fixture::new();
    let handler = Arc::new(f.one_time());

    let tasks = (0..10).map(|_| {
        let handler = handler.clone();
        tokio::spawn(async move {
            handler
                .handle(one_time_cmd("race@x.com", "Доступ на месяц"))
                .await
        })
    });
    for outcome in join_all(tasks).await {
        outcome.unwrap().unwrap();
    }

    assert_eq!(f.store.len(), 1);
    let record = f
        .store
        .find_by_email(&Email::parse("race@x.com").unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.expires_at, t0().add_calendar_months(10).unwrap());
    assert_eq!(f.store.locked_keys(), 0);
}

// =============================================================================
// Recurring schedules
// =============================================================================

#[tokio::test]
async fn renewal_keeps_schedule_and_migration_cancels_the_old_one() {
    let f = Fixture::new();
    let handler = f.recurring();

    let first = handler
        .handle(recurring_cmd("a@x.com", "Доступ на месяц", "sc_1"))
        .await
        .unwrap();
    assert!(matches!(
        first,
        RegisterFromRecurringPaymentResult::Applied { change: ScheduleChange::First, .. }
    ));

    f.clock.set(t0().add_days(31));
    let renewal = handler
        .handle(recurring_cmd("a@x.com", "Продление 1 месяц", "sc_1"))
        .await
        .unwrap();
    assert!(matches!(
        renewal,
        RegisterFromRecurringPaymentResult::Applied { change: ScheduleChange::Renewal, .. }
    ));
    assert!(f.provider.cancelled().is_empty());
    assert_eq!(
        f.mailing_list
            .calls_to(ListOperation::Subscribe, &f.campaigns.after_recurring_payment)
            .len(),
        1
    );

    let migration = handler
        .handle(recurring_cmd("a@x.com", "Доступ на 3 месяца", "sc_2"))
        .await
        .unwrap();
    let RegisterFromRecurringPaymentResult::Applied { entitlement, change } = migration else {
        panic!("expected Applied");
    };
    assert_eq!(
        change,
        ScheduleChange::Migration {
            previous: SubscriptionId::parse("sc_1").unwrap()
        }
    );
    assert_eq!(f.provider.cancelled(), vec![SubscriptionId::parse("sc_1").unwrap()]);
    assert_eq!(entitlement.plan, Plan::ThreeMonths);
    assert_eq!(entitlement.subscription_id().map(|s| s.as_str()), Some("sc_2"));

    let updates = f.provider.updates();
    assert_eq!(updates.len(), 3);
    assert_eq!(updates[2].start_date, entitlement.expires_at);
    assert_eq!(updates[2].period, 3);
}

#[tokio::test]
async fn status_for_superseded_schedule_is_ignored() {
    let f = Fixture::new();
    let handler = f.recurring();
    handler
        .handle(recurring_cmd("a@x.com", "Доступ на месяц", "sc_1"))
        .await
        .unwrap();
    handler
        .handle(recurring_cmd("a@x.com", "Доступ на месяц", "sc_2"))
        .await
        .unwrap();

    let stale = f
        .status()
        .handle(RegisterRecurringStatusCommand {
            subscription_id: "sc_1".to_string(),
            email: "a@x.com".to_string(),
            status: "Cancelled".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(stale, RegisterRecurringStatusResult::UnknownSubscription);

    let record = f
        .store
        .find_by_email(&Email::parse("a@x.com").unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.subscription_status(), Some(&SubscriptionStatus::Active));
    assert!(f.has_access("a@x.com").await);
}

#[tokio::test]
async fn cancellation_keeps_access_until_expiry() {
    let f = Fixture::new();
    f.recurring()
        .handle(recurring_cmd("a@x.com", "Доступ на месяц", "sc_1"))
        .await
        .unwrap();

    let result = f
        .status()
        .handle(RegisterRecurringStatusCommand {
            subscription_id: "sc_1".to_string(),
            email: "a@x.com".to_string(),
            status: "Cancelled".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(
        result,
        RegisterRecurringStatusResult::Updated {
            status: SubscriptionStatus::Cancelled
        }
    );
    assert!(f.has_access("a@x.com").await);
    assert_eq!(
        f.mailing_list
            .calls_to(ListOperation::Subscribe, &f.campaigns.after_autopayment_cancelled)
            .len(),
        1
    );

    f.clock.set(t0().add_calendar_months(1).unwrap().add_days(1));
    assert!(!f.has_access("a@x.com").await);
}

#[tokio::test]
async fn one_time_payment_detaches_recurring_schedule() {
    let f = Fixture::new();
    f.recurring()
        .handle(recurring_cmd("a@x.com", "Доступ на месяц", "sc_1"))
        .await
        .unwrap();

    f.one_time()
        .handle(one_time_cmd("a@x.com", "Доступ на 6 месяцев"))
        .await
        .unwrap();

    let record = f
        .store
        .find_by_email(&Email::parse("a@x.com").unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.plan, Plan::SixMonths);
    assert!(record.schedule.is_none());
}

#[tokio::test]
async fn payment_survives_status_update_committed_after_it() {
    let f = Fixture::new();
    f.recurring()
        .handle(recurring_cmd("a@x.com", "Доступ на месяц", "sc_1"))
        .await
        .unwrap();
    let email = Email::parse("a@x.com").unwrap();

    let mut status_tx = f.store.begin().await.unwrap();
    status_tx
        .set_subscription_status(
            &SubscriptionId::parse("sc_1").unwrap(),
            &SubscriptionStatus::PastDue,
        )
        .await
        .unwrap();

    f.one_time()
        .handle(one_time_cmd("a@x.com", "Доступ на 6 месяцев"))
        .await
        .unwrap();
    let paid = f.store.find_by_email(&email).await.unwrap().unwrap();

    status_tx.commit().await.unwrap();

    let record = f.store.find_by_email(&email).await.unwrap().unwrap();
    assert_eq!(record.plan, Plan::SixMonths);
    assert_eq!(record.expires_at, paid.expires_at);
    assert!(record.schedule.is_none());
}
