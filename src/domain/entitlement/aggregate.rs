//! Entitlement aggregate entity.
//!
//! One record per customer, keyed by normalized email. Validity is never
//! stored: it is derived from `plan` and `expires_at` at the moment of asking.
//!
//! # Design Decisions
//!
//! - **Schedule as one value**: subscription id and status live in a single
//!   `Option<RecurringSchedule>` so they can only change together with the plan
//! - **Trials carry no schedule**: every path that sets `Plan::Trial` clears it
//! - **Amount is informational**: `last_paid_amount` never drives a decision

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{EntitlementId, Timestamp};

use super::{Email, EntitlementError, Plan, SubscriptionId, SubscriptionStatus, Tariff};

/// Offset applied to a fresh payment candidate so that extension starts from "now".
const CANDIDATE_BACKDATE_SECS: i64 = 60;

/// The provider schedule currently associated with an entitlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurringSchedule {
    pub id: SubscriptionId,
    pub status: SubscriptionStatus,
}

/// Entitlement aggregate - a customer's right to use the product.
///
/// # Invariants
///
/// - `email` is unique across records
/// - `plan == Trial` implies `schedule.is_none()`
/// - `id` never changes after creation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entitlement {
    pub id: EntitlementId,
    pub email: Email,
    /// Display name, last writer wins.
    pub name: String,
    pub plan: Plan,
    pub expires_at: Timestamp,
    pub schedule: Option<RecurringSchedule>,
    pub last_paid_amount: f64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Entitlement {
    /// Creates a trial entitlement valid for `duration` from `now`.
    pub fn trial(email: Email, name: impl Into<String>, duration: Duration, now: Timestamp) -> Self {
        Self {
            id: EntitlementId::new(),
            email,
            name: name.into(),
            plan: Plan::Trial,
            expires_at: now.plus(duration),
            schedule: None,
            last_paid_amount: 0.0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Creates the candidate inserted by find-or-create on a first payment.
    ///
    /// The expiry is set slightly in the past so a brand-new customer is
    /// extended from `now` rather than from a future date.
    pub fn payment_candidate(
        email: Email,
        name: impl Into<String>,
        tariff: &Tariff,
        amount: f64,
        now: Timestamp,
    ) -> Self {
        Self {
            id: EntitlementId::new(),
            email,
            name: name.into(),
            plan: tariff.plan,
            expires_at: now.minus(Duration::seconds(CANDIDATE_BACKDATE_SECS)),
            schedule: None,
            last_paid_amount: amount,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns true if the entitlement no longer grants access at `now`.
    ///
    /// Unlimited plans never expire.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        !self.plan.is_unlimited() && now.is_after(&self.expires_at)
    }

    /// Computes the expiry after paying for `tariff` at `now`.
    ///
    /// A live paid entitlement is extended from its current expiry, so paying
    /// early never shortens access. Lapsed entitlements and trials restart
    /// from `now`, so remaining trial days are not carried into a paid period.
    ///
    /// # Errors
    ///
    /// Returns `ValidationFailed` if the result is outside the representable range.
    pub fn next_expiry(&self, tariff: &Tariff, now: Timestamp) -> Result<Timestamp, EntitlementError> {
        let base = if self.plan == Plan::Trial || self.is_expired(now) {
            now
        } else {
            self.expires_at.max(now)
        };
        base.add_calendar_months(tariff.interval_months)
            .ok_or_else(|| EntitlementError::validation("expires_at", "expiry out of range"))
    }

    /// Records a one-time purchase. Any recurring schedule is detached.
    pub fn apply_one_time_payment(
        &mut self,
        tariff: &Tariff,
        amount: f64,
        expires_at: Timestamp,
        now: Timestamp,
    ) {
        self.plan = tariff.plan;
        self.expires_at = expires_at;
        self.schedule = None;
        self.last_paid_amount = amount;
        self.updated_at = now;
    }

    /// Records a recurring charge confirmed by the provider.
    ///
    /// Returns the schedule id that was associated before this call.
    pub fn apply_recurring_payment(
        &mut self,
        tariff: &Tariff,
        amount: f64,
        expires_at: Timestamp,
        schedule: RecurringSchedule,
        now: Timestamp,
    ) -> Option<SubscriptionId> {
        let previous = self.schedule.take().map(|s| s.id);
        self.plan = tariff.plan;
        self.expires_at = expires_at;
        self.schedule = Some(schedule);
        self.last_paid_amount = amount;
        self.updated_at = now;
        previous
    }

    /// Updates the display name when the provider sent a non-blank one.
    pub fn rename(&mut self, name: &str) {
        let trimmed = name.trim();
        if !trimmed.is_empty() {
            self.name = trimmed.to_string();
        }
    }

    pub fn subscription_id(&self) -> Option<&SubscriptionId> {
        self.schedule.as_ref().map(|s| &s.id)
    }

    pub fn subscription_status(&self) -> Option<&SubscriptionStatus> {
        self.schedule.as_ref().map(|s| &s.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn at(y: i32, m: u32, d: u32) -> Timestamp {
        Timestamp::from_datetime(Utc.with_ymd_and_hms(y, m, d, 9, 30, 0).unwrap())
    }

    fn email() -> Email {
        Email::parse("a@x.com").unwrap()
    }

    fn one_month() -> Tariff {
        Tariff {
            plan: Plan::OneMonth,
            interval_months: 1,
        }
    }

    fn three_months() -> Tariff {
        Tariff {
            plan: Plan::ThreeMonths,
            interval_months: 3,
        }
    }

    fn paid(expires_at: Timestamp) -> Entitlement {
        let mut e = Entitlement::payment_candidate(email(), "A", &one_month(), 999.0, at(2024, 1, 1));
        e.expires_at = expires_at;
        e
    }

    // ════════════════════════════════════════════════════════════════
    // Construction
    // ════════════════════════════════════════════════════════════════

    #[test]
    fn trial_expires_after_duration() {
        let now = at(2024, 1, 1);
        let e = Entitlement::trial(email(), "Alice", Duration::days(14), now);

        assert_eq!(e.plan, Plan::Trial);
        assert_eq!(e.expires_at, at(2024, 1, 15));
        assert!(e.schedule.is_none());
    }

    #[test]
    fn payment_candidate_is_already_expired() {
        let now = at(2024, 1, 1);
        let e = Entitlement::payment_candidate(email(), "A", &one_month(), 999.0, now);
        assert!(e.is_expired(now));
    }

    // ════════════════════════════════════════════════════════════════
    // Validity
    // ════════════════════════════════════════════════════════════════

    #[test]
    fn valid_until_expiry() {
        let e = paid(at(2024, 2, 1));
        assert!(!e.is_expired(at(2024, 1, 31)));
        assert!(!e.is_expired(at(2024, 2, 1)));
        assert!(e.is_expired(at(2024, 2, 2)));
    }

    #[test]
    fn unlimited_never_expires() {
        let mut e = paid(at(2000, 1, 1));
        e.plan = Plan::Unlimited;
        assert!(!e.is_expired(at(2099, 1, 1)));
    }

    // ════════════════════════════════════════════════════════════════
    // Extension rule
    // ════════════════════════════════════════════════════════════════

    #[test]
    fn live_entitlement_extends_from_current_expiry() {
        let e = paid(at(2024, 3, 10));
        let next = e.next_expiry(&three_months(), at(2024, 3, 1)).unwrap();
        assert_eq!(next, at(2024, 6, 10));
    }

    #[test]
    fn lapsed_entitlement_extends_from_now() {
        let e = paid(at(2024, 1, 5));
        let next = e.next_expiry(&one_month(), at(2024, 2, 20)).unwrap();
        assert_eq!(next, at(2024, 3, 20));
    }

    #[test]
    fn trial_days_are_not_carried_over() {
        let e = Entitlement::trial(email(), "A", Duration::days(14), at(2024, 1, 1));
        let next = e.next_expiry(&one_month(), at(2024, 1, 3)).unwrap();
        assert_eq!(next, at(2024, 2, 3));
    }

    #[test]
    fn unlimited_extends_from_the_later_of_now_and_expiry() {
        let mut e = paid(at(2020, 1, 1));
        e.plan = Plan::Unlimited;
        let next = e.next_expiry(&one_month(), at(2024, 1, 1)).unwrap();
        assert_eq!(next, at(2024, 2, 1));
    }

    // ════════════════════════════════════════════════════════════════
    // Mutations
    // ════════════════════════════════════════════════════════════════

    #[test]
    fn one_time_payment_detaches_schedule() {
        let mut e = paid(at(2024, 2, 1));
        e.schedule = Some(RecurringSchedule {
            id: SubscriptionId::parse("sc_1").unwrap(),
            status: SubscriptionStatus::Active,
        });

        e.apply_one_time_payment(&three_months(), 2490.0, at(2024, 5, 1), at(2024, 1, 20));

        assert_eq!(e.plan, Plan::ThreeMonths);
        assert_eq!(e.expires_at, at(2024, 5, 1));
        assert!(e.schedule.is_none());
        assert_eq!(e.last_paid_amount, 2490.0);
    }

    #[test]
    fn recurring_payment_returns_previous_schedule_id() {
        let mut e = paid(at(2024, 2, 1));
        e.schedule = Some(RecurringSchedule {
            id: SubscriptionId::parse("sc_old").unwrap(),
            status: SubscriptionStatus::Active,
        });

        let previous = e.apply_recurring_payment(
            &one_month(),
            999.0,
            at(2024, 3, 1),
            RecurringSchedule {
                id: SubscriptionId::parse("sc_new").unwrap(),
                status: SubscriptionStatus::Active,
            },
            at(2024, 1, 25),
        );

        assert_eq!(previous.map(|id| id.as_str().to_string()), Some("sc_old".to_string()));
        assert_eq!(e.subscription_id().map(|id| id.as_str()), Some("sc_new"));
    }

    #[test]
    fn blank_name_does_not_overwrite() {
        let mut e = paid(at(2024, 2, 1));
        e.rename("  ");
        assert_eq!(e.name, "A");
        e.rename(" Bob ");
        assert_eq!(e.name, "Bob");
    }
}

#[cfg(test)]
mod proptests {
    use proptest::prelude::*;

    use super::*;
    use chrono::{TimeZone, Utc};

    fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
        // 2020-01-01 .. 2030-01-01
        (1_577_836_800i64..1_893_456_000i64)
            .prop_map(|secs| Timestamp::from_datetime(Utc.timestamp_opt(secs, 0).unwrap()))
    }

    fn arb_tariff() -> impl Strategy<Value = Tariff> {
        prop_oneof![
            Just(Tariff { plan: Plan::OneMonth, interval_months: 1 }),
            Just(Tariff { plan: Plan::ThreeMonths, interval_months: 3 }),
            Just(Tariff { plan: Plan::SixMonths, interval_months: 6 }),
        ]
    }

    fn record(plan: Plan, expires_at: Timestamp) -> Entitlement {
        let email = Email::parse("p@x.com").unwrap();
        let tariff = Tariff { plan: Plan::OneMonth, interval_months: 1 };
        let mut e = Entitlement::payment_candidate(email, "P", &tariff, 0.0, expires_at);
        e.plan = plan;
        e.expires_at = expires_at;
        e
    }

    proptest! {
        #[test]
        fn paying_never_shortens_access(
            now in arb_timestamp(),
            expires in arb_timestamp(),
            tariff in arb_tariff(),
        ) {
            let e = record(Plan::OneMonth, expires);
            let next = e.next_expiry(&tariff, now).unwrap();
            prop_assert!(next > now);
            prop_assert!(next >= expires);
        }

        #[test]
        fn live_paid_record_extends_exactly_by_calendar_interval(
            now in arb_timestamp(),
            ahead_days in 0i64..400,
            tariff in arb_tariff(),
        ) {
            let expires = now.add_days(ahead_days);
            let e = record(Plan::SixMonths, expires);
            let next = e.next_expiry(&tariff, now).unwrap();
            prop_assert_eq!(Some(next), expires.add_calendar_months(tariff.interval_months));
        }

        #[test]
        fn lapsed_record_extends_exactly_from_now(
            now in arb_timestamp(),
            behind_days in 1i64..400,
            tariff in arb_tariff(),
        ) {
            let e = record(Plan::ThreeMonths, now.add_days(-behind_days));
            let next = e.next_expiry(&tariff, now).unwrap();
            prop_assert_eq!(Some(next), now.add_calendar_months(tariff.interval_months));
        }

        #[test]
        fn calendar_interval_stays_within_month_bounds(
            now in arb_timestamp(),
            tariff in arb_tariff(),
        ) {
            let e = record(Plan::OneMonth, now.add_days(-1));
            let next = e.next_expiry(&tariff, now).unwrap();
            let days = next.duration_since(&now).num_days();
            let months = i64::from(tariff.interval_months);
            prop_assert!(days >= 28 * months - 3);
            prop_assert!(days <= 31 * months);
        }
    }
}
