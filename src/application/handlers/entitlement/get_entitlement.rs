//! GetEntitlementHandler - Query handler for a customer's entitlement details.

use std::sync::Arc;

use serde::Serialize;

use crate::domain::entitlement::{Email, Entitlement, EntitlementError, Plan};
use crate::domain::foundation::Timestamp;
use crate::ports::{Clock, EntitlementStore};

use super::check_access::ensure_project;

/// Query for a customer's entitlement.
#[derive(Debug, Clone)]
pub struct GetEntitlementQuery {
    pub email: String,
    pub project_id: String,
}

/// Read model of an entitlement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntitlementView {
    pub email: String,
    pub name: String,
    pub plan: Plan,
    pub plan_name: String,
    pub expires_at: String,
    pub expired: bool,
    pub subscription_id: Option<String>,
    pub subscription_status: Option<String>,
    pub last_paid_amount: f64,
}

impl EntitlementView {
    pub fn from_entitlement(record: &Entitlement, now: Timestamp) -> Self {
        Self {
            email: record.email.as_str().to_string(),
            name: record.name.clone(),
            plan: record.plan,
            plan_name: record.plan.display_name().to_string(),
            expires_at: record.expires_at.to_rfc3339(),
            expired: record.is_expired(now),
            subscription_id: record.subscription_id().map(|id| id.as_str().to_string()),
            subscription_status: record.subscription_status().map(|s| s.as_str().to_string()),
            last_paid_amount: record.last_paid_amount,
        }
    }
}

/// Result of the entitlement query. `None` when the customer is unknown.
#[derive(Debug, Clone)]
pub struct GetEntitlementResult {
    pub entitlement: Option<EntitlementView>,
}

/// Handler for entitlement lookups.
pub struct GetEntitlementHandler {
    store: Arc<dyn EntitlementStore>,
    project_id: String,
    clock: Arc<dyn Clock>,
}

impl GetEntitlementHandler {
    pub fn new(store: Arc<dyn EntitlementStore>, project_id: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            project_id: project_id.into(),
            clock,
        }
    }

    pub async fn handle(&self, query: GetEntitlementQuery) -> Result<GetEntitlementResult, EntitlementError> {
        ensure_project(&self.project_id, &query.project_id)?;
        let email = Email::parse(&query.email)?;

        let now = self.clock.now();
        let entitlement = self
            .store
            .find_by_email(&email)
            .await?
            .map(|record| EntitlementView::from_entitlement(&record, now));

        Ok(GetEntitlementResult { entitlement })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryEntitlementStore;
    use crate::domain::entitlement::{RecurringSchedule, SubscriptionId, SubscriptionStatus, TariffResolver};
    use crate::ports::ManualClock;

    fn handler(store: Arc<InMemoryEntitlementStore>, now: Timestamp) -> GetEntitlementHandler {
        GetEntitlementHandler::new(store, "lumos", Arc::new(ManualClock::new(now)))
    }

    #[tokio::test]
    async fn returns_view_of_stored_record() {
        let now = Timestamp::now();
        let store = Arc::new(InMemoryEntitlementStore::default());
        let mut record = Entitlement::payment_candidate(
            Email::parse("a@x.com").unwrap(),
            "Alice",
            &TariffResolver::resolve("3-month").unwrap(),
            2290.0,
            now,
        );
        record.expires_at = now.add_days(40);
        record.schedule = Some(RecurringSchedule {
            id: SubscriptionId::parse("sc_1").unwrap(),
            status: SubscriptionStatus::Active,
        });
        store.seed(record).unwrap();

        let result = handler(store, now)
            .handle(GetEntitlementQuery {
                email: "a@x.com".to_string(),
                project_id: "lumos".to_string(),
            })
            .await
            .unwrap();

        let view = result.entitlement.unwrap();
        assert_eq!(view.plan, Plan::ThreeMonths);
        assert_eq!(view.plan_name, "3 месяца");
        assert!(!view.expired);
        assert_eq!(view.subscription_id.as_deref(), Some("sc_1"));
        assert_eq!(view.subscription_status.as_deref(), Some("Active"));
        assert_eq!(view.last_paid_amount, 2290.0);
    }

    #[tokio::test]
    async fn unknown_customer_is_none() {
        let store = Arc::new(InMemoryEntitlementStore::default());
        let result = handler(store, Timestamp::now())
            .handle(GetEntitlementQuery {
                email: "nobody@x.com".to_string(),
                project_id: "lumos".to_string(),
            })
            .await
            .unwrap();
        assert!(result.entitlement.is_none());
    }

    #[tokio::test]
    async fn wrong_project_is_forbidden() {
        let store = Arc::new(InMemoryEntitlementStore::default());
        let err = handler(store, Timestamp::now())
            .handle(GetEntitlementQuery {
                email: "a@x.com".to_string(),
                project_id: "nope".to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(err, EntitlementError::Forbidden);
    }
}
