//! Mock subscription provider for testing.
//!
//! Records every call and returns configurable results. Supports:
//! - A configurable status for `update_schedule`
//! - Error injection per method
//! - Call tracking for assertions

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::domain::entitlement::{SubscriptionId, SubscriptionStatus};
use crate::ports::{ScheduleUpdate, SubscriptionProvider, SubscriptionProviderError};

/// Mock subscription provider.
///
/// # Example
///
/// ```ignore
/// let provider = MockSubscriptionProvider::new();
/// provider.fail_updates(SubscriptionProviderError::rejected("no such schedule"));
///
/// // ... run the handler ...
///
/// assert_eq!(provider.cancelled().len(), 0);
/// ```
#[derive(Default, Clone)]
pub struct MockSubscriptionProvider {
    inner: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    status: Option<SubscriptionStatus>,
    update_error: Option<SubscriptionProviderError>,
    cancel_error: Option<SubscriptionProviderError>,
    updates: Vec<ScheduleUpdate>,
    cancels: Vec<SubscriptionId>,
}

impl MockSubscriptionProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration
    // ════════════════════════════════════════════════════════════════════════════

    /// Status returned by subsequent updates. Defaults to `Active`.
    pub fn set_status(&self, status: SubscriptionStatus) {
        self.state().status = Some(status);
    }

    /// Makes every subsequent `update_schedule` fail.
    pub fn fail_updates(&self, error: SubscriptionProviderError) {
        self.state().update_error = Some(error);
    }

    /// Makes every subsequent `cancel_schedule` fail.
    pub fn fail_cancels(&self, error: SubscriptionProviderError) {
        self.state().cancel_error = Some(error);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Call Tracking
    // ════════════════════════════════════════════════════════════════════════════

    /// Every update attempted, including failed ones.
    pub fn updates(&self) -> Vec<ScheduleUpdate> {
        self.state().updates.clone()
    }

    /// Every cancel attempted, including failed ones.
    pub fn cancelled(&self) -> Vec<SubscriptionId> {
        self.state().cancels.clone()
    }
}

#[async_trait]
impl SubscriptionProvider for MockSubscriptionProvider {
    async fn update_schedule(
        &self,
        update: &ScheduleUpdate,
    ) -> Result<SubscriptionStatus, SubscriptionProviderError> {
        let mut state = self.state();
        state.updates.push(update.clone());
        if let Some(err) = state.update_error.clone() {
            return Err(err);
        }
        Ok(state.status.clone().unwrap_or(SubscriptionStatus::Active))
    }

    async fn cancel_schedule(
        &self,
        subscription_id: &SubscriptionId,
    ) -> Result<(), SubscriptionProviderError> {
        let mut state = self.state();
        state.cancels.push(subscription_id.clone());
        match state.cancel_error.clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
