//! Mock mailing list for testing.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::domain::entitlement::Email;
use crate::ports::{MailingList, MailingListError};

/// Direction of a recorded mailing-list call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListOperation {
    Subscribe,
    Unsubscribe,
}

/// Recorded mailing-list call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListCall {
    pub operation: ListOperation,
    pub email: String,
    pub list: String,
}

/// Mock mailing list that records calls and can be told to fail.
#[derive(Default, Clone)]
pub struct MockMailingList {
    inner: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    subscribe_error: Option<MailingListError>,
    unsubscribe_error: Option<MailingListError>,
    calls: Vec<ListCall>,
}

impl MockMailingList {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn fail_subscribes(&self, error: MailingListError) {
        self.state().subscribe_error = Some(error);
    }

    pub fn fail_unsubscribes(&self, error: MailingListError) {
        self.state().unsubscribe_error = Some(error);
    }

    pub fn calls(&self) -> Vec<ListCall> {
        self.state().calls.clone()
    }

    /// Calls of one kind against one list.
    pub fn calls_to(&self, operation: ListOperation, list: &str) -> Vec<ListCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.operation == operation && c.list == list)
            .collect()
    }

    fn record(
        &self,
        operation: ListOperation,
        email: &Email,
        list: &str,
    ) -> Result<(), MailingListError> {
        let mut state = self.state();
        state.calls.push(ListCall {
            operation,
            email: email.as_str().to_string(),
            list: list.to_string(),
        });
        let error = match operation {
            ListOperation::Subscribe => state.subscribe_error.clone(),
            ListOperation::Unsubscribe => state.unsubscribe_error.clone(),
        };
        match error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl MailingList for MockMailingList {
    async fn subscribe(&self, email: &Email, list: &str) -> Result<(), MailingListError> {
        self.record(ListOperation::Subscribe, email, list)
    }

    async fn unsubscribe(&self, email: &Email, list: &str) -> Result<(), MailingListError> {
        self.record(ListOperation::Unsubscribe, email, list)
    }
}
