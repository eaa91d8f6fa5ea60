//! CheckAccessHandler - Query handler for checking customer access.

use std::sync::Arc;

use subtle::ConstantTimeEq;

use crate::domain::entitlement::{Email, EntitlementError};
use crate::ports::{Clock, EntitlementStore};

/// Query to check whether a customer currently has access.
#[derive(Debug, Clone)]
pub struct CheckAccessQuery {
    pub email: String,
    pub project_id: String,
}

/// Result of access check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckAccessResult {
    pub has_access: bool,
}

/// Handler for checking access.
///
/// Reads outside any transaction; a slightly stale answer is acceptable.
pub struct CheckAccessHandler {
    store: Arc<dyn EntitlementStore>,
    project_id: String,
    clock: Arc<dyn Clock>,
}

impl CheckAccessHandler {
    pub fn new(store: Arc<dyn EntitlementStore>, project_id: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            project_id: project_id.into(),
            clock,
        }
    }

    pub async fn handle(&self, query: CheckAccessQuery) -> Result<CheckAccessResult, EntitlementError> {
        ensure_project(&self.project_id, &query.project_id)?;
        let email = Email::parse(&query.email)?;

        let has_access = self
            .store
            .find_by_email(&email)
            .await?
            .is_some_and(|record| !record.is_expired(self.clock.now()));

        Ok(CheckAccessResult { has_access })
    }
}

/// Rejects callers asking about another project.
pub(super) fn ensure_project(expected: &str, provided: &str) -> Result<(), EntitlementError> {
    let matches: bool = expected.trim().as_bytes().ct_eq(provided.trim().as_bytes()).into();
    if matches {
        Ok(())
    } else {
        Err(EntitlementError::Forbidden)
    }
}
