//! In-memory entitlement store.
//!
//! Serializes per-key mutations with a [`KeyLocks`] map instead of database
//! advisory locks. Writes are staged inside the transaction and applied
//! atomically on commit; dropping a transaction discards them.
//!
//! Used by tests and by `storage.backend = "memory"` for local runs.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::domain::entitlement::{Email, Entitlement, SubscriptionId, SubscriptionStatus};
use crate::domain::foundation::{DomainError, EntitlementId, ErrorCode};
use crate::ports::{EntitlementStore, EntitlementTransaction};

use super::key_locks::{KeyGuard, KeyLocks, LockKey};

#[derive(Default)]
struct Table {
    rows: HashMap<EntitlementId, Entitlement>,
    by_email: HashMap<Email, EntitlementId>,
}

impl Table {
    fn upsert(&mut self, record: Entitlement) -> Result<(), DomainError> {
        if let Some(owner) = self.by_email.get(&record.email) {
            if *owner != record.id {
                return Err(duplicate_email(&record.email));
            }
        }
        if let Some(previous) = self.rows.get(&record.id) {
            if previous.email != record.email {
                self.by_email.remove(&previous.email);
            }
        }
        self.by_email.insert(record.email.clone(), record.id);
        self.rows.insert(record.id, record);
        Ok(())
    }
}

/// In-memory implementation of [`EntitlementStore`].
pub struct InMemoryEntitlementStore {
    table: Arc<Mutex<Table>>,
    locks: Arc<KeyLocks>,
    lock_timeout: Duration,
}

impl InMemoryEntitlementStore {
    pub fn new(lock_timeout: Duration) -> Self {
        Self {
            table: Arc::new(Mutex::new(Table::default())),
            locks: Arc::new(KeyLocks::new()),
            lock_timeout,
        }
    }

    // === Test Helpers ===

    /// Inserts or replaces a record outside any transaction.
    pub fn seed(&self, record: Entitlement) -> Result<(), DomainError> {
        lock_table(&self.table).upsert(record)
    }

    /// Returns every committed record.
    pub fn all(&self) -> Vec<Entitlement> {
        lock_table(&self.table).rows.values().cloned().collect()
    }

    /// Number of committed records.
    pub fn len(&self) -> usize {
        lock_table(&self.table).rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of keys currently locked or awaited.
    pub fn locked_keys(&self) -> usize {
        self.locks.active_keys()
    }
}

impl Default for InMemoryEntitlementStore {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

#[async_trait]
impl EntitlementStore for InMemoryEntitlementStore {
    async fn begin(&self) -> Result<Box<dyn EntitlementTransaction>, DomainError> {
        Ok(Box::new(InMemoryTransaction {
            table: Arc::clone(&self.table),
            locks: Arc::clone(&self.locks),
            lock_timeout: self.lock_timeout,
            held: HashMap::new(),
            staged: HashMap::new(),
            status_patches: HashMap::new(),
            finished: false,
        }))
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<Entitlement>, DomainError> {
        let table = lock_table(&self.table);
        Ok(table
            .by_email
            .get(email)
            .and_then(|id| table.rows.get(id))
            .cloned())
    }
}

struct InMemoryTransaction {
    table: Arc<Mutex<Table>>,
    locks: Arc<KeyLocks>,
    lock_timeout: Duration,
    held: HashMap<LockKey, KeyGuard>,
    staged: HashMap<EntitlementId, Entitlement>,
    /// Status changes for committed rows, applied to whichever row holds the
    /// subscription at commit time.
    status_patches: HashMap<SubscriptionId, SubscriptionStatus>,
    finished: bool,
}

impl InMemoryTransaction {
    fn ensure_open(&self) -> Result<(), DomainError> {
        if self.finished {
            return Err(DomainError::new(
                ErrorCode::DatabaseError,
                "Transaction already committed",
            ));
        }
        Ok(())
    }

    async fn lock(&mut self, key: LockKey) -> Result<(), DomainError> {
        self.ensure_open()?;
        if self.held.contains_key(&key) {
            return Ok(());
        }
        match self.locks.acquire(key.clone(), self.lock_timeout).await {
            Some(guard) => {
                self.held.insert(key, guard);
                Ok(())
            }
            None => Err(DomainError::new(
                ErrorCode::LockTimeout,
                format!("Timed out waiting for lock on {:?}", key),
            )),
        }
    }

    /// First record matching `pred`, staged writes shadowing committed rows.
    fn find(&self, pred: impl Fn(&Entitlement) -> bool) -> Option<Entitlement> {
        if let Some(found) = self.staged.values().find(|r| pred(r)) {
            return Some(found.clone());
        }
        let table = lock_table(&self.table);
        table
            .rows
            .values()
            .filter(|r| !self.staged.contains_key(&r.id))
            .map(|r| self.patched(r))
            .find(|r| pred(r))
    }

    fn patched(&self, row: &Entitlement) -> Entitlement {
        let mut row = row.clone();
        if let Some(schedule) = row.schedule.as_mut() {
            if let Some(status) = self.status_patches.get(&schedule.id) {
                schedule.status = status.clone();
            }
        }
        row
    }

    fn stage(&mut self, record: Entitlement) {
        self.staged.insert(record.id, record);
    }
}

#[async_trait]
impl EntitlementTransaction for InMemoryTransaction {
    async fn find_by_email(&mut self, email: &Email) -> Result<Option<Entitlement>, DomainError> {
        self.ensure_open()?;
        Ok(self.find(|r| &r.email == email))
    }

    async fn create(&mut self, record: &Entitlement) -> Result<Entitlement, DomainError> {
        self.lock(LockKey::Email(record.email.as_str().to_string())).await?;
        if self.find(|r| r.email == record.email).is_some() {
            return Err(duplicate_email(&record.email));
        }
        self.stage(record.clone());
        Ok(record.clone())
    }

    async fn find_or_create(&mut self, candidate: &Entitlement) -> Result<Entitlement, DomainError> {
        self.lock(LockKey::Email(candidate.email.as_str().to_string())).await?;
        if let Some(existing) = self.find(|r| r.email == candidate.email) {
            return Ok(existing);
        }
        self.stage(candidate.clone());
        Ok(candidate.clone())
    }

    async fn replace_entitlement(&mut self, record: &Entitlement) -> Result<(), DomainError> {
        self.lock(LockKey::Email(record.email.as_str().to_string())).await?;
        let mut current = self.find(|r| r.id == record.id).ok_or_else(|| {
            DomainError::new(
                ErrorCode::EntitlementNotFound,
                format!("Entitlement not found: {}", record.id),
            )
        })?;
        current.name = record.name.clone();
        current.plan = record.plan;
        current.expires_at = record.expires_at;
        current.schedule = record.schedule.clone();
        current.last_paid_amount = record.last_paid_amount;
        current.updated_at = record.updated_at;
        self.stage(current);
        Ok(())
    }

    async fn set_subscription_status(
        &mut self,
        subscription_id: &SubscriptionId,
        status: &SubscriptionStatus,
    ) -> Result<(), DomainError> {
        self.lock(LockKey::Subscription(subscription_id.as_str().to_string()))
            .await?;
        let staged = self
            .staged
            .values_mut()
            .find(|r| r.subscription_id() == Some(subscription_id));
        if let Some(schedule) = staged.and_then(|r| r.schedule.as_mut()) {
            schedule.status = status.clone();
            return Ok(());
        }
        if self
            .find(|r| r.subscription_id() == Some(subscription_id))
            .is_none()
        {
            return Err(subscription_not_found(subscription_id));
        }
        self.status_patches
            .insert(subscription_id.clone(), status.clone());
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), DomainError> {
        self.ensure_open()?;
        {
            let mut table = lock_table(&self.table);
            for record in self.staged.values() {
                if let Some(owner) = table.by_email.get(&record.email) {
                    if *owner != record.id {
                        return Err(duplicate_email(&record.email));
                    }
                }
            }
            for (_, record) in self.staged.drain() {
                table.upsert(record)?;
            }
            for (subscription_id, status) in self.status_patches.drain() {
                let schedule = table
                    .rows
                    .values_mut()
                    .filter_map(|r| r.schedule.as_mut())
                    .find(|s| s.id == subscription_id);
                if let Some(schedule) = schedule {
                    schedule.status = status;
                }
            }
        }
        self.finished = true;
        self.held.clear();
        Ok(())
    }
}

fn lock_table(table: &Mutex<Table>) -> MutexGuard<'_, Table> {
    table.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn duplicate_email(email: &Email) -> DomainError {
    DomainError::new(
        ErrorCode::EntitlementExists,
        format!("Entitlement already exists for {}", email),
    )
    .with_detail("email", email.as_str())
}

fn subscription_not_found(subscription_id: &SubscriptionId) -> DomainError {
    DomainError::new(
        ErrorCode::SubscriptionNotFound,
        format!("No entitlement holds subscription {}", subscription_id),
    )
    .with_detail("subscription_id", subscription_id.as_str())
}
