//! Entitlement store port.
//!
//! Defines the transactional contract the reconciliation handlers run against.
//!
//! # Design
//!
//! - **Unit of work**: every mutation happens inside an [`EntitlementTransaction`]
//! - **Key-scoped locks**: operations that mutate lock their business key
//!   (email or subscription id) until the transaction ends
//! - **Re-entrant**: a transaction may lock the same key any number of times
//! - **Rollback on drop**: a transaction dropped without `commit` leaves no trace
//!
//! Two transactions touching different keys never block each other.
//!
//! # Example
//!
//! ```ignore
//! let mut tx = store.begin().await?;
//! let record = tx.find_or_create(&candidate).await?;
//! let mut record = record;
//! record.apply_one_time_payment(&tariff, amount, expires_at, now);
//! tx.replace_entitlement(&record).await?;
//! tx.commit().await?;
//! ```

use crate::domain::entitlement::{Email, Entitlement, SubscriptionId, SubscriptionStatus};
use crate::domain::foundation::DomainError;
use async_trait::async_trait;

/// Factory for entitlement transactions plus unlocked reads.
#[async_trait]
pub trait EntitlementStore: Send + Sync {
    /// Opens a new transaction.
    ///
    /// # Errors
    ///
    /// - `DatabaseError` if no connection could be obtained
    async fn begin(&self) -> Result<Box<dyn EntitlementTransaction>, DomainError>;

    /// Plain lookup outside any transaction. May observe stale data.
    async fn find_by_email(&self, email: &Email) -> Result<Option<Entitlement>, DomainError>;
}

/// A single store transaction.
///
/// Locks taken by any method are held until [`commit`](Self::commit) or drop.
#[async_trait]
pub trait EntitlementTransaction: Send {
    /// Lookup by email without taking the key lock.
    async fn find_by_email(&mut self, email: &Email) -> Result<Option<Entitlement>, DomainError>;

    /// Inserts a new record.
    ///
    /// # Errors
    ///
    /// - `EntitlementExists` if a record with this email already exists
    /// - `DatabaseError` on persistence failure
    async fn create(&mut self, record: &Entitlement) -> Result<Entitlement, DomainError>;

    /// Returns the record for `candidate.email`, inserting `candidate` if absent.
    ///
    /// Locks the email before the existence check, so concurrent callers for
    /// the same email observe exactly one insert.
    ///
    /// # Errors
    ///
    /// - `LockTimeout` if the email lock could not be acquired in time
    /// - `DatabaseError` on persistence failure (including a uniqueness
    ///   violation that slipped past the lock)
    async fn find_or_create(&mut self, candidate: &Entitlement) -> Result<Entitlement, DomainError>;

    /// Overwrites plan, amount, expiry and schedule of the record with `record.id`.
    ///
    /// Locks by email.
    ///
    /// # Errors
    ///
    /// - `EntitlementNotFound` if the id no longer exists
    /// - `LockTimeout` if the email lock could not be acquired in time
    async fn replace_entitlement(&mut self, record: &Entitlement) -> Result<(), DomainError>;

    /// Updates only the schedule status of the record holding `subscription_id`.
    ///
    /// Locks by subscription id.
    ///
    /// # Errors
    ///
    /// - `SubscriptionNotFound` if no record currently holds this id
    /// - `LockTimeout` if the lock could not be acquired in time
    async fn set_subscription_status(
        &mut self,
        subscription_id: &SubscriptionId,
        status: &SubscriptionStatus,
    ) -> Result<(), DomainError>;

    /// Makes all writes visible and releases every lock.
    ///
    /// # Errors
    ///
    /// - `DatabaseError` if the commit failed or the transaction was already finished
    async fn commit(&mut self) -> Result<(), DomainError>;
}
