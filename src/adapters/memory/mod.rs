//! In-process adapters.
//!
//! - `InMemoryEntitlementStore` - Entitlement store backed by a per-key mutex map

mod entitlement_store;
mod key_locks;

pub use entitlement_store::InMemoryEntitlementStore;
pub use key_locks::{KeyGuard, KeyLocks, LockKey};
