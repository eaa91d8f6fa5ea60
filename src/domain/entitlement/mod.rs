//! Entitlement domain module.
//!
//! Tracks a customer's paid access and the recurring schedule that funds it.
//!
//! # Module Structure
//!
//! - `aggregate` - Entitlement record and the expiry extension rule
//! - `email` - Normalized business key
//! - `plan` - Canonical plan identifiers
//! - `subscription` - Provider schedule id and status mirror
//! - `tariff` - Free-text product name resolution
//! - `errors` - Reconciliation error taxonomy

mod aggregate;
mod email;
mod errors;
mod plan;
mod subscription;
mod tariff;

pub use aggregate::{Entitlement, RecurringSchedule};
pub use email::Email;
pub use errors::EntitlementError;
pub use plan::Plan;
pub use subscription::{SubscriptionId, SubscriptionStatus};
pub use tariff::{Tariff, TariffResolver};
