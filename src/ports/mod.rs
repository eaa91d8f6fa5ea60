//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Storage
//!
//! - `EntitlementStore` - Transaction factory with key-scoped locking
//! - `EntitlementTransaction` - Unit of work over entitlement records
//!
//! ## Collaborators
//!
//! - `SubscriptionProvider` - Recurring-billing schedule update/cancel
//! - `MailingList` - Marketing list subscribe/unsubscribe
//! - `AdminNotifier` - Operator message sink
//! - `Clock` - Source of "now" for expiry arithmetic

mod admin_notifier;
mod clock;
mod entitlement_store;
mod mailing_list;
mod subscription_provider;

pub use admin_notifier::AdminNotifier;
pub use clock::{Clock, ManualClock, SystemClock};
pub use entitlement_store::{EntitlementStore, EntitlementTransaction};
pub use mailing_list::{Campaigns, MailingList, MailingListError};
pub use subscription_provider::{
    IntervalUnit, ProviderErrorCode, ScheduleUpdate, SubscriptionProvider,
    SubscriptionProviderError,
};
