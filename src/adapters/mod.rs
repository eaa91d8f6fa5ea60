//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `memory` - In-process entitlement store
//! - `postgres` - PostgreSQL entitlement store
//! - `cloudpayments` - Recurring-billing provider client and webhook signatures
//! - `unisender` - Mailing-list client
//! - `telegram` - Admin notifiers
//! - `http` - Axum webhook and lookup endpoints

pub mod cloudpayments;
pub mod http;
pub mod memory;
pub mod postgres;
pub mod telegram;
pub mod unisender;

pub use cloudpayments::{CloudPaymentsClient, MockSubscriptionProvider, WebhookVerifier};
pub use memory::InMemoryEntitlementStore;
pub use postgres::PostgresEntitlementStore;
pub use telegram::{LogNotifier, RecordingNotifier, TelegramNotifier};
pub use unisender::{MockMailingList, UniSenderClient};

use std::time::Duration;

/// Timeout applied to outbound API calls unless configured otherwise.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Builds a reqwest client whose requests give up after `timeout`.
pub(crate) fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|err| {
            tracing::error!(error = %err, "Failed to build HTTP client, using defaults");
            reqwest::Client::new()
        })
}
