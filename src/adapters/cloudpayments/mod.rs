//! CloudPayments adapter.
//!
//! Implements the `SubscriptionProvider` port for recurring schedules and
//! verifies the `Content-HMAC` signature on incoming notifications.
//!
//! # Security
//!
//! - API secret handled via `secrecy::SecretString`
//! - Webhook digests compared in constant time

mod client;
mod mock_subscription_provider;
mod signature;

pub use client::CloudPaymentsClient;
pub use mock_subscription_provider::MockSubscriptionProvider;
pub use signature::{WebhookVerifier, CONTENT_HMAC_HEADER};
