//! Admin notification port.
//!
//! A fire-and-forget sink for human-readable operator messages. Delivery
//! failures are the adapter's concern and never reach the caller.

use async_trait::async_trait;

#[async_trait]
pub trait AdminNotifier: Send + Sync {
    /// Pushes `text` to the operators. Blank messages are dropped.
    async fn notify(&self, text: &str);
}
