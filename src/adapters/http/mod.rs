//! HTTP adapters - REST API implementations.

pub mod payments;

// Re-export key types for convenience
pub use payments::{build_app, payments_router, PaymentsAppState};
