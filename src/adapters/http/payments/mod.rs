//! HTTP adapter for payment webhooks and entitlement lookups.
//!
//! Exposes the reconciliation engine via REST API:
//! - `POST /api/payments/trial/:hash` - Trial signup form
//! - `POST /api/payments/prodamus/webhook/pay/:hash` - One-time payment
//! - `POST /api/payments/cloudpayments/webhook/pay/:hash` - Recurring payment
//! - `POST /api/payments/cloudpayments/webhook/recurrent/:hash` - Subscription status
//! - `GET /api/payments/user/access` - Access check
//! - `GET /api/payments/user/info` - Entitlement details
//! - `GET /api/ping`, `GET /api/healthz` - Liveness

pub mod amount;
pub mod dto;
pub mod handlers;
pub mod routes;

pub use amount::{parse_amount, AmountError};
pub use dto::*;
pub use handlers::{PaymentsApiError, PaymentsAppState};
pub use routes::{build_app, build_cors_layer, payments_router, payments_routes};
