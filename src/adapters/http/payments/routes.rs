//! Axum router configuration for payments endpoints.
//!
//! This module defines the route structure for the webhook and lookup
//! endpoints and wraps them in the service-wide middleware stack.

use axum::{
    http::{HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;

use super::handlers::{
    healthz, one_time_payment_webhook, ping, recurring_payment_webhook,
    recurring_status_webhook, register_trial, user_access, user_info, PaymentsAppState,
};

/// Create the payments API router.
///
/// # Routes
///
/// ## Webhook Endpoints (route secret in the path)
/// - `POST /trial/:hash` - Trial signup form
/// - `POST /prodamus/webhook/pay/:hash` - One-time payment
/// - `POST /cloudpayments/webhook/pay/:hash` - Recurring payment (HMAC verified)
/// - `POST /cloudpayments/webhook/recurrent/:hash` - Subscription status (HMAC verified)
///
/// ## Lookup Endpoints
/// - `GET /user/access` - Access check
/// - `GET /user/info` - Entitlement details
pub fn payments_routes() -> Router<PaymentsAppState> {
    Router::new()
        .route("/trial/:hash", post(register_trial))
        .route("/prodamus/webhook/pay/:hash", post(one_time_payment_webhook))
        .route(
            "/cloudpayments/webhook/pay/:hash",
            post(recurring_payment_webhook),
        )
        .route(
            "/cloudpayments/webhook/recurrent/:hash",
            post(recurring_status_webhook),
        )
        .route("/user/access", get(user_access))
        .route("/user/info", get(user_info))
}

/// Create the complete `/api` router.
pub fn payments_router() -> Router<PaymentsAppState> {
    Router::new()
        .route("/api/ping", get(ping))
        .route("/api/healthz", get(healthz))
        .nest("/api/payments", payments_routes())
}

/// Builds the served application: routes, state and middleware.
///
/// The timeout layer drops the handler future when it fires, which rolls
/// back any store transaction still open inside it.
pub fn build_app(state: PaymentsAppState, server: &ServerConfig) -> Router {
    payments_router()
        .with_state(state)
        .layer(build_cors_layer(&server.cors_origins_list()))
        .layer(TimeoutLayer::new(server.request_timeout()))
        .layer(TraceLayer::new_for_http())
}

/// CORS for the lookup endpoints called from the customer site.
///
/// No origins configured allows none; a lone `*` allows any.
pub fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let is_wildcard = origins.len() == 1 && origins[0] == "*";

    let allow_origin = if is_wildcard {
        AllowOrigin::any()
    } else {
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        AllowOrigin::predicate(move |origin: &HeaderValue, _req: &axum::http::request::Parts| {
            let is_allowed = allowed.contains(origin);
            if !is_allowed {
                tracing::debug!(origin = ?origin, "CORS origin rejected");
            }
            is_allowed
        })
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
}
