//! HTTP handlers for payment webhooks and entitlement lookups.
//!
//! These handlers connect Axum routes to application layer command/query handlers.
//!
//! Webhook routes acknowledge malformed notifications after reporting them to
//! the admin channel: providers retry anything that is not a 2xx, and a
//! malformed payload never becomes valid on retry. Only hard failures of the
//! engine answer 5xx.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Json, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::Duration;
use subtle::ConstantTimeEq;

use crate::adapters::cloudpayments::{WebhookVerifier, CONTENT_HMAC_HEADER};
use crate::application::handlers::entitlement::{
    CheckAccessHandler, CheckAccessQuery, GetEntitlementHandler, GetEntitlementQuery,
    RegisterFromOneTimePaymentCommand, RegisterFromOneTimePaymentHandler,
    RegisterFromRecurringPaymentCommand, RegisterFromRecurringPaymentHandler,
    RegisterFromTrialCommand, RegisterFromTrialHandler, RegisterRecurringStatusCommand,
    RegisterRecurringStatusHandler,
};
use crate::config::WebhooksConfig;
use crate::domain::entitlement::{Email, EntitlementError};
use crate::ports::{
    AdminNotifier, Campaigns, Clock, EntitlementStore, MailingList, SubscriptionProvider,
};

use super::amount::parse_amount;
use super::dto::{
    CloudPaymentsAck, ErrorResponse, FormFields, HealthResponse, SuccessResponse,
    UserLookupParams,
};

/// CloudPayments also sends the digest under this name.
const X_CONTENT_HMAC_HEADER: &str = "X-Content-HMAC";

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared application state containing all dependencies.
#[derive(Clone)]
pub struct PaymentsAppState {
    pub store: Arc<dyn EntitlementStore>,
    pub subscription_provider: Arc<dyn SubscriptionProvider>,
    pub mailing_list: Arc<dyn MailingList>,
    pub notifier: Arc<dyn AdminNotifier>,
    pub clock: Arc<dyn Clock>,
    pub campaigns: Campaigns,
    pub webhooks: WebhooksConfig,
    /// Present when CloudPayments signatures are enforced.
    pub webhook_verifier: Option<WebhookVerifier>,
    pub default_trial_days: u32,
}

impl PaymentsAppState {
    pub fn trial_handler(&self) -> RegisterFromTrialHandler {
        RegisterFromTrialHandler::new(
            self.store.clone(),
            self.mailing_list.clone(),
            self.notifier.clone(),
            self.campaigns.clone(),
            self.clock.clone(),
        )
    }

    pub fn one_time_payment_handler(&self) -> RegisterFromOneTimePaymentHandler {
        RegisterFromOneTimePaymentHandler::new(
            self.store.clone(),
            self.mailing_list.clone(),
            self.notifier.clone(),
            self.campaigns.clone(),
            self.clock.clone(),
        )
    }

    pub fn recurring_payment_handler(&self) -> RegisterFromRecurringPaymentHandler {
        RegisterFromRecurringPaymentHandler::new(
            self.store.clone(),
            self.subscription_provider.clone(),
            self.mailing_list.clone(),
            self.notifier.clone(),
            self.campaigns.clone(),
            self.clock.clone(),
        )
    }

    pub fn recurring_status_handler(&self) -> RegisterRecurringStatusHandler {
        RegisterRecurringStatusHandler::new(
            self.store.clone(),
            self.mailing_list.clone(),
            self.notifier.clone(),
            self.campaigns.clone(),
        )
    }

    pub fn check_access_handler(&self) -> CheckAccessHandler {
        CheckAccessHandler::new(
            self.store.clone(),
            self.webhooks.project_id.clone(),
            self.clock.clone(),
        )
    }

    pub fn get_entitlement_handler(&self) -> GetEntitlementHandler {
        GetEntitlementHandler::new(
            self.store.clone(),
            self.webhooks.project_id.clone(),
            self.clock.clone(),
        )
    }

    fn verify_signature(&self, headers: &HeaderMap, body: &[u8]) -> Result<(), PaymentsApiError> {
        let Some(verifier) = &self.webhook_verifier else {
            return Ok(());
        };
        let provided = headers
            .get(CONTENT_HMAC_HEADER)
            .or_else(|| headers.get(X_CONTENT_HMAC_HEADER))
            .and_then(|v| v.to_str().ok())
            .ok_or(PaymentsApiError::InvalidSignature)?;
        if verifier.verify(body, provided) {
            Ok(())
        } else {
            Err(PaymentsApiError::InvalidSignature)
        }
    }
}

/// Compares a route secret in constant time. An unset secret never matches.
fn ensure_route(expected: &str, provided: &str) -> Result<(), PaymentsApiError> {
    if expected.is_empty() {
        return Err(PaymentsApiError::RouteNotFound);
    }
    if bool::from(expected.as_bytes().ct_eq(provided.as_bytes())) {
        Ok(())
    } else {
        Err(PaymentsApiError::RouteNotFound)
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Webhook Endpoints
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/payments/trial/:hash - Trial signup form
///
/// Always answers 201; the form widget ignores the body.
pub async fn register_trial(
    State(state): State<PaymentsAppState>,
    Path(hash): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, PaymentsApiError> {
    ensure_route(&state.webhooks.trial_route_hash, &hash)?;

    let form = FormFields::parse(&body);
    let name = form.get("name");
    let email = form.get("email");
    let phone = form.get("phone");
    let raw_days = form.get("daysDuration");

    if email.is_empty() {
        state
            .notifier
            .notify(&format!(
                "Trial form without email skipped (name: {}, phone: {})",
                name, phone
            ))
            .await;
        return Ok(StatusCode::CREATED);
    }

    let days = if raw_days.is_empty() {
        i64::from(state.default_trial_days)
    } else {
        match raw_days.parse::<i64>() {
            Ok(days) if days > 0 => days,
            _ => {
                state
                    .notifier
                    .notify(&format!(
                        "Trial form for {} skipped: invalid duration '{}'",
                        email, raw_days
                    ))
                    .await;
                return Ok(StatusCode::CREATED);
            }
        }
    };

    let cmd = RegisterFromTrialCommand {
        email: email.to_string(),
        name: name.to_string(),
        duration: Duration::days(days),
    };
    if let Err(err) = state.trial_handler().handle(cmd).await {
        tracing::warn!(email, phone, error = %err, "Trial form not registered");
    }

    Ok(StatusCode::CREATED)
}

/// POST /api/payments/prodamus/webhook/pay/:hash - One-time payment notification
pub async fn one_time_payment_webhook(
    State(state): State<PaymentsAppState>,
    Path(hash): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, PaymentsApiError> {
    ensure_route(&state.webhooks.prodamus_route_hash, &hash)?;

    let form = FormFields::parse(&body);
    let plan_text = form.get("customer_extra");
    let email = form.get("customer_email");
    let raw_amount = form.get("sum");
    let name = form.get("_param_name");
    let payment_status = form.get("payment_status");

    if payment_status != "success" {
        state
            .notifier
            .notify(&format!(
                "One-time payment notification with status '{}' skipped (email: {}, plan: {}, sum: {})",
                payment_status, email, plan_text, raw_amount
            ))
            .await;
        return Ok(Json(SuccessResponse::ok()));
    }

    if email.is_empty() || plan_text.is_empty() {
        state
            .notifier
            .notify(&format!(
                "One-time payment notification missing fields skipped (email: '{}', plan: '{}')",
                email, plan_text
            ))
            .await;
        return Ok(Json(SuccessResponse::ok()));
    }

    if let Err(err) = Email::parse(email) {
        state
            .notifier
            .notify(&format!(
                "One-time payment notification skipped: {} (plan: {}, sum: {})",
                err, plan_text, raw_amount
            ))
            .await;
        return Ok(Json(SuccessResponse::ok()));
    }

    let amount = match parse_amount(raw_amount) {
        Ok(amount) => amount,
        Err(err) => {
            state
                .notifier
                .notify(&format!(
                    "One-time payment notification for {} skipped: {}",
                    email, err
                ))
                .await;
            return Ok(Json(SuccessResponse::ok()));
        }
    };

    let cmd = RegisterFromOneTimePaymentCommand {
        plan_text: plan_text.to_string(),
        email: email.to_string(),
        name: name.to_string(),
        amount,
    };
    state.one_time_payment_handler().handle(cmd).await?;

    Ok(Json(SuccessResponse::ok()))
}

/// POST /api/payments/cloudpayments/webhook/pay/:hash - Recurring payment notification
pub async fn recurring_payment_webhook(
    State(state): State<PaymentsAppState>,
    Path(hash): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, PaymentsApiError> {
    ensure_route(&state.webhooks.cloudpayments_pay_route_hash, &hash)?;
    state.verify_signature(&headers, &body)?;

    let form = FormFields::parse(&body);
    let plan_text = form.get("Description");
    let email = form.get("Email");
    let name = form.get("Name");
    let raw_amount = form.get("Amount");
    let subscription_id = form.get("SubscriptionId");
    let operation = form.get("OperationType");

    if operation != "Payment" {
        state
            .notifier
            .notify(&format!(
                "CloudPayments notification with operation '{}' skipped (email: {}, plan: {})",
                operation, email, plan_text
            ))
            .await;
        return Ok(Json(CloudPaymentsAck::accepted()));
    }

    if email.is_empty() || plan_text.is_empty() {
        state
            .notifier
            .notify(&format!(
                "CloudPayments notification missing fields skipped (email: '{}', plan: '{}')",
                email, plan_text
            ))
            .await;
        return Ok(Json(CloudPaymentsAck::accepted()));
    }

    if let Err(err) = Email::parse(email) {
        state
            .notifier
            .notify(&format!(
                "CloudPayments notification skipped: {} (plan: {}, subscription: {})",
                err, plan_text, subscription_id
            ))
            .await;
        return Ok(Json(CloudPaymentsAck::accepted()));
    }

    let amount = match parse_amount(raw_amount) {
        Ok(amount) => amount,
        Err(err) => {
            state
                .notifier
                .notify(&format!(
                    "CloudPayments notification for {} skipped: {}",
                    email, err
                ))
                .await;
            return Ok(Json(CloudPaymentsAck::accepted()));
        }
    };

    let cmd = RegisterFromRecurringPaymentCommand {
        plan_text: plan_text.to_string(),
        email: email.to_string(),
        name: name.to_string(),
        amount,
        subscription_id: subscription_id.to_string(),
    };
    state.recurring_payment_handler().handle(cmd).await?;

    Ok(Json(CloudPaymentsAck::accepted()))
}

/// POST /api/payments/cloudpayments/webhook/recurrent/:hash - Subscription status notification
pub async fn recurring_status_webhook(
    State(state): State<PaymentsAppState>,
    Path(hash): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, PaymentsApiError> {
    ensure_route(&state.webhooks.cloudpayments_recurrent_route_hash, &hash)?;
    state.verify_signature(&headers, &body)?;

    let form = FormFields::parse(&body);
    let cmd = RegisterRecurringStatusCommand {
        subscription_id: form.get("Id").to_string(),
        email: form.get("Email").to_string(),
        status: form.get("Status").to_string(),
    };
    state.recurring_status_handler().handle(cmd).await?;

    Ok(Json(CloudPaymentsAck::accepted()))
}

// ════════════════════════════════════════════════════════════════════════════════
// Lookup Endpoints
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/payments/user/access - Check whether a customer has access
pub async fn user_access(
    State(state): State<PaymentsAppState>,
    Query(params): Query<UserLookupParams>,
) -> Result<Response, PaymentsApiError> {
    if params.email.trim().is_empty() || params.project_id.trim().is_empty() {
        return Err(PaymentsApiError::MissingParams("email and project_id"));
    }

    let result = state
        .check_access_handler()
        .handle(CheckAccessQuery {
            email: params.email,
            project_id: params.project_id,
        })
        .await?;

    if result.has_access {
        Ok(Json(SuccessResponse::ok()).into_response())
    } else {
        Ok((
            StatusCode::FORBIDDEN,
            Json(ErrorResponse::new("ACCESS_DENIED", "No active entitlement")),
        )
            .into_response())
    }
}

/// GET /api/payments/user/info - Entitlement details
pub async fn user_info(
    State(state): State<PaymentsAppState>,
    Query(params): Query<UserLookupParams>,
) -> Result<Response, PaymentsApiError> {
    if params.email.trim().is_empty() || params.project_id.trim().is_empty() {
        return Err(PaymentsApiError::MissingParams("email and project_id"));
    }

    let result = state
        .get_entitlement_handler()
        .handle(GetEntitlementQuery {
            email: params.email,
            project_id: params.project_id,
        })
        .await?;

    match result.entitlement {
        Some(view) => Ok(Json(view).into_response()),
        None => Ok((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new("ENTITLEMENT_NOT_FOUND", "Not found")),
        )
            .into_response()),
    }
}

/// GET /api/ping
pub async fn ping() -> StatusCode {
    StatusCode::OK
}

/// GET /api/healthz
pub async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts engine errors to HTTP responses.
#[derive(Debug)]
pub enum PaymentsApiError {
    /// Route secret mismatch; indistinguishable from an unknown path.
    RouteNotFound,
    InvalidSignature,
    MissingParams(&'static str),
    Entitlement(EntitlementError),
}

impl From<EntitlementError> for PaymentsApiError {
    fn from(err: EntitlementError) -> Self {
        Self::Entitlement(err)
    }
}

impl IntoResponse for PaymentsApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            PaymentsApiError::RouteNotFound => {
                return StatusCode::NOT_FOUND.into_response();
            }
            PaymentsApiError::InvalidSignature => (
                StatusCode::UNAUTHORIZED,
                "INVALID_WEBHOOK_SIGNATURE",
                "Invalid webhook signature".to_string(),
            ),
            PaymentsApiError::MissingParams(what) => (
                StatusCode::BAD_REQUEST,
                "MISSING_PARAMETERS",
                format!("Missing {} in query parameters", what),
            ),
            PaymentsApiError::Entitlement(err) => {
                let (status, code) = match err {
                    EntitlementError::AlreadyRegistered(_) => {
                        (StatusCode::CONFLICT, "ALREADY_REGISTERED")
                    }
                    EntitlementError::NotFound(_) | EntitlementError::SubscriptionNotFound(_) => {
                        (StatusCode::NOT_FOUND, "ENTITLEMENT_NOT_FOUND")
                    }
                    EntitlementError::Forbidden => (StatusCode::FORBIDDEN, "FORBIDDEN"),
                    EntitlementError::Timeout(_) => (StatusCode::REQUEST_TIMEOUT, "TIMEOUT"),
                    EntitlementError::ValidationFailed { .. } => {
                        (StatusCode::BAD_REQUEST, "VALIDATION_FAILED")
                    }
                    EntitlementError::Provider(_)
                    | EntitlementError::MailingList(_)
                    | EntitlementError::Infrastructure(_) => {
                        (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
                    }
                };
                (status, code, err.message())
            }
        };

        if status.is_server_error() {
            tracing::error!(code, error = %message, "Request failed");
        }
        (status, Json(ErrorResponse::new(code, message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ════════════════════════════════════════════════════════════════════════════
    // Error Mapping Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn already_registered_maps_to_409() {
        let response =
            PaymentsApiError::from(EntitlementError::already_registered("a@x.com")).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn not_found_maps_to_404() {
        let response = PaymentsApiError::from(EntitlementError::not_found("id")).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn timeout_maps_to_408() {
        let response = PaymentsApiError::from(EntitlementError::timeout("lock")).into_response();
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
    }

    #[test]
    fn validation_maps_to_400() {
        let response =
            PaymentsApiError::from(EntitlementError::validation("email", "empty")).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn provider_failure_maps_to_500() {
        let response = PaymentsApiError::from(EntitlementError::provider("down")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn forbidden_maps_to_403() {
        let response = PaymentsApiError::from(EntitlementError::Forbidden).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn route_mismatch_is_plain_404() {
        assert_eq!(
            PaymentsApiError::RouteNotFound.into_response().status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn route_secret_comparison() {
        assert!(ensure_route("abc123", "abc123").is_ok());
        assert!(ensure_route("abc123", "abc124").is_err());
        assert!(ensure_route("abc123", "abc").is_err());
        assert!(ensure_route("", "").is_err());
    }
}
