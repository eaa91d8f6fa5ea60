//! CloudPayments subscription API adapter.
//!
//! Implements `SubscriptionProvider` against the CloudPayments REST API.
//! Requests are JSON over HTTPS with Basic auth (`public_id:api_secret`).
//! Every response carries a `Success` flag; `false` is a rejection even
//! when the HTTP status is 200.
//!
//! # Configuration
//!
//! ```ignore
//! let client = CloudPaymentsClient::new("pk_...", "secret")
//!     .with_base_url("http://localhost:8089");
//! ```

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::adapters::{http_client, DEFAULT_HTTP_TIMEOUT};
use crate::config::CloudPaymentsConfig;
use crate::domain::entitlement::{SubscriptionId, SubscriptionStatus};
use crate::ports::{ScheduleUpdate, SubscriptionProvider, SubscriptionProviderError};

const DEFAULT_BASE_URL: &str = "https://api.cloudpayments.ru";
const UPDATE_PATH: &str = "/subscriptions/update";
const CANCEL_PATH: &str = "/subscriptions/cancel";

/// Raw bodies quoted in errors are cut to this many characters.
const MAX_QUOTED_BODY: usize = 512;

/// CloudPayments API client.
pub struct CloudPaymentsClient {
    public_id: String,
    api_secret: SecretString,
    base_url: String,
    http_client: reqwest::Client,
}

impl CloudPaymentsClient {
    pub fn new(public_id: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            public_id: public_id.into(),
            api_secret: SecretString::new(api_secret.into()),
            base_url: DEFAULT_BASE_URL.to_string(),
            http_client: http_client(DEFAULT_HTTP_TIMEOUT),
        }
    }

    pub fn from_config(config: &CloudPaymentsConfig) -> Self {
        Self::new(config.public_id.clone(), config.api_secret.clone())
            .with_base_url(config.api_base_url.clone())
            .with_timeout(config.request_timeout())
    }

    /// Bound every API call to `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.http_client = http_client(timeout);
        self
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.base_url = url.trim().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<ApiResponse<T>, SubscriptionProviderError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned + Default,
    {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .http_client
            .post(&url)
            .basic_auth(&self.public_id, Some(self.api_secret.expose_secret()))
            .header(reqwest::header::ACCEPT, "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| SubscriptionProviderError::network(e.to_string()))?;

        let status = response.status();
        let raw = response
            .text()
            .await
            .map_err(|e| SubscriptionProviderError::network(e.to_string()))?;

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            tracing::error!(path, status = status.as_u16(), "CloudPayments refused credentials");
            return Err(SubscriptionProviderError::authentication(quote(&raw))
                .with_http_status(status.as_u16()));
        }

        if !status.is_success() {
            tracing::error!(path, status = status.as_u16(), body = %quote(&raw), "CloudPayments request failed");
            return Err(SubscriptionProviderError::rejected(format!(
                "{}: {}",
                status,
                quote(&raw)
            ))
            .with_http_status(status.as_u16()));
        }

        let parsed: ApiResponse<T> = serde_json::from_str(&raw).map_err(|e| {
            SubscriptionProviderError::invalid_response(format!(
                "failed to decode response: {}: {}",
                e,
                quote(&raw)
            ))
        })?;

        if !parsed.success {
            let message = parsed
                .message
                .as_deref()
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .unwrap_or("request failed");
            tracing::warn!(path, message, "CloudPayments rejected request");
            return Err(SubscriptionProviderError::rejected(format!(
                "{}: {}",
                message,
                quote(&raw)
            ))
            .with_http_status(status.as_u16()));
        }

        Ok(parsed)
    }
}

#[async_trait]
impl SubscriptionProvider for CloudPaymentsClient {
    async fn update_schedule(
        &self,
        update: &ScheduleUpdate,
    ) -> Result<SubscriptionStatus, SubscriptionProviderError> {
        if update.period == 0 {
            return Err(SubscriptionProviderError::rejected("period must be positive"));
        }

        let request = UpdateRequest {
            id: update.subscription_id.as_str(),
            start_date: update.start_date.to_rfc3339(),
            interval: update.interval.as_str(),
            period: update.period,
        };

        let response: ApiResponse<SubscriptionModel> = self.post(UPDATE_PATH, &request).await?;

        let status = SubscriptionStatus::from_provider(&response.model.status);
        tracing::debug!(
            subscription_id = %update.subscription_id.as_str(),
            start_date = %request.start_date,
            status = %status.as_str(),
            "CloudPayments schedule updated"
        );
        Ok(status)
    }

    async fn cancel_schedule(
        &self,
        subscription_id: &SubscriptionId,
    ) -> Result<(), SubscriptionProviderError> {
        let request = CancelRequest {
            id: subscription_id.as_str(),
        };
        let _: ApiResponse<serde_json::Value> = self.post(CANCEL_PATH, &request).await?;
        tracing::debug!(subscription_id = %subscription_id.as_str(), "CloudPayments schedule cancelled");
        Ok(())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Wire types
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct UpdateRequest<'a> {
    id: &'a str,
    start_date: String,
    interval: &'a str,
    period: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct CancelRequest<'a> {
    id: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ApiResponse<T> {
    #[serde(
        default,
        deserialize_with = "null_as_default",
        bound(deserialize = "T: Deserialize<'de> + Default")
    )]
    model: T,
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SubscriptionModel {
    #[serde(default)]
    status: String,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn quote(raw: &str) -> String {
    let raw = raw.trim();
    if raw.chars().count() <= MAX_QUOTED_BODY {
        return raw.to_string();
    }
    let mut cut: String = raw.chars().take(MAX_QUOTED_BODY).collect();
    cut.push('…');
    cut
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::Timestamp;
    use chrono::{TimeZone, Utc};

    #[test]
    fn base_url_is_trimmed() {
        let client = CloudPaymentsClient::new("pk", "secret").with_base_url(" http://localhost:9000/ ");
        assert_eq!(client.base_url(), "http://localhost:9000");
    }

    #[test]
    fn from_config_uses_configured_base_url() {
        let config = CloudPaymentsConfig {
            public_id: "pk".to_string(),
            api_secret: "secret".to_string(),
            api_base_url: "http://cp.test".to_string(),
            ..Default::default()
        };
        assert_eq!(CloudPaymentsClient::from_config(&config).base_url(), "http://cp.test");
    }

    #[test]
    fn update_request_uses_provider_field_names() {
        let start = Timestamp::from_datetime(Utc.with_ymd_and_hms(2024, 2, 10, 12, 0, 0).unwrap());
        let request = UpdateRequest {
            id: "sc_1",
            start_date: start.to_rfc3339(),
            interval: "Month",
            period: 3,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["Id"], "sc_1");
        assert_eq!(json["StartDate"], "2024-02-10T12:00:00Z");
        assert_eq!(json["Interval"], "Month");
        assert_eq!(json["Period"], 3);
    }

    #[test]
    fn response_with_null_model_parses() {
        let parsed: ApiResponse<SubscriptionModel> =
            serde_json::from_str(r#"{"Model":null,"Success":true,"Message":null}"#).unwrap();
        assert!(parsed.success);
        assert_eq!(parsed.model.status, "");
    }

    #[test]
    fn response_status_is_read_from_model() {
        let parsed: ApiResponse<SubscriptionModel> = serde_json::from_str(
            r#"{"Model":{"Id":"sc_1","Status":"PastDue"},"Success":true}"#,
        )
        .unwrap();
        assert_eq!(
            SubscriptionStatus::from_provider(&parsed.model.status),
            SubscriptionStatus::PastDue
        );
    }

    #[test]
    fn long_bodies_are_cut() {
        let body = "x".repeat(2000);
        let quoted = quote(&body);
        assert_eq!(quoted.chars().count(), MAX_QUOTED_BODY + 1);
        assert!(quoted.ends_with('…'));
    }

    #[tokio::test]
    async fn zero_period_is_rejected_without_a_request() {
        let client = CloudPaymentsClient::new("pk", "secret").with_base_url("http://127.0.0.1:1");
        let update = ScheduleUpdate::monthly(SubscriptionId::parse("sc_1").unwrap(), Timestamp::now(), 0);
        let err = client.update_schedule(&update).await.unwrap_err();
        assert_eq!(err.code, crate::ports::ProviderErrorCode::Rejected);
    }

    #[test]
    fn response_without_model_parses() {
        let parsed: ApiResponse<SubscriptionModel> =
            serde_json::from_str(r#"{"Success":false,"Message":"Subscription not found"}"#).unwrap();
        assert!(!parsed.success);
        assert_eq!(parsed.message.as_deref(), Some("Subscription not found"));
    }

    #[tokio::test]
    async fn slow_api_times_out_as_network_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _server = tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let client = CloudPaymentsClient::new("pk", "secret")
            .with_base_url(format!("http://{}", addr))
            .with_timeout(Duration::from_millis(200));
        let started = std::time::Instant::now();
        let err = client
            .cancel_schedule(&SubscriptionId::parse("sc_1").unwrap())
            .await
            .unwrap_err();

        assert!(err.is_retryable());
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn unreachable_host_is_a_network_error() {
        let client = CloudPaymentsClient::new("pk", "secret").with_base_url("http://127.0.0.1:1");
        let err = client
            .cancel_schedule(&SubscriptionId::parse("sc_1").unwrap())
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }
}
