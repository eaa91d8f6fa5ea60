//! UniSender mailing-list adapter.
//!
//! Lists are addressed by title. Each call looks the title up via `getLists`
//! (case-insensitive, whitespace-trimmed) and then acts on the list id.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::adapters::{http_client, DEFAULT_HTTP_TIMEOUT};
use crate::config::UniSenderConfig;
use crate::domain::entitlement::Email;
use crate::ports::{MailingList, MailingListError};

const DEFAULT_BASE_URL: &str = "https://api.unisender.com/ru/api";

/// Contacts added through the API count as already confirmed.
const DOUBLE_OPTIN_CONFIRMED: &str = "3";

/// Existing contact fields are left untouched.
const DO_NOT_OVERWRITE: &str = "0";

/// UniSender API client.
pub struct UniSenderClient {
    api_key: SecretString,
    base_url: String,
    http_client: reqwest::Client,
}

impl UniSenderClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key.into()),
            base_url: DEFAULT_BASE_URL.to_string(),
            http_client: http_client(DEFAULT_HTTP_TIMEOUT),
        }
    }

    pub fn from_config(config: &UniSenderConfig) -> Self {
        Self::new(config.api_key.clone())
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
        self.base_url = url.into().trim().trim_end_matches('/').to_string();
        self
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: &[(&str, &str)],
    ) -> Result<T, MailingListError> {
        let url = format!("{}/{}", self.base_url, method);
        let mut form: Vec<(&str, &str)> = vec![
            ("format", "json"),
            ("api_key", self.api_key.expose_secret().as_str()),
        ];
        form.extend_from_slice(params);

        let response = self
            .http_client
            .post(&url)
            .form(&form)
            .send()
            .await
            .map_err(|e| MailingListError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(method, status = status.as_u16(), "UniSender request failed");
            return Err(MailingListError::Transport(format!("{}: {}", status, body.trim())));
        }

        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| MailingListError::Api(format!("failed to decode {} response: {}", method, e)))?;

        if let Some(error) = envelope.error {
            tracing::warn!(method, error = %error, code = ?envelope.code, "UniSender returned an error");
            return Err(MailingListError::Api(error));
        }

        envelope
            .result
            .ok_or_else(|| MailingListError::Api(format!("{} returned no result", method)))
    }

    async fn list_id(&self, title: &str) -> Result<String, MailingListError> {
        let lists: Vec<ListSummary> = self.call("getLists", &[]).await?;
        find_list(&lists, title)
            .map(|l| l.id.to_string())
            .ok_or_else(|| MailingListError::ListNotFound(title.to_string()))
    }
}

#[async_trait]
impl MailingList for UniSenderClient {
    async fn subscribe(&self, email: &Email, list: &str) -> Result<(), MailingListError> {
        let list_id = self.list_id(list).await?;
        let _: serde_json::Value = self
            .call(
                "subscribe",
                &[
                    ("list_ids", list_id.as_str()),
                    ("fields[email]", email.as_str()),
                    ("double_optin", DOUBLE_OPTIN_CONFIRMED),
                    ("overwrite", DO_NOT_OVERWRITE),
                ],
            )
            .await?;
        tracing::debug!(list, "Subscribed contact to mailing list");
        Ok(())
    }

    async fn unsubscribe(&self, email: &Email, list: &str) -> Result<(), MailingListError> {
        let list_id = self.list_id(list).await?;
        let _: serde_json::Value = self
            .call(
                "exclude",
                &[
                    ("contact_type", "email"),
                    ("contact", email.as_str()),
                    ("list_ids", list_id.as_str()),
                ],
            )
            .await?;
        tracing::debug!(list, "Excluded contact from mailing list");
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    result: Option<T>,
    error: Option<String>,
    code: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ListSummary {
    id: i64,
    title: String,
}

fn find_list<'a>(lists: &'a [ListSummary], title: &str) -> Option<&'a ListSummary> {
    let wanted = title.trim().to_lowercase();
    lists
        .iter()
        .find(|l| l.title.trim().to_lowercase() == wanted)
}
