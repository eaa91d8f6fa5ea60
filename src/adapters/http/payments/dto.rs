//! HTTP DTOs for the payments endpoints.
//!
//! Webhook bodies arrive as `application/x-www-form-urlencoded`. They are
//! decoded from the raw bytes (the CloudPayments signature covers the raw
//! body) into [`FormFields`] and then read field by field.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Decoded urlencoded form. Missing fields read as empty strings.
#[derive(Debug, Clone, Default)]
pub struct FormFields(HashMap<String, String>);

impl FormFields {
    /// Decodes a urlencoded body. Repeated keys keep the first value.
    pub fn parse(body: &[u8]) -> Self {
        let mut fields = HashMap::new();
        for (key, value) in url::form_urlencoded::parse(body).into_owned() {
            fields.entry(key).or_insert(value);
        }
        Self(fields)
    }

    /// Trimmed value of `name`, or "" when absent.
    pub fn get(&self, name: &str) -> &str {
        self.0.get(name).map(|v| v.trim()).unwrap_or("")
    }
}

/// Query parameters of the user lookups.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserLookupParams {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub project_id: String,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Acknowledgement expected by the one-time payment widget.
#[derive(Debug, Clone, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

/// Acknowledgement expected by CloudPayments. `code = 0` accepts the notification.
#[derive(Debug, Clone, Serialize)]
pub struct CloudPaymentsAck {
    pub code: i32,
}

impl CloudPaymentsAck {
    pub fn accepted() -> Self {
        Self { code: 0 }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Error body.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}
