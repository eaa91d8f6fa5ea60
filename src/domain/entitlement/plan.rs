//! Canonical plan identifiers.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::domain::foundation::ValidationError;

/// Canonical plan an entitlement is held under.
///
/// Stored as its [`Plan::as_str`] code. Legacy rows that still carry the
/// human-readable label are accepted by [`FromStr`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Plan {
    /// Granted manually; never expires.
    #[serde(rename = "unlimited")]
    Unlimited,

    /// Self-service trial, no recurring schedule.
    #[serde(rename = "trial")]
    Trial,

    #[serde(rename = "1-month")]
    OneMonth,

    #[serde(rename = "3-month")]
    ThreeMonths,

    #[serde(rename = "6-month")]
    SixMonths,
}

impl Plan {
    /// Storage code of the plan.
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Unlimited => "unlimited",
            Plan::Trial => "trial",
            Plan::OneMonth => "1-month",
            Plan::ThreeMonths => "3-month",
            Plan::SixMonths => "6-month",
        }
    }

    /// Label shown to operators in admin notices.
    pub fn display_name(&self) -> &'static str {
        match self {
            Plan::Unlimited => "Бессрочный",
            Plan::Trial => "Пробный период",
            Plan::OneMonth => "1 месяц",
            Plan::ThreeMonths => "3 месяца",
            Plan::SixMonths => "6 месяцев",
        }
    }

    /// Returns true for plans that are bought rather than granted.
    pub fn is_paid(&self) -> bool {
        matches!(self, Plan::OneMonth | Plan::ThreeMonths | Plan::SixMonths)
    }

    /// Returns true if the plan never expires.
    pub fn is_unlimited(&self) -> bool {
        matches!(self, Plan::Unlimited)
    }
}

impl std::fmt::Display for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Plan {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let all = [
            Plan::Unlimited,
            Plan::Trial,
            Plan::OneMonth,
            Plan::ThreeMonths,
            Plan::SixMonths,
        ];
        let needle = s.trim();
        all.into_iter()
            .find(|p| p.as_str() == needle || p.display_name() == needle)
            .ok_or_else(|| ValidationError::invalid_format("plan", format!("unknown plan '{}'", s)))
    }
}
