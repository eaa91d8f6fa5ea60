//! Tariff resolution from provider-supplied product names.
//!
//! Checkout pages and billing providers echo back whatever product title the
//! page was configured with. Each purchasable plan accepts a fixed set of
//! spellings ("initial access" and "renewal" wording); anything else is an
//! unknown tariff that callers report and skip.

use once_cell::sync::Lazy;
use std::collections::HashMap;

use super::Plan;

/// A purchasable plan together with its billing interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tariff {
    pub plan: Plan,
    pub interval_months: u32,
}

impl Tariff {
    const fn new(plan: Plan, interval_months: u32) -> Self {
        Self { plan, interval_months }
    }
}

const ONE_MONTH: Tariff = Tariff::new(Plan::OneMonth, 1);
const THREE_MONTHS: Tariff = Tariff::new(Plan::ThreeMonths, 3);
const SIX_MONTHS: Tariff = Tariff::new(Plan::SixMonths, 6);

static ALIASES: Lazy<HashMap<&'static str, Tariff>> = Lazy::new(|| {
    let table: [(&[&str], Tariff); 3] = [
        (&["доступ на месяц", "продление 1 месяц", "1-month"], ONE_MONTH),
        (&["доступ на 3 месяца", "продление 3 месяца", "3-month"], THREE_MONTHS),
        (&["доступ на 6 месяцев", "продление 6 месяцев", "6-month"], SIX_MONTHS),
    ];
    table
        .iter()
        .flat_map(|(names, tariff)| names.iter().map(move |name| (*name, *tariff)))
        .collect()
});

/// Maps free-text plan names to tariffs.
pub struct TariffResolver;

impl TariffResolver {
    /// Resolves a product name.
    ///
    /// Returns `None` for unknown names; that is an expected outcome, not an error.
    pub fn resolve(text: &str) -> Option<Tariff> {
        let normalized = text.trim().to_lowercase();
        ALIASES.get(normalized.as_str()).copied()
    }
}
