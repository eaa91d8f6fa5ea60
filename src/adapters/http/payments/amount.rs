//! Lenient money parsing for provider form fields.
//!
//! Providers and checkout widgets format amounts inconsistently: "2290.00",
//! "2 290,00", "1,234.56", "(12.00)". The last separator followed by one or
//! two digits is taken as the decimal point; every other separator groups
//! thousands.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,

    #[error("amount '{0}' is not a number")]
    Invalid(String),
}

/// Parses a human-formatted amount.
pub fn parse_amount(raw: &str) -> Result<f64, AmountError> {
    let mut s = raw.trim();
    if s.is_empty() {
        return Err(AmountError::Empty);
    }

    let mut negative = false;
    if s.starts_with('(') && s.ends_with(')') && s.len() >= 2 {
        negative = true;
        s = s[1..s.len() - 1].trim();
    }
    if s.contains('-') {
        negative = true;
    }

    let kept: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();
    if kept.is_empty() {
        return Err(AmountError::Invalid(raw.to_string()));
    }

    let normalized = match (kept.rfind('.'), kept.rfind(',')) {
        (Some(dot), Some(comma)) if dot > comma => kept.replace(',', ""),
        (Some(_), Some(_)) => decimal_at_last(&kept.replace('.', ""), ','),
        (None, Some(comma)) => {
            let after = kept.len() - comma - 1;
            if (1..=2).contains(&after) {
                decimal_at_last(&kept, ',')
            } else {
                kept.replace(',', "")
            }
        }
        (Some(dot), None) => {
            let after = kept.len() - dot - 1;
            let dots = kept.matches('.').count();
            if dots == 1 && after == 3 && dot > 0 {
                kept.replace('.', "")
            } else if dots > 1 && (1..=2).contains(&after) {
                decimal_at_last(&kept, '.')
            } else if dots > 1 {
                kept.replace('.', "")
            } else {
                kept
            }
        }
        (None, None) => kept,
    };

    let value: f64 = normalized
        .parse()
        .map_err(|_| AmountError::Invalid(raw.to_string()))?;
    Ok(if negative { -value } else { value })
}

/// Drops every `sep` except the last, which becomes the decimal point.
fn decimal_at_last(s: &str, sep: char) -> String {
    let Some(last) = s.rfind(sep) else {
        return s.to_string();
    };
    let (int_part, frac_part) = s.split_at(last);
    let int_part: String = int_part.chars().filter(|c| *c != sep).collect();
    format!("{}.{}", int_part, &frac_part[sep.len_utf8()..])
}
