//! Normalized customer email, the business key of an entitlement.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::ValidationError;

/// Trimmed, lower-cased email address.
///
/// Two spellings of the same address always produce equal values, so this
/// type is safe to use as a lock key and a uniqueness key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    /// Normalizes and validates a raw address.
    ///
    /// # Errors
    ///
    /// - `EmptyField` if nothing remains after trimming
    /// - `InvalidFormat` if the address has no `@` separating two non-empty parts
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let normalized = raw.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(ValidationError::empty_field("email"));
        }
        match normalized.split_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {
                Ok(Self(normalized))
            }
            _ => Err(ValidationError::invalid_format(
                "email",
                format!("'{}' is not an email address", raw.trim()),
            )),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Email {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_and_lowercases() {
        let email = Email::parse("  Alice@Example.COM \n").unwrap();
        assert_eq!(email.as_str(), "alice@example.com");
    }

    #[test]
    fn different_spellings_are_equal() {
        assert_eq!(
            Email::parse("A@X.com").unwrap(),
            Email::parse(" a@x.COM").unwrap()
        );
    }

    #[test]
    fn rejects_blank() {
        assert_eq!(
            Email::parse("   "),
            Err(ValidationError::empty_field("email"))
        );
    }

    #[test]
    fn rejects_missing_at() {
        assert!(Email::parse("alice.example.com").is_err());
        assert!(Email::parse("@example.com").is_err());
        assert!(Email::parse("alice@").is_err());
    }
}
