//! Storage types

use std::time::Duration;

use chrono::{DateTime, Utc};

/// A time-limited read reference to a stored object
///
/// Issued fresh for every request and never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessReference {
    pub url: String,
    pub issued_at: DateTime<Utc>,
    pub expires_in: Duration,
}

impl AccessReference {
    pub fn new(url: impl Into<String>, expires_in: Duration) -> Self {
        Self {
            url: url.into(),
            issued_at: Utc::now(),
            expires_in,
        }
    }

    /// Instant after which the reference stops working
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        chrono::Duration::from_std(self.expires_in)
            .ok()
            .and_then(|d| self.issued_at.checked_add_signed(d))
    }
}

/// Key of a stored report: `<prefix>/<identifier>.pdf`
pub fn report_key(prefix: &str, identifier: &str) -> String {
    if prefix.is_empty() {
        format!("{}.pdf", identifier)
    } else {
        format!("{}/{}.pdf", prefix, identifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_key() {
        assert_eq!(report_key("reports", "080101101234"), "reports/080101101234.pdf");
        assert_eq!(report_key("", "080101101234"), "080101101234.pdf");
    }

    #[test]
    fn test_expires_at() {
        let reference = AccessReference::new("https://example.test/r.pdf", Duration::from_secs(3600));
        let expires_at = reference.expires_at().unwrap();
        assert_eq!((expires_at - reference.issued_at).num_seconds(), 3600);
    }
}
