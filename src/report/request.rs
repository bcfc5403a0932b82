//! Request body validation

use std::fmt;

use serde_json::{Number, Value};

use crate::error::{ReportError, MSG_INVALID_JSON, MSG_MISSING_IDENTIFIER};

/// Field of the JSON body carrying the student's IC number
pub const IDENTIFIER_FIELD: &str = "idCardNumber";

/// A trimmed, non-empty student IC number
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier(String);

impl Identifier {
    /// Normalize a raw identifier, rejecting blank input
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Extract the identifier from a raw request body
///
/// Numbers are accepted and used in their decimal form, since some callers
/// send IC numbers unquoted.
pub fn parse_identifier(body: &[u8]) -> Result<Identifier, ReportError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ReportError::InvalidRequest(MSG_MISSING_IDENTIFIER));
    }

    let value: Value = serde_json::from_slice(body)
        .map_err(|_| ReportError::InvalidRequest(MSG_INVALID_JSON))?;

    let raw = match value.get(IDENTIFIER_FIELD) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => number_text(n),
        _ => return Err(ReportError::InvalidRequest(MSG_MISSING_IDENTIFIER)),
    };

    Identifier::parse(&raw).ok_or(ReportError::InvalidRequest(MSG_MISSING_IDENTIFIER))
}

/// Decimal form of a JSON number, without a trailing `.0` on whole floats
fn number_text(n: &Number) -> String {
    if let Some(v) = n.as_u64() {
        return v.to_string();
    }
    if let Some(v) = n.as_i64() {
        return v.to_string();
    }
    match n.as_f64() {
        Some(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e21 => format!("{:.0}", v),
        _ => n.to_string(),
    }
}
