//! Interceptor result types

use serde::{Deserialize, Serialize};

/// Kind of sensitive data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FindingKind {
    CreditCard,
    Ssn,
    Email,
    Phone,
    #[serde(rename = "UNAUTHORIZED_TRANSFER")]
    Transfer,
}

impl FindingKind {
    /// Marker substituted for a redacted span of this kind
    pub fn marker(&self) -> &'static str {
        match self {
            Self::CreditCard => "[REDACTED]_CC",
            Self::Ssn => "[REDACTED]_SSN",
            Self::Email => "[REDACTED]_EMAIL",
            Self::Phone => "[REDACTED]_PHONE",
            Self::Transfer => "[REDACTED]_TRANSFER",
        }
    }
}

impl std::fmt::Display for FindingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CreditCard => write!(f, "credit_card"),
            Self::Ssn => write!(f, "ssn"),
            Self::Email => write!(f, "email"),
            Self::Phone => write!(f, "phone"),
            Self::Transfer => write!(f, "transfer"),
        }
    }
}

/// A single sensitive-data match
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    #[serde(rename = "type")]
    pub kind: FindingKind,
    /// Masked representation; the raw text is never kept
    pub masked_value: String,
    /// Byte offset where the match starts
    #[serde(skip)]
    pub start: usize,
    /// Byte offset where the match ends
    #[serde(skip)]
    pub end: usize,
}

/// Outcome of screening a piece of text
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenResult {
    /// False when the text must not be forwarded at all
    pub allowed: bool,
    /// Text with sensitive spans replaced (empty when blocked)
    pub redacted: String,
    /// Everything detected, in rule order
    pub findings: Vec<Finding>,
    /// Why the text was blocked
    pub reason: Option<String>,
}

impl ScreenResult {
    /// Number of findings of the given kind
    pub fn count(&self, kind: FindingKind) -> usize {
        self.findings.iter().filter(|f| f.kind == kind).count()
    }
}
