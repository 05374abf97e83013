//! Pattern-based sensitive data detection and redaction

use super::types::{Finding, FindingKind, ScreenResult};
use crate::error::{Error, Result};
use regex::Regex;

/// Reason reported when a transfer instruction is found
pub const TRANSFER_BLOCK_REASON: &str = "Unauthorized transfer request detected";

const CREDIT_CARD_PATTERN: &str = r"\b(?:\d[ -]*?){13,16}\b";
const SSN_PATTERN: &str = r"\b\d{3}[-.\s]?\d{2}[-.\s]?\d{4}\b";
const EMAIL_PATTERN: &str = r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Z|a-z]{2,}\b";
const PHONE_PATTERN: &str = r"\b(?:\+?1[-.\s]?)?\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}\b";
const TRANSFER_PATTERN: &str =
    r"(?i)(?:send|transfer|wire)\s+\$[\d,]+(?:\.\d{2})?\s+to\s+[A-Za-z0-9]+";

/// Sensitive data interceptor
pub struct Interceptor {
    rules: Vec<CompiledRule>,
}

struct CompiledRule {
    kind: FindingKind,
    pattern: Regex,
}

impl Interceptor {
    /// Compile the built-in rule set
    pub fn new() -> Result<Self> {
        let rules = [
            (FindingKind::CreditCard, CREDIT_CARD_PATTERN),
            (FindingKind::Ssn, SSN_PATTERN),
            (FindingKind::Email, EMAIL_PATTERN),
            (FindingKind::Phone, PHONE_PATTERN),
            (FindingKind::Transfer, TRANSFER_PATTERN),
        ]
        .into_iter()
        .map(|(kind, pattern)| {
            let pattern = Regex::new(pattern).map_err(|e| {
                Error::Config(format!("Invalid interceptor pattern for {}: {}", kind, e))
            })?;
            Ok(CompiledRule { kind, pattern })
        })
        .collect::<Result<Vec<_>>>()?;

        Ok(Self { rules })
    }

    /// Find every sensitive match, grouped by rule in rule order
    pub fn detect(&self, text: &str) -> Vec<Finding> {
        let mut findings = Vec::new();

        for rule in &self.rules {
            for mat in rule.pattern.find_iter(text) {
                let matched = mat.as_str();
                if rule.kind == FindingKind::CreditCard
                    && matched.chars().filter(|c| c.is_ascii_digit()).count() < 13
                {
                    continue;
                }

                findings.push(Finding {
                    kind: rule.kind,
                    masked_value: mask(rule.kind, matched),
                    start: mat.start(),
                    end: mat.end(),
                });
            }
        }

        findings
    }

    /// Replace every sensitive span with its kind marker
    pub fn redact(&self, text: &str) -> String {
        redact_spans(text, self.detect(text))
    }

    /// Screen text before it leaves the gateway.
    ///
    /// A transfer instruction blocks the text outright and nothing is
    /// redacted; otherwise all other findings are redacted and the text is
    /// allowed through.
    pub fn screen(&self, text: &str) -> ScreenResult {
        let findings = self.detect(text);

        if findings.iter().any(|f| f.kind == FindingKind::Transfer) {
            tracing::warn!(
                findings = findings.len(),
                "Interceptor blocked unauthorized transfer request"
            );
            return ScreenResult {
                allowed: false,
                redacted: String::new(),
                findings,
                reason: Some(TRANSFER_BLOCK_REASON.to_string()),
            };
        }

        if !findings.is_empty() {
            tracing::info!(
                findings = findings.len(),
                "Interceptor redacted sensitive data"
            );
        }

        let redacted = redact_spans(text, findings.clone());
        ScreenResult {
            allowed: true,
            redacted,
            findings,
            reason: None,
        }
    }
}

/// Splice markers over the findings' spans.
///
/// Overlapping spans keep the earliest-starting, then longest, match.
fn redact_spans(text: &str, mut findings: Vec<Finding>) -> String {
    findings.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

    let mut kept: Vec<Finding> = Vec::with_capacity(findings.len());
    for finding in findings {
        if let Some(last) = kept.last() {
            if finding.start < last.end {
                continue;
            }
        }
        kept.push(finding);
    }

    let mut result = text.to_string();
    for finding in kept.iter().rev() {
        result.replace_range(finding.start..finding.end, finding.kind.marker());
    }
    result
}

/// Mask a matched value for display
fn mask(kind: FindingKind, text: &str) -> String {
    match kind {
        FindingKind::CreditCard => format!("{}***{}", head(text, 6), tail(text, 4)),
        FindingKind::Ssn => format!("***-**-{}", tail(text, 4)),
        FindingKind::Email => match text.split_once('@') {
            Some((local, domain)) => format!("{}***@{}", head(local, 2), domain),
            None => "[REDACTED]".to_string(),
        },
        FindingKind::Phone => format!("***-***-{}", tail(text, 4)),
        FindingKind::Transfer => text.to_string(),
    }
}

fn head(text: &str, n: usize) -> &str {
    match text.char_indices().nth(n) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn tail(text: &str, n: usize) -> &str {
    let count = text.chars().count();
    if count <= n {
        return text;
    }
    match text.char_indices().nth(count - n) {
        Some((idx, _)) => &text[idx..],
        None => text,
    }
}
