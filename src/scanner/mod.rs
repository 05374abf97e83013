//! Risk scanners
//!
//! Each scanner wraps one independent detection capability behind the
//! uniform [`ScannerAdapter`] contract. The [`RiskEngine`] runs them
//! concurrently and folds their verdicts into a single [`ScanOutcome`].
//!
//! Failures are explicit: a scanner returns [`ScanError`] and its
//! [`ScannerAdapter::failure_verdict`] decides what the failure contributes.
//! Everything fails open except the remote brain's unparsable reply.

mod brain;
pub mod engine;
mod firewall;
mod injection;
mod keyword;
mod secrets;
mod topics;

pub use brain::RemoteBrainScanner;
pub use engine::{RiskEngine, ScanOutcome};
pub use firewall::{default_dangerous_commands, CommandPolicyEngine, FirewallScanner};
pub use injection::{InjectionClassifier, InjectionScanner};
pub use keyword::KeywordFallbackScanner;
pub use secrets::{SecretDetector, SecretsScanner};
pub use topics::{TopicClassifier, TopicScanner};

use async_trait::async_trait;
use std::time::Duration;

/// Contribution of one scanner to the aggregate score
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    /// Risk score in [0, 1]
    pub score: f64,
    /// Human-readable reason, present only when the scanner flagged the text
    pub reason: Option<String>,
}

impl Verdict {
    /// Nothing found
    pub fn clean() -> Self {
        Self {
            score: 0.0,
            reason: None,
        }
    }

    /// Flagged with a reason
    pub fn flagged(score: f64, reason: impl Into<String>) -> Self {
        Self {
            score,
            reason: Some(reason.into()),
        }
    }
}

/// Why a scanner could not produce a verdict
#[derive(Debug, Clone, thiserror::Error)]
pub enum ScanError {
    #[error("scanner timed out after {0:?}")]
    Timeout(Duration),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected status {0}")]
    Status(u16),

    #[error("unparsable reply: {0:?}")]
    Unparsable(String),

    #[error("scanner error: {0}")]
    Internal(String),
}

/// A detection capability returning a match and a confidence
#[async_trait]
pub trait TextClassifier: Send + Sync {
    async fn classify(&self, text: &str) -> Result<Classification, ScanError>;
}

/// Result of a [`TextClassifier`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub matched: bool,
    pub score: f64,
}

impl Classification {
    pub fn none() -> Self {
        Self {
            matched: false,
            score: 0.0,
        }
    }
}

/// An external firewall capability
#[async_trait]
pub trait PolicyEngine: Send + Sync {
    async fn evaluate(&self, text: &str) -> Result<PolicyDecision, ScanError>;
}

/// Decision returned by a [`PolicyEngine`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PolicyDecision {
    /// Hard block, contributes 1.0
    Block,
    /// Risk score in [0, 1]
    Score(f64),
}

/// Uniform scanner contract used by the risk engine
#[async_trait]
pub trait ScannerAdapter: Send + Sync {
    /// Scanner name for logs
    fn name(&self) -> &str;

    /// Score the text
    async fn scan(&self, text: &str) -> Result<Verdict, ScanError>;

    /// Time bound for one scan; None uses the engine default
    fn timeout(&self) -> Option<Duration> {
        None
    }

    /// What a failure contributes. Fails open by default.
    fn failure_verdict(&self, _error: &ScanError) -> Verdict {
        Verdict::clean()
    }
}

/// Format a score the way block reasons report it
pub(crate) fn format_score(score: f64) -> String {
    format!("{:.2}", score)
}
