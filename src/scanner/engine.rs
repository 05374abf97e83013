//! Risk aggregation
//!
//! Runs every registered scanner concurrently, each under its own time
//! bound, and combines the verdicts:
//!
//! - score is the maximum contribution
//! - reasons keep scanner registration order, `["Clean"]` when there are none
//! - a contribution of 1.0 ends the evaluation early
//! - the fallback scanner only runs when everything else scored zero

use super::{
    FirewallScanner, CommandPolicyEngine, InjectionScanner, KeywordFallbackScanner,
    RemoteBrainScanner, ScanError, ScannerAdapter, SecretDetector, SecretsScanner,
    TopicClassifier, TopicScanner, Verdict,
};
use crate::config::ScannersConfig;
use crate::error::Result;
use futures::stream::{FuturesUnordered, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Scores at or above this are blocked
pub const BLOCK_THRESHOLD: f64 = 0.5;

/// Reason reported when nothing fired
pub const CLEAN_REASON: &str = "Clean";

/// Aggregated result of one evaluation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanOutcome {
    pub score: f64,
    pub blocked: bool,
    pub reasons: Vec<String>,
}

impl ScanOutcome {
    fn from_verdicts(verdicts: impl IntoIterator<Item = Verdict>) -> Self {
        let mut score: f64 = 0.0;
        let mut reasons = Vec::new();
        for verdict in verdicts {
            score = score.max(verdict.score);
            reasons.extend(verdict.reason);
        }
        if reasons.is_empty() && score == 0.0 {
            reasons.push(CLEAN_REASON.to_string());
        }
        Self {
            score,
            blocked: score >= BLOCK_THRESHOLD,
            reasons,
        }
    }

    /// Reasons joined for block messages
    pub fn details(&self) -> String {
        self.reasons.join(" | ")
    }
}

/// Risk aggregation engine
pub struct RiskEngine {
    scanners: Vec<Arc<dyn ScannerAdapter>>,
    fallback: Option<Arc<dyn ScannerAdapter>>,
    timeout: Duration,
}

impl RiskEngine {
    /// Empty engine with a default per-scanner time bound
    pub fn new(timeout: Duration) -> Self {
        Self {
            scanners: Vec::new(),
            fallback: None,
            timeout,
        }
    }

    /// Register a scanner. Registration order is reason order.
    pub fn with_scanner(mut self, scanner: Arc<dyn ScannerAdapter>) -> Self {
        self.scanners.push(scanner);
        self
    }

    /// Set the scanner consulted only when all others contribute zero
    pub fn with_fallback(mut self, scanner: Arc<dyn ScannerAdapter>) -> Self {
        self.fallback = Some(scanner);
        self
    }

    /// Build the standard scanner set
    pub fn from_config(config: &ScannersConfig) -> Result<Self> {
        let mut engine = Self::new(Duration::from_secs(config.timeout_secs))
            .with_scanner(Arc::new(InjectionScanner::default()))
            .with_scanner(Arc::new(SecretsScanner::new(Arc::new(SecretDetector::new()?))))
            .with_scanner(Arc::new(TopicScanner::new(Arc::new(TopicClassifier::new(
                &config.banned_topics,
            )?))))
            .with_scanner(Arc::new(FirewallScanner::new(Arc::new(
                CommandPolicyEngine::new(config.dangerous_commands.clone()),
            ))));

        if let Some(brain) = RemoteBrainScanner::from_config(&config.remote_brain)? {
            engine = engine.with_scanner(Arc::new(brain));
        }

        let engine = engine.with_fallback(Arc::new(KeywordFallbackScanner::new(
            &config.fallback_keywords,
        )));

        tracing::info!(scanners = ?engine.scanner_names(), "Risk engine ready");
        Ok(engine)
    }

    /// Names of the registered scanners, fallback last
    pub fn scanner_names(&self) -> Vec<&str> {
        self.scanners
            .iter()
            .chain(self.fallback.iter())
            .map(|s| s.name())
            .collect()
    }

    /// Score a piece of text
    pub async fn evaluate(&self, text: &str) -> ScanOutcome {
        let mut slots: Vec<Option<Verdict>> = vec![None; self.scanners.len()];

        let mut pending = self
            .scanners
            .iter()
            .enumerate()
            .map(|(idx, scanner)| {
                let limit = scanner.timeout().unwrap_or(self.timeout);
                async move { (idx, run_scanner(scanner.as_ref(), text, limit).await) }
            })
            .collect::<FuturesUnordered<_>>();

        while let Some((idx, verdict)) = pending.next().await {
            let decisive = verdict.score >= 1.0;
            if decisive {
                tracing::debug!(
                    scanner = self.scanners[idx].name(),
                    "Decisive verdict, skipping remaining scanners"
                );
            }
            slots[idx] = Some(verdict);
            if decisive {
                break;
            }
        }
        drop(pending);

        let mut verdicts: Vec<Verdict> = slots.into_iter().flatten().collect();

        let all_zero = verdicts.iter().all(|v| v.score == 0.0);
        if all_zero {
            if let Some(fallback) = &self.fallback {
                let limit = fallback.timeout().unwrap_or(self.timeout);
                verdicts.push(run_scanner(fallback.as_ref(), text, limit).await);
            }
        }

        let outcome = ScanOutcome::from_verdicts(verdicts);
        if outcome.blocked {
            tracing::warn!(score = outcome.score, reasons = %outcome.details(), "Request flagged");
        } else {
            tracing::debug!(score = outcome.score, "Request passed risk evaluation");
        }
        outcome
    }
}

async fn run_scanner(scanner: &dyn ScannerAdapter, text: &str, limit: Duration) -> Verdict {
    let result = match tokio::time::timeout(limit, scanner.scan(text)).await {
        Ok(result) => result,
        Err(_) => Err(ScanError::Timeout(limit)),
    };

    match result {
        Ok(mut verdict) => {
            verdict.score = verdict.score.clamp(0.0, 1.0);
            verdict
        }
        Err(e) => {
            let verdict = scanner.failure_verdict(&e);
            tracing::warn!(
                scanner = scanner.name(),
                error = %e,
                contribution = verdict.score,
                "Scanner failed"
            );
            verdict
        }
    }
}
