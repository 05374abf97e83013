//! External firewall scanner
//!
//! Wraps a [`PolicyEngine`]. The built-in engine blocks well-known
//! destructive shell commands.

use super::{format_score, PolicyDecision, PolicyEngine, ScanError, ScannerAdapter, Verdict};
use async_trait::async_trait;
use std::sync::Arc;

/// Command fragments the built-in engine refuses
pub fn default_dangerous_commands() -> Vec<String> {
    vec![
        "rm -rf".to_string(),
        "dd if=".to_string(),
        "mkfs".to_string(),
        ":(){ :|:& };:".to_string(),
        "chmod -r 777 /".to_string(),
    ]
}

/// Blocks text containing a dangerous command fragment
#[derive(Debug, Clone)]
pub struct CommandPolicyEngine {
    blocked: Vec<String>,
}

impl Default for CommandPolicyEngine {
    fn default() -> Self {
        Self::new(default_dangerous_commands())
    }
}

impl CommandPolicyEngine {
    pub fn new(blocked: Vec<String>) -> Self {
        Self {
            blocked: blocked.into_iter().map(|c| c.to_lowercase()).collect(),
        }
    }
}

#[async_trait]
impl PolicyEngine for CommandPolicyEngine {
    async fn evaluate(&self, text: &str) -> Result<PolicyDecision, ScanError> {
        let lower = text.to_lowercase();
        match self.blocked.iter().find(|c| lower.contains(c.as_str())) {
            Some(command) => {
                tracing::debug!(command = %command, "Dangerous command matched");
                Ok(PolicyDecision::Block)
            }
            None => Ok(PolicyDecision::Score(0.0)),
        }
    }
}

/// Adapter over an external policy engine
pub struct FirewallScanner {
    engine: Arc<dyn PolicyEngine>,
}

impl FirewallScanner {
    pub fn new(engine: Arc<dyn PolicyEngine>) -> Self {
        Self { engine }
    }
}

impl Default for FirewallScanner {
    fn default() -> Self {
        Self::new(Arc::new(CommandPolicyEngine::default()))
    }
}

#[async_trait]
impl ScannerAdapter for FirewallScanner {
    fn name(&self) -> &str {
        "firewall"
    }

    async fn scan(&self, text: &str) -> Result<Verdict, ScanError> {
        let score = match self.engine.evaluate(text).await? {
            PolicyDecision::Block => 1.0,
            PolicyDecision::Score(s) => s.clamp(0.0, 1.0),
        };

        if score > 0.5 {
            Ok(Verdict::flagged(
                score,
                format!("Firewall flag (score: {})", format_score(score)),
            ))
        } else {
            Ok(Verdict {
                score,
                reason: None,
            })
        }
    }
}
