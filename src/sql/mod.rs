//! SQL firewall for agent-issued queries
//!
//! Rejects queries that reference a restricted table or use a destructive
//! statement verb. Both lists match whole words, case-insensitively.

use crate::config::SqlConfig;
use crate::error::{Error, Result};
use regex::Regex;
use serde::Serialize;

/// Outcome of checking one query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SqlVerdict {
    pub allowed: bool,
    /// Restricted tables first, then destructive verbs, each in configured order
    pub reasons: Vec<String>,
}

impl SqlVerdict {
    pub fn details(&self) -> String {
        self.reasons.join(" | ")
    }
}

struct WordRule {
    word: String,
    pattern: Regex,
}

impl WordRule {
    fn new(word: &str, display: String) -> Result<Self> {
        let pattern = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(word.trim())))
            .map_err(|e| Error::Config(format!("Invalid SQL firewall rule '{}': {}", word, e)))?;
        Ok(Self {
            word: display,
            pattern,
        })
    }
}

pub struct SqlFirewall {
    tables: Vec<WordRule>,
    verbs: Vec<WordRule>,
}

impl SqlFirewall {
    pub fn new(config: &SqlConfig) -> Result<Self> {
        let tables = config
            .restricted_tables
            .iter()
            .filter(|t| !t.trim().is_empty())
            .map(|t| WordRule::new(t, t.trim().to_string()))
            .collect::<Result<Vec<_>>>()?;
        let verbs = config
            .destructive_verbs
            .iter()
            .filter(|v| !v.trim().is_empty())
            .map(|v| WordRule::new(v, v.trim().to_uppercase()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { tables, verbs })
    }

    pub fn check(&self, query: &str) -> SqlVerdict {
        let table_hits = self
            .tables
            .iter()
            .filter(|rule| rule.pattern.is_match(query))
            .map(|rule| format!("Restricted table access: {}", rule.word));
        let verb_hits = self
            .verbs
            .iter()
            .filter(|rule| rule.pattern.is_match(query))
            .map(|rule| format!("Destructive operation: {}", rule.word));

        let reasons: Vec<String> = table_hits.chain(verb_hits).collect();
        SqlVerdict {
            allowed: reasons.is_empty(),
            reasons,
        }
    }
}
