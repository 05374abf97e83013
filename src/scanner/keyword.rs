//! Last-resort keyword scanner, consulted only when every other scanner
//! came back clean.

use super::{ScanError, ScannerAdapter, Verdict};
use async_trait::async_trait;

/// Score contributed on a keyword hit
pub const FALLBACK_SCORE: f64 = 0.9;

pub struct KeywordFallbackScanner {
    phrases: Vec<String>,
}

impl KeywordFallbackScanner {
    pub fn new(phrases: &[String]) -> Self {
        Self {
            phrases: phrases
                .iter()
                .map(|p| p.trim().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }
}

#[async_trait]
impl ScannerAdapter for KeywordFallbackScanner {
    fn name(&self) -> &str {
        "keyword_fallback"
    }

    async fn scan(&self, text: &str) -> Result<Verdict, ScanError> {
        let lower = text.to_lowercase();
        if self.phrases.iter().any(|p| lower.contains(p.as_str())) {
            Ok(Verdict::flagged(FALLBACK_SCORE, "Fallback Keyword Match"))
        } else {
            Ok(Verdict::clean())
        }
    }
}
