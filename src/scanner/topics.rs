//! Banned topic scanner

use super::{Classification, ScanError, ScannerAdapter, TextClassifier, Verdict};
use crate::error::{Error, Result};
use async_trait::async_trait;
use regex::Regex;
use std::sync::Arc;

/// Score contributed when a banned topic is found
pub const TOPIC_SCORE: f64 = 0.7;

/// Whole-word, case-insensitive topic matcher
pub struct TopicClassifier {
    pattern: Option<Regex>,
}

impl TopicClassifier {
    pub fn new(topics: &[String]) -> Result<Self> {
        let words: Vec<String> = topics
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .map(regex::escape)
            .collect();

        if words.is_empty() {
            return Ok(Self { pattern: None });
        }

        let pattern = Regex::new(&format!(r"(?i)\b(?:{})\b", words.join("|")))
            .map_err(|e| Error::Config(format!("Invalid banned topic list: {}", e)))?;
        Ok(Self {
            pattern: Some(pattern),
        })
    }

    /// First banned topic mentioned, if any
    pub fn find<'a>(&self, text: &'a str) -> Option<&'a str> {
        self.pattern
            .as_ref()
            .and_then(|re| re.find(text))
            .map(|m| m.as_str())
    }
}

#[async_trait]
impl TextClassifier for TopicClassifier {
    async fn classify(&self, text: &str) -> std::result::Result<Classification, ScanError> {
        match self.find(text) {
            Some(topic) => {
                tracing::debug!(topic = topic, "Banned topic matched");
                Ok(Classification {
                    matched: true,
                    score: 1.0,
                })
            }
            None => Ok(Classification::none()),
        }
    }
}

/// Adapter reporting a fixed score on any banned topic
pub struct TopicScanner {
    classifier: Arc<dyn TextClassifier>,
}

impl TopicScanner {
    pub fn new(classifier: Arc<dyn TextClassifier>) -> Self {
        Self { classifier }
    }
}

#[async_trait]
impl ScannerAdapter for TopicScanner {
    fn name(&self) -> &str {
        "banned_topics"
    }

    async fn scan(&self, text: &str) -> std::result::Result<Verdict, ScanError> {
        if self.classifier.classify(text).await?.matched {
            Ok(Verdict::flagged(TOPIC_SCORE, "Banned Topic Detected"))
        } else {
            Ok(Verdict::clean())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topics() -> Vec<String> {
        ["hack", "exploit", "bypass", "malware"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn test_whole_word_match() {
        let c = TopicClassifier::new(&topics()).unwrap();
        assert_eq!(c.find("how do I HACK the router"), Some("HACK"));
        assert_eq!(c.find("write some malware"), Some("malware"));
        assert_eq!(c.find("a hackathon schedule"), None);
        assert_eq!(c.find("shacks by the sea"), None);
    }

    #[test]
    fn test_empty_list_matches_nothing() {
        let c = TopicClassifier::new(&[]).unwrap();
        assert_eq!(c.find("hack"), None);
    }

    #[tokio::test]
    async fn test_scanner_fixed_score() {
        let scanner = TopicScanner::new(Arc::new(TopicClassifier::new(&topics()).unwrap()));
        let verdict = scanner.scan("find an exploit for this").await.unwrap();
        assert_eq!(verdict, Verdict::flagged(0.7, "Banned Topic Detected"));
        let verdict = scanner.scan("summarize the docs").await.unwrap();
        assert_eq!(verdict, Verdict::clean());
    }
}
