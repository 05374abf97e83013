//! Bounded audit trail with optional JSON file persistence
//!
//! File layout: a single JSON array of events, oldest first, never longer
//! than the configured capacity.
//!
//! ```text
//! ~/.opensec/audit_log.json
//! [ {"timestamp": ..., "prompt": ..., "score": ..., "decision": ..., "kind": ...}, ... ]
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Gateway decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Allow,
    Block,
}

impl Decision {
    pub fn from_blocked(blocked: bool) -> Self {
        if blocked {
            Decision::Block
        } else {
            Decision::Allow
        }
    }
}

/// Request class that produced an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    #[default]
    Gateway,
    Validate,
    AgentMessage,
    Sql,
    ModelProxy,
}

/// One screened request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    pub timestamp: DateTime<Utc>,
    /// Redacted, length-bounded excerpt of the request
    #[serde(rename = "prompt")]
    pub prompt_excerpt: String,
    pub score: f64,
    pub decision: Decision,
    #[serde(default)]
    pub kind: RequestKind,
}

impl AuditEvent {
    /// Build an event stamped now. The excerpt is cut to `excerpt_chars`
    /// characters and the score rounded to four decimals.
    pub fn new(
        kind: RequestKind,
        prompt: &str,
        score: f64,
        decision: Decision,
        excerpt_chars: usize,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            prompt_excerpt: excerpt(prompt, excerpt_chars),
            score: (score * 10_000.0).round() / 10_000.0,
            decision,
            kind,
        }
    }
}

fn excerpt(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Append-only, size-bounded event log
pub struct AuditLog {
    path: Option<PathBuf>,
    capacity: usize,
    events: Mutex<VecDeque<AuditEvent>>,
}

impl AuditLog {
    /// In-memory log
    pub fn in_memory(capacity: usize) -> Self {
        Self {
            path: None,
            capacity,
            events: Mutex::new(VecDeque::new()),
        }
    }

    /// File-backed log, seeded from the file if it holds a valid trail
    pub async fn open(path: PathBuf, capacity: usize) -> Self {
        let mut events: VecDeque<AuditEvent> = match read_events(&path).await {
            Ok(events) => events.into(),
            Err(e) => {
                if path.exists() {
                    tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable audit log");
                }
                VecDeque::new()
            }
        };
        while events.len() > capacity {
            events.pop_front();
        }

        tracing::info!(path = %path.display(), events = events.len(), "Audit log opened");
        Self {
            path: Some(path),
            capacity,
            events: Mutex::new(events),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Record an event, dropping the oldest beyond capacity.
    ///
    /// File-backed logs reload the file, push, truncate and store while
    /// holding the lock. A corrupt file is replaced by a trail holding only
    /// this event. Write failures are logged, never returned.
    pub async fn append(&self, event: AuditEvent) {
        let mut events = self.events.lock().await;

        let Some(path) = &self.path else {
            events.push_back(event);
            while events.len() > self.capacity {
                events.pop_front();
            }
            return;
        };

        let mut trail: VecDeque<AuditEvent> = match read_events(path).await {
            Ok(existing) => existing.into(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => VecDeque::new(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Audit log corrupt, resetting");
                VecDeque::new()
            }
        };
        trail.push_back(event);
        while trail.len() > self.capacity {
            trail.pop_front();
        }

        if let Err(e) = write_events(path, trail.make_contiguous()).await {
            tracing::error!(path = %path.display(), error = %e, "Failed to persist audit log");
        }
        *events = trail;
    }

    /// All retained events, oldest first.
    ///
    /// File-backed logs are read back from disk; the in-memory view is used
    /// when the file cannot be read.
    pub async fn recent(&self) -> Vec<AuditEvent> {
        let events = self.events.lock().await;
        if let Some(path) = &self.path {
            match read_events(path).await {
                Ok(mut on_disk) => {
                    let excess = on_disk.len().saturating_sub(self.capacity);
                    on_disk.drain(..excess);
                    return on_disk;
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Audit log unreadable, serving memory view");
                }
            }
        }
        events.iter().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.events.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

async fn read_events(path: &Path) -> std::io::Result<Vec<AuditEvent>> {
    let content = tokio::fs::read_to_string(path).await?;
    serde_json::from_str(&content).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

async fn write_events(path: &Path, events: &[AuditEvent]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let json = serde_json::to_string_pretty(events)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    tokio::fs::write(path, json).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn event(n: usize) -> AuditEvent {
        AuditEvent::new(
            RequestKind::Validate,
            &format!("prompt {}", n),
            0.1,
            Decision::Allow,
            200,
        )
    }

    fn prompts(events: &[AuditEvent]) -> Vec<String> {
        events.iter().map(|e| e.prompt_excerpt.clone()).collect()
    }

    fn expected(range: std::ops::Range<usize>) -> Vec<String> {
        range.map(|n| format!("prompt {}", n)).collect()
    }

    #[test]
    fn test_event_rounding_and_excerpt() {
        let e = AuditEvent::new(
            RequestKind::Gateway,
            &"x".repeat(300),
            0.123456,
            Decision::Block,
            200,
        );
        assert_eq!(e.score, 0.1235);
        assert_eq!(e.prompt_excerpt.chars().count(), 200);
    }

    #[test]
    fn test_event_wire_format() {
        let e = AuditEvent::new(RequestKind::AgentMessage, "hi", 0.9, Decision::Block, 200);
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["prompt"], "hi");
        assert_eq!(json["decision"], "BLOCK");
        assert_eq!(json["kind"], "agent_message");
        assert!(json["timestamp"].as_str().unwrap().contains('T'));
    }

    #[tokio::test]
    async fn test_in_memory_cap() {
        let log = AuditLog::in_memory(20);
        for n in 0..25 {
            log.append(event(n)).await;
        }
        let events = log.recent().await;
        assert_eq!(events.len(), 20);
        assert_eq!(prompts(&events), expected(5..25));
    }

    #[tokio::test]
    async fn test_file_cap_and_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("audit_log.json");
        let log = AuditLog::open(path.clone(), 20).await;

        for n in 0..25 {
            log.append(event(n)).await;
        }

        let events = log.recent().await;
        assert_eq!(prompts(&events), expected(5..25));

        let on_disk: Vec<AuditEvent> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(prompts(&on_disk), expected(5..25));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_appends_to_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("audit_log.json");
        let log = std::sync::Arc::new(AuditLog::open(path.clone(), 50).await);

        let handles: Vec<_> = (0..30)
            .map(|n| {
                let log = log.clone();
                tokio::spawn(async move { log.append(event(n)).await })
            })
            .collect();
        for handle in futures::future::join_all(handles).await {
            handle.unwrap();
        }

        assert_eq!(log.len().await, 30);
        let mut in_memory = prompts(&log.recent().await);
        in_memory.sort();
        let mut want = expected(0..30);
        want.sort();
        assert_eq!(in_memory, want);

        let on_disk: Vec<AuditEvent> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let mut on_disk = prompts(&on_disk);
        on_disk.sort();
        assert_eq!(on_disk, want);
    }

    #[tokio::test]
    async fn test_reopen_restores_trail() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("audit_log.json");
        {
            let log = AuditLog::open(path.clone(), 20).await;
            log.append(event(1)).await;
            log.append(event(2)).await;
        }
        let log = AuditLog::open(path, 20).await;
        assert_eq!(log.len().await, 2);
    }

    #[tokio::test]
    async fn test_corrupt_file_resets() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("audit_log.json");
        std::fs::write(&path, "{ not json").unwrap();

        let log = AuditLog::open(path.clone(), 20).await;
        assert!(log.is_empty().await);

        log.append(event(7)).await;

        let on_disk: Vec<AuditEvent> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(prompts(&on_disk), expected(7..8));
        assert_eq!(prompts(&log.recent().await), expected(7..8));
    }

    #[tokio::test]
    async fn test_corruption_between_appends() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("audit_log.json");
        let log = AuditLog::open(path.clone(), 20).await;
        log.append(event(1)).await;

        std::fs::write(&path, "[garbage").unwrap();
        // Reads fall back to the in-memory view
        assert_eq!(prompts(&log.recent().await), expected(1..2));

        log.append(event(2)).await;
        assert_eq!(prompts(&log.recent().await), expected(2..3));
    }
}
