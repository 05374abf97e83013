//! Runtime policy flags

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio::sync::RwLock;

/// Flags present at startup, in their initial state
pub const DEFAULT_POLICIES: &[(&str, bool)] = &[
    ("promptInjection", true),
    ("toolAccess", false),
    ("humanApproval", true),
    ("dataLeakage", true),
];

/// Request to flip one flag
#[derive(Debug, Clone, Deserialize)]
pub struct PolicyUpdate {
    pub policy: String,
    pub value: bool,
}

/// Result of a successful update
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolicyUpdated {
    pub status: &'static str,
    pub policy: String,
    pub value: bool,
}

/// Named boolean flags. Flags can be changed but never added or removed.
pub struct PolicyService {
    flags: RwLock<BTreeMap<String, bool>>,
}

impl Default for PolicyService {
    fn default() -> Self {
        Self::new()
    }
}

impl PolicyService {
    pub fn new() -> Self {
        Self {
            flags: RwLock::new(
                DEFAULT_POLICIES
                    .iter()
                    .map(|(name, value)| (name.to_string(), *value))
                    .collect(),
            ),
        }
    }

    pub async fn snapshot(&self) -> BTreeMap<String, bool> {
        self.flags.read().await.clone()
    }

    pub async fn get(&self, name: &str) -> Option<bool> {
        self.flags.read().await.get(name).copied()
    }

    pub async fn update(&self, update: PolicyUpdate) -> Result<PolicyUpdated> {
        let mut flags = self.flags.write().await;
        let flag = flags
            .get_mut(&update.policy)
            .ok_or_else(|| Error::UnknownPolicy(update.policy.clone()))?;
        *flag = update.value;

        tracing::info!(policy = %update.policy, value = update.value, "Policy updated");
        Ok(PolicyUpdated {
            status: "success",
            policy: update.policy,
            value: update.value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_defaults() {
        let service = PolicyService::new();
        let flags = service.snapshot().await;
        assert_eq!(flags.len(), 4);
        assert_eq!(flags["promptInjection"], true);
        assert_eq!(flags["toolAccess"], false);
    }

    #[tokio::test]
    async fn test_update_existing() {
        let service = PolicyService::new();
        let updated = service
            .update(PolicyUpdate {
                policy: "toolAccess".into(),
                value: true,
            })
            .await
            .unwrap();
        assert_eq!(updated.status, "success");
        assert_eq!(service.get("toolAccess").await, Some(true));
    }

    #[tokio::test]
    async fn test_update_unknown_is_rejected() {
        let service = PolicyService::new();
        let err = service
            .update(PolicyUpdate {
                policy: "selfDestruct".into(),
                value: true,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnknownPolicy(_)));
        assert_eq!(service.snapshot().await.len(), 4);
    }
}
