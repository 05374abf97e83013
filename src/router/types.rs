//! Routing table types

use crate::config::{resolve_credential, RouteConfig, TargetConfig};
use serde::Serialize;

/// One provider endpoint in a call chain
#[derive(Clone)]
pub struct Target {
    /// OpenAI-compatible base URL
    pub endpoint: String,
    /// Provider-side model identifier
    pub model_id: String,
    /// Resolved API key
    pub credential: Option<String>,
}

impl Target {
    pub fn new(endpoint: impl Into<String>, model_id: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            model_id: model_id.into(),
            credential: None,
        }
    }

    fn from_config(config: &TargetConfig) -> Self {
        let credential = config.api_key_ref.as_deref().and_then(|key_ref| {
            let resolved = resolve_credential(key_ref);
            if resolved.is_none() {
                tracing::debug!(
                    model = %config.model_id,
                    credential = %key_ref,
                    "Provider credential not set"
                );
            }
            resolved
        });

        Self {
            endpoint: config.endpoint.clone(),
            model_id: config.model_id.clone(),
            credential,
        }
    }
}

impl std::fmt::Debug for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Target")
            .field("endpoint", &self.endpoint)
            .field("model_id", &self.model_id)
            .field("credential", &self.credential.as_ref().map(|_| "[set]"))
            .finish()
    }
}

/// A model alias and its ordered call chain
#[derive(Debug, Clone)]
pub struct RouteSpec {
    pub alias: String,
    pub primary: Target,
    pub fallbacks: Vec<Target>,
}

impl RouteSpec {
    /// Resolve a configured route, reading credentials from the environment
    pub fn from_config(config: &RouteConfig) -> Self {
        Self {
            alias: config.alias.clone(),
            primary: Target::from_config(&config.primary),
            fallbacks: config.fallbacks.iter().map(Target::from_config).collect(),
        }
    }

    /// Primary first, then fallbacks in order
    pub fn chain(&self) -> impl Iterator<Item = &Target> {
        std::iter::once(&self.primary).chain(self.fallbacks.iter())
    }
}

/// Completion text plus where it came from
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutedResponse {
    pub text: String,
    /// Model that produced the text
    pub model_id: String,
    /// True when served from the cache
    pub cached: bool,
}
