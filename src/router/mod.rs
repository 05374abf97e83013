//! Model routing with failover and response caching
//!
//! Each alias maps to a primary target plus ordered fallbacks:
//!
//! ```text
//! route(alias, prompt, temperature)
//!   ├─ cache hit on primary key → cached text, no network
//!   └─ primary → fallback 1 → ... → first success is cached under
//!      the key of the target that produced it
//! ```

pub mod cache;
pub mod openai;
pub mod provider;
pub mod types;

pub use cache::{CacheKey, ResponseCache};
pub use openai::{ChatCompletion, CompletionRequest};
pub use provider::{HttpModelClient, ModelClient};
pub use types::{RouteSpec, RoutedResponse, Target};

use crate::config::{CacheConfig, ProvidersConfig, RouteConfig};
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Alias registry plus shared cache
pub struct ProviderRouter {
    routes: HashMap<String, RouteSpec>,
    cache: ResponseCache,
    client: Arc<dyn ModelClient>,
}

impl ProviderRouter {
    pub fn new(routes: Vec<RouteSpec>, cache: ResponseCache, client: Arc<dyn ModelClient>) -> Self {
        Self {
            routes: routes
                .into_iter()
                .map(|spec| (spec.alias.clone(), spec))
                .collect(),
            cache,
            client,
        }
    }

    /// Build from configuration with the HTTP provider client
    pub fn from_config(
        routes: &[RouteConfig],
        providers: &ProvidersConfig,
        cache: &CacheConfig,
    ) -> Result<Self> {
        let client = HttpModelClient::new(Duration::from_secs(providers.request_timeout_secs))?;
        let router = Self::new(
            routes.iter().map(RouteSpec::from_config).collect(),
            ResponseCache::new(cache.capacity, cache.ttl_secs.map(Duration::from_secs)),
            Arc::new(client),
        );
        tracing::info!(aliases = ?router.aliases(), "Provider router ready");
        Ok(router)
    }

    /// Registered aliases, sorted
    pub fn aliases(&self) -> Vec<&str> {
        let mut aliases: Vec<&str> = self.routes.keys().map(String::as_str).collect();
        aliases.sort_unstable();
        aliases
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Run a prompt through the alias's call chain
    pub async fn route(
        &self,
        alias: &str,
        prompt: &str,
        temperature: f64,
    ) -> Result<RoutedResponse> {
        let spec = self
            .routes
            .get(alias)
            .ok_or_else(|| Error::UnknownModel(alias.to_string()))?;

        let primary_key = CacheKey::new(&spec.primary.model_id, prompt, temperature);
        if let Some(text) = self.cache.get(&primary_key).await {
            tracing::info!(alias = alias, model = %spec.primary.model_id, "Cache hit, provider skipped");
            return Ok(RoutedResponse {
                text,
                model_id: spec.primary.model_id.clone(),
                cached: true,
            });
        }

        let mut last_error: Option<Error> = None;
        let mut all_timed_out = true;

        for target in spec.chain() {
            tracing::debug!(alias = alias, model = %target.model_id, endpoint = %target.endpoint, "Routing request");
            match self.client.complete(target, prompt, temperature).await {
                Ok(text) => {
                    self.cache
                        .insert(
                            CacheKey::new(&target.model_id, prompt, temperature),
                            text.clone(),
                        )
                        .await;
                    return Ok(RoutedResponse {
                        text,
                        model_id: target.model_id.clone(),
                        cached: false,
                    });
                }
                Err(e) => {
                    tracing::warn!(alias = alias, model = %target.model_id, error = %e, "router fallback");
                    all_timed_out &= matches!(e, Error::UpstreamTimeout(_));
                    last_error = Some(e);
                }
            }
        }

        if all_timed_out {
            return Err(Error::UpstreamTimeout(format!(
                "every target for '{}' timed out",
                alias
            )));
        }

        Err(Error::UpstreamExhausted {
            alias: alias.to_string(),
            last: last_error.map(|e| e.to_string()).unwrap_or_default(),
        })
    }
}
