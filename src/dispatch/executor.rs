//! Sandbox executors

use crate::config::{resolve_credential, ExecutorConfig};
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Captured output of a sandboxed command
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionOutput {
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
}

impl ExecutionOutput {
    /// stdout, followed by a marked stderr section when there is any
    pub fn combined(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else {
            format!("{}\n[STDERR]:\n{}", self.stdout, self.stderr)
        }
    }
}

/// Runs commands in an isolated environment
#[async_trait]
pub trait Executor: Send + Sync {
    fn name(&self) -> &str;

    async fn execute(&self, command: &str) -> Result<ExecutionOutput>;
}

/// Pretends to run the command
#[derive(Debug, Default)]
pub struct MockSandbox;

#[async_trait]
impl Executor for MockSandbox {
    fn name(&self) -> &str {
        "mock"
    }

    async fn execute(&self, command: &str) -> Result<ExecutionOutput> {
        tracing::info!("Mock sandbox executing command");
        Ok(ExecutionOutput {
            stdout: format!("[Mock Sandbox] Executed: {}\nOutput: Success", command),
            stderr: String::new(),
        })
    }
}

#[derive(Debug, Serialize)]
struct RunRequest<'a> {
    command: &'a str,
}

/// Remote sandbox service speaking `POST {base}/commands`
pub struct HttpSandbox {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpSandbox {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build sandbox client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key,
        })
    }
}

#[async_trait]
impl Executor for HttpSandbox {
    fn name(&self) -> &str {
        "http"
    }

    async fn execute(&self, command: &str) -> Result<ExecutionOutput> {
        let url = format!("{}/commands", self.base_url.trim_end_matches('/'));
        let mut request = self.client.post(&url).json(&RunRequest { command });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::UpstreamTimeout("sandbox execution".to_string())
            } else {
                Error::Upstream(format!("sandbox: {}", e))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Upstream(format!("sandbox returned HTTP {}", status)));
        }
        Ok(response.json().await?)
    }
}

/// Mock sandbox unless a sandbox URL is configured
pub fn executor_from_config(config: &ExecutorConfig) -> Result<Arc<dyn Executor>> {
    match &config.sandbox_url {
        Some(url) => {
            let api_key = resolve_credential(&config.api_key_ref);
            if api_key.is_none() {
                tracing::warn!(credential = %config.api_key_ref, "Sandbox credential not set");
            }
            tracing::info!(url = %url, "Using HTTP sandbox");
            Ok(Arc::new(HttpSandbox::new(
                url.clone(),
                api_key,
                Duration::from_secs(config.timeout_secs),
            )?))
        }
        None => {
            tracing::info!("No sandbox configured, commands will be mocked");
            Ok(Arc::new(MockSandbox))
        }
    }
}
