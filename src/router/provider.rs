//! Provider clients

use super::types::Target;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Calls one provider target
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Return the completion text for a single user prompt
    async fn complete(&self, target: &Target, prompt: &str, temperature: f64) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI-compatible `/chat/completions` client
pub struct HttpModelClient {
    client: reqwest::Client,
}

impl HttpModelClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10).min(timeout))
            .timeout(timeout)
            .user_agent(concat!("opensec/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Config(format!("Failed to build provider client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ModelClient for HttpModelClient {
    async fn complete(&self, target: &Target, prompt: &str, temperature: f64) -> Result<String> {
        let url = format!("{}/chat/completions", target.endpoint.trim_end_matches('/'));
        let request = ChatRequest {
            model: &target.model_id,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature,
            stream: false,
        };

        let mut builder = self.client.post(&url).json(&request);
        if let Some(key) = &target.credential {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::UpstreamTimeout(format!("{} at {}", target.model_id, target.endpoint))
            } else {
                Error::Upstream(format!("{}: {}", target.model_id, e))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Upstream(format!(
                "{} returned HTTP {}",
                target.model_id, status
            )));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::Upstream(format!("{}: invalid response: {}", target.model_id, e)))?;

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| Error::Upstream(format!("{} returned an empty completion", target.model_id)))
    }
}
