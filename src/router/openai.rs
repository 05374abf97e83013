//! OpenAI-compatible request and response envelopes for the model proxy

use super::RoutedResponse;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MODEL: &str = "glm-5:cloud";
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_temperature() -> f64 {
    DEFAULT_TEMPERATURE
}

/// Body of `POST /bifrost/v1/chat/completions`
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionRequest {
    #[serde(default = "default_model")]
    pub model: String,
    pub prompt: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Choice {
    pub index: u32,
    pub message: ChatMessage,
    pub finish_reason: String,
}

/// `chat.completion` object returned to the caller
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatCompletion {
    pub id: String,
    pub object: String,
    /// Alias the caller asked for
    pub model: String,
    /// Model that actually answered, which differs after a fallback
    pub served_by: String,
    pub choices: Vec<Choice>,
}

impl ChatCompletion {
    pub fn new(alias: &str, routed: RoutedResponse) -> Self {
        Self {
            id: format!("bifrost-{}", uuid::Uuid::new_v4()),
            object: "chat.completion".to_string(),
            model: alias.to_string(),
            served_by: routed.model_id,
            choices: vec![Choice {
                index: 0,
                message: ChatMessage {
                    role: "assistant".to_string(),
                    content: routed.text,
                },
                finish_reason: "stop".to_string(),
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let req: CompletionRequest = serde_json::from_str(r#"{"prompt": "hi"}"#).unwrap();
        assert_eq!(req.model, "glm-5:cloud");
        assert_eq!(req.temperature, 0.7);
    }

    #[test]
    fn test_envelope_shape() {
        let completion = ChatCompletion::new(
            "glm-5:cloud",
            RoutedResponse {
                text: "hello".into(),
                model_id: "llama3".into(),
                cached: false,
            },
        );
        let json = serde_json::to_value(&completion).unwrap();
        assert!(json["id"].as_str().unwrap().starts_with("bifrost-"));
        assert_eq!(json["object"], "chat.completion");
        assert_eq!(json["model"], "glm-5:cloud");
        assert_eq!(json["served_by"], "llama3");
        assert_eq!(json["choices"][0]["message"]["role"], "assistant");
        assert_eq!(json["choices"][0]["message"]["content"], "hello");
        assert_eq!(json["choices"][0]["finish_reason"], "stop");
    }
}
