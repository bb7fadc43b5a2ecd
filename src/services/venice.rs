//! Venice AI chat-completions client.
//!
//! The `ChatApi` trait is the seam between the analysis pipeline and the
//! network; tests swap in scripted fakes, production uses `VeniceClient`
//! over reqwest.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::config::VeniceConfig;
use super::error::ApiError;

#[derive(Debug, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: Vec<ContentPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ContentPart {
    Text {
        #[serde(rename = "type")]
        content_type: String,
        text: String,
    },
    ImageUrl {
        #[serde(rename = "type")]
        content_type: String,
        image_url: ImageUrlData,
    },
}

impl ContentPart {
    pub fn text(text: String) -> Self {
        ContentPart::Text {
            content_type: "text".to_string(),
            text,
        }
    }

    pub fn image_url(url: String) -> Self {
        ContentPart::ImageUrl {
            content_type: "image_url".to_string(),
            image_url: ImageUrlData { url },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ImageUrlData {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
}

impl ChatRequest {
    pub fn system_message(text: &str) -> ChatMessage {
        ChatMessage {
            role: "system".to_string(),
            content: vec![ContentPart::text(text.to_string())],
        }
    }

    pub fn user_message(parts: Vec<ContentPart>) -> ChatMessage {
        ChatMessage {
            role: "user".to_string(),
            content: parts,
        }
    }
}

/// Schema-on-the-wire enforcement for backends that support it.
#[derive(Debug, Serialize)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub format_type: String,
    pub json_schema: JsonSchemaFormat,
}

#[derive(Debug, Serialize)]
pub struct JsonSchemaFormat {
    pub name: String,
    pub strict: bool,
    pub schema: Value,
}

impl ResponseFormat {
    pub fn strict_schema(name: &str, schema: Value) -> Self {
        Self {
            format_type: "json_schema".to_string(),
            json_schema: JsonSchemaFormat {
                name: name.to_string(),
                strict: true,
                schema,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: MessageContent,
}

#[derive(Debug, Deserialize)]
struct MessageContent {
    content: Option<String>,
}

/// One chat-completion round trip; returns the first choice's content.
#[async_trait::async_trait]
pub trait ChatApi: Send + Sync {
    async fn chat_completion(&self, request: ChatRequest) -> Result<String, ApiError>;
}

pub struct VeniceClient {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl VeniceClient {
    pub fn new(api_key: String, base_url: String) -> Self {
        Self {
            api_key,
            base_url,
            client: reqwest::Client::new(),
        }
    }

    /// Client from config. Configuration checks happen upstream; an
    /// unconfigured key is carried as empty and never sent, because the
    /// orchestrator refuses to dispatch without a credential.
    pub fn from_config(config: &VeniceConfig) -> Self {
        Self::new(
            config.api_key.clone().unwrap_or_default(),
            config.base_url.clone(),
        )
    }
}

#[async_trait::async_trait]
impl ChatApi for VeniceClient {
    async fn chat_completion(&self, request: ChatRequest) -> Result<String, ApiError> {
        log::debug!(
            "📤 Sending chat completion to Venice: model={}, max_tokens={}",
            request.model,
            request.max_tokens
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status();
        log::debug!("📥 Venice response status: {}", status);

        if !status.is_success() {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            let message = response.text().await.unwrap_or_default();
            log::warn!("❌ Venice API error ({}): {}", status, message);
            return Err(ApiError::Status {
                status: status.as_u16(),
                retry_after,
                message,
            });
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| ApiError::Network(format!("invalid response body: {}", e)))?;

        chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(ApiError::EmptyResponse { stage: "chat" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_serializes_content_parts_with_type_tags() {
        let request = ChatRequest {
            model: "mistral-31-24b".to_string(),
            messages: vec![ChatRequest::user_message(vec![
                ContentPart::text("describe this".to_string()),
                ContentPart::image_url("data:image/png;base64,AAAA".to_string()),
            ])],
            temperature: 0.3,
            max_tokens: 4000,
            response_format: None,
        };

        let value = serde_json::to_value(&request).unwrap();
        let content = &value["messages"][0]["content"];
        assert_eq!(content[0]["type"], "text");
        assert_eq!(content[1]["type"], "image_url");
        assert_eq!(content[1]["image_url"]["url"], "data:image/png;base64,AAAA");
        assert!(value.get("response_format").is_none());
    }

    #[test]
    fn test_strict_schema_response_format() {
        let format = ResponseFormat::strict_schema("nutritional_report", json!({"type": "object"}));
        let value = serde_json::to_value(&format).unwrap();
        assert_eq!(value["type"], "json_schema");
        assert_eq!(value["json_schema"]["name"], "nutritional_report");
        assert_eq!(value["json_schema"]["strict"], true);
    }
}
