//! OpenAI-compatible chat completions client (OpenAI, LM Studio, and other compatible servers).
//!
//! Text-only requests send the user content as a plain string; requests with media send a list of
//! `text` and `image_url` parts. Error replies that point at an image are mapped to
//! [`LlmError::MediaRejected`]; everything else is [`LlmError::Api`].

use crate::config::ServiceConfig;
use crate::llm::{ChatBackend, ClassificationRequest, LlmError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Error codes the service uses when it cannot fetch or decode an image.
const MEDIA_ERROR_CODES: &[&str] = &[
    "invalid_image",
    "invalid_image_url",
    "invalid_image_format",
    "image_parse_error",
    "image_too_large",
];

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
#[derive(Clone)]
pub struct OpenAiClient {
    base_url: String,
    model: String,
    temperature: Option<f32>,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl OpenAiClient {
    /// Build a client from service settings. The request timeout comes from `timeoutSecs`.
    /// Fails with [`LlmError::MissingApiKey`] when the service requires a key and none is given.
    pub fn new(service: &ServiceConfig, api_key: Option<String>) -> Result<Self, LlmError> {
        if api_key.is_none() && service.requires_api_key() {
            return Err(LlmError::MissingApiKey(service.base_url.clone()));
        }
        let client = reqwest::Client::builder().timeout(service.timeout()).build()?;
        Ok(Self {
            base_url: service.base_url.trim_end_matches('/').to_string(),
            model: service.model.clone(),
            temperature: service.temperature,
            api_key,
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// POST /chat/completions — non-streaming; returns the first choice's content.
    async fn chat(&self, request: &ClassificationRequest) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = OpenAiChatRequest {
            model: &self.model,
            messages: request_to_openai(request),
            stream: false,
            temperature: self.temperature,
        };
        let mut req = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        let res = req.send().await?;
        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(classify_api_error(status, body));
        }
        let data: OpenAiChatResponse = res.json().await?;
        Ok(data
            .choices
            .and_then(|c| c.into_iter().next())
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .unwrap_or_default())
    }
}

#[async_trait]
impl ChatBackend for OpenAiClient {
    async fn complete(&self, request: &ClassificationRequest) -> Result<String, LlmError> {
        self.chat(request).await
    }
}

/// Map a non-success reply to a typed error. Only 400s that name an image count as media rejection.
fn classify_api_error(status: u16, body: String) -> LlmError {
    let detail = serde_json::from_str::<OpenAiErrorEnvelope>(&body)
        .ok()
        .and_then(|e| e.error);
    if status == 400 {
        if let Some(detail) = detail {
            let code_hit = detail
                .code
                .as_ref()
                .and_then(|c| c.as_str())
                .is_some_and(|c| MEDIA_ERROR_CODES.contains(&c));
            let param_hit = detail
                .param
                .as_deref()
                .is_some_and(|p| p.contains("image_url"));
            if code_hit || param_hit {
                return LlmError::MediaRejected(detail.message.unwrap_or(body));
            }
        }
    }
    LlmError::Api { status, body }
}

fn request_to_openai(request: &ClassificationRequest) -> Vec<OpenAiMessage> {
    let content = if request.has_media() {
        let mut parts = Vec::with_capacity(request.media.len() + 1);
        parts.push(ContentPart::Text {
            text: request.user_text(),
        });
        parts.extend(request.media.iter().map(|url| ContentPart::ImageUrl {
            image_url: ImageUrl { url: url.clone() },
        }));
        UserContent::Parts(parts)
    } else {
        UserContent::Text(request.user_text())
    };
    vec![
        OpenAiMessage::System {
            content: request.system.clone(),
        },
        OpenAiMessage::User { content },
    ]
}

// --- OpenAI wire types ---

#[derive(Debug, Serialize)]
struct OpenAiChatRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAiMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "role", rename_all = "snake_case")]
enum OpenAiMessage {
    System { content: String },
    User { content: UserContent },
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum UserContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiChatResponse {
    choices: Option<Vec<OpenAiChoice>>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: Option<OpenAiResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorEnvelope {
    error: Option<OpenAiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorDetail {
    message: Option<String>,
    #[serde(default)]
    code: Option<serde_json::Value>,
    #[serde(default)]
    param: Option<String>,
}
