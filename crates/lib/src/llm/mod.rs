//! Classification service abstraction and the OpenAI-compatible HTTP client.
//!
//! A [`ClassificationRequest`] is wire-agnostic: a system instruction, one user text and optional
//! media references. Backends turn it into their own payload and return the raw reply text.

mod openai;

pub use openai::OpenAiClient;

use async_trait::async_trait;

/// One classification call: system instruction plus a single (possibly multimodal) user turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationRequest {
    pub system: String,
    pub text: String,
    /// Image references sent as separate parts alongside `text`.
    pub media: Vec<String>,
    /// Sentence about the attached images, appended to `text` only while `media` is non-empty.
    pub media_note: Option<String>,
}

impl ClassificationRequest {
    pub fn has_media(&self) -> bool {
        !self.media.is_empty()
    }

    /// User turn text as sent: `text`, plus the media note when images are attached.
    pub fn user_text(&self) -> String {
        match &self.media_note {
            Some(note) if self.has_media() => format!("{}\n\n{}", self.text, note),
            _ => self.text.clone(),
        }
    }

    /// Same request with every media part (and the note about them) removed.
    pub fn text_only(&self) -> Self {
        Self {
            system: self.system.clone(),
            text: self.text.clone(),
            media: Vec::new(),
            media_note: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("classification request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("classification api error: {status} {body}")]
    Api { status: u16, body: String },
    /// The service refused one of the media references (unreachable or unsupported image).
    #[error("classification service rejected media: {0}")]
    MediaRejected(String),
    #[error("no API key for {0} (set service.apiKey or TRIAGE_API_KEY)")]
    MissingApiKey(String),
}

/// A service that answers classification requests with raw text.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn complete(&self, request: &ClassificationRequest) -> Result<String, LlmError>;
}
