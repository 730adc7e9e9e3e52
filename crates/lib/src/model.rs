//! Shared data types: raw ticket rows, catalogs, conversations, classification results and review rows.

use serde::{Deserialize, Serialize};

/// A subject label from the catalog.
pub type Subject = String;

/// One row of the ticket log. Missing sender fields deserialize to the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMessage {
    pub ticket_id: String,
    #[serde(default)]
    pub sender_name: String,
    #[serde(default)]
    pub sender_handle: String,
    #[serde(default)]
    pub text: Option<String>,
    /// Link to an attached image (or other media), if the row carries one.
    #[serde(default, alias = "media")]
    pub media_reference: Option<String>,
}

/// Catalog entry used for ranking and as literal reply material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CannedResponse {
    pub title: String,
    pub content: String,
}

impl CannedResponse {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }
}

/// Subjects and canned responses, as loaded from the catalog file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    #[serde(default)]
    pub subjects: Vec<Subject>,
    #[serde(default)]
    pub responses: Vec<CannedResponse>,
}

/// One surviving message line of a conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageLine {
    /// 1-based number among the surviving lines; `None` for a synthesized placeholder.
    pub ordinal: Option<usize>,
    /// Index of the source row within its ticket group.
    pub source_index: Option<usize>,
    pub text: String,
}

impl MessageLine {
    pub fn placeholder(text: impl Into<String>) -> Self {
        Self {
            ordinal: None,
            source_index: None,
            text: text.into(),
        }
    }

    /// Line as shown to the model and the reviewer: `"<n> - <text>"`, or the bare text for a placeholder.
    pub fn render(&self) -> String {
        match self.ordinal {
            Some(n) => format!("{} - {}", n, self.text),
            None => self.text.clone(),
        }
    }
}

/// Filtered, ordered reconstruction of one ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    pub ticket_id: String,
    pub lines: Vec<MessageLine>,
    pub media: Vec<String>,
    pub sender_name: String,
    pub sender_handle: String,
}

impl Conversation {
    /// Rendered lines joined with a blank line between them.
    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(MessageLine::render)
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// First whitespace-separated token of the sender name, if any.
    pub fn first_name(&self) -> Option<&str> {
        self.sender_name.split_whitespace().next()
    }

    pub fn has_media(&self) -> bool {
        !self.media.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positivo,
    Negativo,
    #[default]
    Neutro,
}

impl Sentiment {
    pub const ALL: [Sentiment; 3] = [Sentiment::Positivo, Sentiment::Negativo, Sentiment::Neutro];

    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positivo => "positivo",
            Sentiment::Negativo => "negativo",
            Sentiment::Neutro => "neutro",
        }
    }

    /// Match a lower-cased label exactly. Unknown labels yield `None`.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == label)
    }
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured classification of one conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationResult {
    pub subject: Subject,
    pub sentiment: Sentiment,
    pub suggested_reply: String,
}

/// Output row awaiting human approval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRecord {
    pub id: usize,
    pub ticket_id: String,
    pub sender_name: String,
    pub sender_handle: String,
    pub conversation: String,
    pub media_links: String,
    pub subject: Subject,
    pub sentiment: Sentiment,
    pub suggested_reply: String,
    /// Left empty; set by the reviewer.
    pub approved: Option<bool>,
}

/// Numbered media links, one per line (`"1. <url>"`).
pub fn format_media_links(media: &[String]) -> String {
    media
        .iter()
        .enumerate()
        .map(|(i, url)| format!("{}. {}", i + 1, url))
        .collect::<Vec<_>>()
        .join("\n")
}
