use serde::{Deserialize, Serialize};

/// Body of a streaming completion request
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ChatRequest {
    pub conversation_id: String,

    /// Full conversation history, oldest first
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ChatMessage {
    pub id: String,

    pub content: String,

    /// "user" or "assistant"
    pub role: String,

    /// Attachments, passed through untouched
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<serde_json::Value>>,

    // The backend expects this one field in camelCase next to snake_case siblings
    #[serde(rename = "conversationId", skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,

    /// Documents the answer should be grounded on
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc_ids: Option<Vec<String>>,
}

impl ChatMessage {
    pub fn new(id: impl Into<String>, role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            role: role.into(),
            files: None,
            conversation_id: None,
            doc_ids: None,
        }
    }

    /// A user message with a fresh random id
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(uuid::Uuid::new_v4().to_string(), "user", content)
    }
}

impl ChatRequest {
    pub fn new(conversation_id: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            messages,
        }
    }
}

/// One consumer callback invocation: `(content, complete, error)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamUpdate {
    /// Full answer so far. Empty on terminal updates.
    pub content: String,
    pub complete: bool,
    pub error: Option<String>,
}

impl StreamUpdate {
    pub fn partial(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            complete: false,
            error: None,
        }
    }

    pub fn finished() -> Self {
        Self {
            content: String::new(),
            complete: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            content: String::new(),
            complete: true,
            error: Some(error.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}
