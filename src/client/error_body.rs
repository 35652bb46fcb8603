use serde_json::Value;

/// Message used when an error response carries nothing readable
pub const FALLBACK_MESSAGE: &str = "request failed";

/// Body of a non-success HTTP response, read according to its content type
///
/// JSON bodies expose their `message` field, anything else is taken as plain text.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorBody {
    Json(Value),
    Text(String),
}

impl ErrorBody {
    pub fn from_parts(content_type: Option<&str>, body: &[u8]) -> Self {
        let is_json = content_type
            .map(|ct| ct.to_ascii_lowercase().contains("application/json"))
            .unwrap_or(false);

        if is_json {
            match serde_json::from_slice(body) {
                Ok(value) => ErrorBody::Json(value),
                Err(e) => {
                    tracing::debug!(error = %e, "Error body claims JSON but does not parse");
                    ErrorBody::Json(Value::Null)
                }
            }
        } else {
            ErrorBody::Text(String::from_utf8_lossy(body).into_owned())
        }
    }

    /// Read the body of an error response. Read failures give an empty text body.
    pub async fn read(response: reqwest::Response) -> Self {
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        match response.bytes().await {
            Ok(body) => Self::from_parts(content_type.as_deref(), &body),
            Err(e) => {
                tracing::debug!(error = %e, "Failed to read error body");
                ErrorBody::Text(String::new())
            }
        }
    }

    /// Human readable message for the consumer
    pub fn message(&self) -> String {
        let message = match self {
            ErrorBody::Json(value) => value.get("message").and_then(Value::as_str),
            ErrorBody::Text(text) => Some(text.trim()),
        };

        match message {
            Some(m) if !m.is_empty() => m.to_string(),
            _ => FALLBACK_MESSAGE.to_string(),
        }
    }
}
