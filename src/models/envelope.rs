use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON object carried by one logical SSE frame
///
/// `code` equal to numeric zero (`0` or `0.0`) means success, anything else
/// (another number, a string, or no code at all) is an error. `data` is
/// `true` for the final frame, an object with an `answer` field for content
/// frames, or anything else.
///
/// `code` and `message` are kept as raw JSON so that an error envelope with
/// an unexpected shape is still recognised as an error.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Envelope {
    #[serde(default)]
    pub code: Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Value>,

    #[serde(default)]
    pub data: Value,
}

impl Envelope {
    pub fn is_success(&self) -> bool {
        self.code.as_f64() == Some(0.0)
    }

    /// `data === true`
    pub fn is_done(&self) -> bool {
        self.data.as_bool() == Some(true)
    }

    /// The `answer` field of an object payload, if any
    pub fn answer(&self) -> Option<&Value> {
        self.data.as_object().and_then(|obj| obj.get("answer"))
    }

    /// Message to report for an error envelope
    ///
    /// A non-empty string is used as-is, any other non-null value is rendered
    /// as JSON. Without a usable message the code is reported instead.
    pub fn error_message(&self) -> String {
        match &self.message {
            Some(Value::String(message)) if !message.is_empty() => message.clone(),
            Some(Value::String(_)) | Some(Value::Null) | None => self.fallback_message(),
            Some(other) => other.to_string(),
        }
    }

    fn fallback_message(&self) -> String {
        match &self.code {
            Value::Null => "Request failed without a status code".to_string(),
            Value::String(code) => format!("Request failed with code {}", code),
            code => format!("Request failed with code {}", code),
        }
    }
}
