pub mod chat;
pub mod envelope;

pub use chat::{ChatMessage, ChatRequest, StreamUpdate};
pub use envelope::Envelope;
