//! # Chat Stream
//!
//! Incremental reassembler for chat completions streamed as Server-Sent Events.
//!
//! ## Overview
//!
//! The completions endpoint answers a POST with a chunked body of `data:` frames,
//! each carrying a JSON envelope `{code, message?, data}`. Network chunks split
//! those frames (and UTF-8 characters) at arbitrary points. This crate turns the
//! raw chunks back into envelopes and reports them to a callback as
//! `(content, complete, error)` updates:
//!
//! - `{code: 0, data: {answer}}` → the full answer so far
//! - `{code: 0, data: true}` → completion, reading stops
//! - `{code: != 0, message}` → terminal error
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use chat_stream::{ChatMessage, ChatRequest, ClientConfig, HttpTransport, StreamSession};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = HttpTransport::new(ClientConfig::from_env()?)?;
//! let request = ChatRequest::new("conversation-1", vec![ChatMessage::user("Hello")]);
//!
//! let session = StreamSession::new();
//! let cancel = session.cancel_handle();
//! let outcome = session
//!     .send(&transport, &request, |update| println!("{:?}", update))
//!     .await;
//! # drop(cancel);
//! # let _ = outcome;
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`client`] - HTTP and replay transports, error body reader
//! - [`config`] - Configuration loading and validation
//! - [`error`] - Error types and handling
//! - [`models`] - Request, envelope and update types
//! - [`session`] - Per-request session driving the pipeline
//! - [`streaming`] - UTF-8 decoder, frame buffer and dispatcher
//! - [`transport`] - The transport trait

pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod session;
pub mod streaming;
pub mod transport;

pub use client::{HttpTransport, ReplayTransport};
pub use config::ClientConfig;
pub use error::{Result, StreamError};
pub use models::{ChatMessage, ChatRequest, Envelope, StreamUpdate};
pub use session::{CancelHandle, StreamSession, stream_chat};
pub use streaming::Outcome;
pub use transport::Transport;
