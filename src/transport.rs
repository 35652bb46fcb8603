use bytes::Bytes;
use futures::Stream;
use std::future::Future;
use std::pin::Pin;

use crate::error::Result;
use crate::models::ChatRequest;

/// Raw body chunks of a streaming response, in arrival order
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Future returned by [`Transport::open`], resolved once response headers arrive
pub type OpenFuture = Pin<Box<dyn Future<Output = Result<ChunkStream>> + Send>>;

/// Source of a streamed completion body
pub trait Transport: Send + Sync {
    /// Send the request and return the response body as a chunk stream
    ///
    /// # Arguments
    /// * `request` - Conversation id and message history
    ///
    /// # Errors
    /// Connection failures and non-success statuses resolve to `Err` before
    /// any chunk is produced.
    fn open(&self, request: &ChatRequest) -> OpenFuture;

    /// Get the transport name for logging
    fn name(&self) -> &str;
}
