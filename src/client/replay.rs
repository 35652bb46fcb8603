use bytes::Bytes;
use futures::stream;

use crate::error::Result;
use crate::models::ChatRequest;
use crate::transport::{ChunkStream, OpenFuture, Transport};

/// Serves a captured response body from memory
///
/// Used to replay recorded streams through the reassembler with a chosen
/// chunking, independent of how the original bytes arrived.
#[derive(Debug, Clone)]
pub struct ReplayTransport {
    chunks: Vec<Bytes>,
}

impl ReplayTransport {
    /// Replay exactly these chunks
    pub fn from_chunks<I, B>(chunks: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        Self {
            chunks: chunks.into_iter().map(Into::into).collect(),
        }
    }

    /// Replay `body` cut into pieces of at most `chunk_size` bytes
    pub fn split(body: impl Into<Bytes>, chunk_size: usize) -> Self {
        let body: Bytes = body.into();
        let size = chunk_size.max(1);
        let chunks = (0..body.len())
            .step_by(size)
            .map(|start| body.slice(start..(start + size).min(body.len())))
            .collect();
        Self { chunks }
    }

    pub fn chunks(&self) -> &[Bytes] {
        &self.chunks
    }
}

impl Transport for ReplayTransport {
    fn open(&self, _request: &ChatRequest) -> OpenFuture {
        let chunks: Vec<Result<Bytes>> = self.chunks.iter().cloned().map(Ok).collect();
        Box::pin(async move { Ok(Box::pin(stream::iter(chunks)) as ChunkStream) })
    }

    fn name(&self) -> &str {
        "replay"
    }
}
