use futures::StreamExt;
use serde_json::Value;
use std::ops::ControlFlow;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::models::{ChatRequest, StreamUpdate};
use crate::streaming::{Dispatcher, FrameBuffer, Outcome, Utf8Decoder};
use crate::transport::{ChunkStream, Transport};

/// Stops a running [`StreamSession`]
///
/// Cancelling is idempotent. The session answers it with exactly one terminal
/// `("", true)` update unless it already ended, and pulls no further chunks.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    token: CancellationToken,
}

impl CancelHandle {
    pub fn cancel(&self) {
        if !self.token.is_cancelled() {
            debug!("Stream session cancelled");
        }
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// State of one streamed completion, from request to terminal update
///
/// Holds the UTF-8 decoder, the frame buffer (pending text plus its in-flight
/// guard) and the cancellation flag. Consumed by [`send`](Self::send) or
/// [`run`](Self::run), so a session serves exactly one request.
#[derive(Debug, Default)]
pub struct StreamSession {
    decoder: Utf8Decoder,
    frames: FrameBuffer,
    cancel: CancellationToken,
}

impl StreamSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            token: self.cancel.clone(),
        }
    }

    /// Open the stream through `transport` and feed every update to `consumer`
    ///
    /// Transport failures become a single terminal update carrying the error.
    pub async fn send<T, F>(self, transport: &T, request: &ChatRequest, consumer: F) -> Outcome
    where
        T: Transport + ?Sized,
        F: FnMut(StreamUpdate),
    {
        let mut dispatcher = Dispatcher::new(consumer);
        info!(
            transport = transport.name(),
            conversation_id = %request.conversation_id,
            messages = request.messages.len(),
            "Starting stream session"
        );

        let cancel = self.cancel.clone();
        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = transport.open(request) => Some(result),
        };

        match opened {
            None => stopped(&mut dispatcher),
            Some(Err(e)) => {
                let message = e.to_string();
                error!(error = %message, "Failed to open stream");
                dispatcher.fail(message.clone());
                Outcome::Failed(message)
            }
            Some(Ok(chunks)) => self.pump(chunks, dispatcher).await,
        }
    }

    /// Drive an already opened chunk stream to its end
    pub async fn run<F>(self, chunks: ChunkStream, consumer: F) -> Outcome
    where
        F: FnMut(StreamUpdate),
    {
        self.pump(chunks, Dispatcher::new(consumer)).await
    }

    async fn pump<F>(mut self, mut chunks: ChunkStream, mut dispatcher: Dispatcher<F>) -> Outcome
    where
        F: FnMut(StreamUpdate),
    {
        let cancel = self.cancel.clone();

        loop {
            if cancel.is_cancelled() {
                return stopped(&mut dispatcher);
            }

            // a pending read is dropped on cancellation, releasing the body
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return stopped(&mut dispatcher),
                next = chunks.next() => next,
            };

            match next {
                Some(Ok(bytes)) => {
                    debug!(bytes = bytes.len(), "Received chunk");
                    let text = self.decoder.decode(&bytes);
                    let frames = self.frames.feed(&text);
                    if let Some(outcome) = self.deliver(frames, &mut dispatcher) {
                        return outcome;
                    }
                }
                Some(Err(e)) => {
                    let message = e.to_string();
                    error!(error = %message, "Stream read failed");
                    dispatcher.fail(message.clone());
                    return Outcome::Failed(message);
                }
                None => {
                    let tail = self.decoder.finish();
                    self.frames.push(&tail);
                    let frames = self.frames.finish();
                    if let Some(outcome) = self.deliver(frames, &mut dispatcher) {
                        return outcome;
                    }

                    info!("Stream ended without completion frame");
                    dispatcher.finish();
                    return Outcome::Ended;
                }
            }
        }
    }

    /// Dispatch frames in order. `Some` means the session is over.
    fn deliver<F>(&self, frames: Vec<Value>, dispatcher: &mut Dispatcher<F>) -> Option<Outcome>
    where
        F: FnMut(StreamUpdate),
    {
        for frame in frames {
            if self.cancel.is_cancelled() {
                return Some(stopped(dispatcher));
            }

            if let ControlFlow::Break(outcome) = dispatcher.dispatch(frame) {
                info!(?outcome, delivered = dispatcher.delivered(), "Stream session finished");
                return Some(outcome);
            }
        }

        None
    }
}

fn stopped<F>(dispatcher: &mut Dispatcher<F>) -> Outcome
where
    F: FnMut(StreamUpdate),
{
    info!(delivered = dispatcher.delivered(), "Stream session stopped by consumer");
    dispatcher.finish();
    Outcome::Cancelled
}

/// Run one request in a fresh session
pub async fn stream_chat<T, F>(transport: &T, request: &ChatRequest, consumer: F) -> Outcome
where
    T: Transport + ?Sized,
    F: FnMut(StreamUpdate),
{
    StreamSession::new().send(transport, request, consumer).await
}
