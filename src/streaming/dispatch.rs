use serde_json::Value;
use std::ops::ControlFlow;

use crate::models::{Envelope, StreamUpdate};

/// What a single envelope asks of the consumer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Full answer accumulated so far (not a delta)
    Answer(String),
    /// `data: true`, the backend is finished
    Done,
    /// Non-zero `code`
    Failed(String),
}

/// How a stream session ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Backend sent the `data: true` frame
    Done,
    /// Body closed without a completion frame
    Ended,
    /// Error envelope or transport failure
    Failed(String),
    /// Stopped by the consumer
    Cancelled,
}

impl Action {
    /// Interpret one parsed frame. Frames of any other shape yield `None`.
    pub fn from_frame(frame: Value) -> Option<Self> {
        if !frame.is_object() {
            tracing::debug!(%frame, "Ignoring frame that is not a JSON object");
            return None;
        }

        let envelope: Envelope = match serde_json::from_value(frame) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring frame that is not an envelope");
                return None;
            }
        };

        Self::from_envelope(envelope)
    }

    pub fn from_envelope(envelope: Envelope) -> Option<Self> {
        if !envelope.is_success() {
            let message = envelope.error_message();
            tracing::error!(code = %envelope.code, %message, "Server returned error envelope");
            return Some(Action::Failed(message));
        }

        if envelope.is_done() {
            return Some(Action::Done);
        }

        match envelope.answer() {
            Some(Value::String(answer)) => Some(Action::Answer(answer.clone())),
            Some(other) => {
                tracing::debug!(answer = %other, "Ignoring non-string answer");
                None
            }
            None => None,
        }
    }

    pub fn into_update(self) -> StreamUpdate {
        match self {
            Action::Answer(answer) => StreamUpdate::partial(answer),
            Action::Done => StreamUpdate::finished(),
            Action::Failed(message) => StreamUpdate::failed(message),
        }
    }
}

/// Hands updates to the consumer callback
///
/// Once a terminal update (`complete == true`) has been delivered every later
/// update is dropped, so the consumer sees exactly one terminal callback.
pub struct Dispatcher<F> {
    consumer: F,
    terminated: bool,
    delivered: usize,
}

impl<F> Dispatcher<F>
where
    F: FnMut(StreamUpdate),
{
    pub fn new(consumer: F) -> Self {
        Self {
            consumer,
            terminated: false,
            delivered: 0,
        }
    }

    /// Interpret a frame and notify the consumer. `Break` means stop reading.
    pub fn dispatch(&mut self, frame: Value) -> ControlFlow<Outcome> {
        let Some(action) = Action::from_frame(frame) else {
            return ControlFlow::Continue(());
        };

        let outcome = match &action {
            Action::Answer(_) => None,
            Action::Done => Some(Outcome::Done),
            Action::Failed(message) => Some(Outcome::Failed(message.clone())),
        };
        self.deliver(action.into_update());

        match outcome {
            Some(outcome) => ControlFlow::Break(outcome),
            None => ControlFlow::Continue(()),
        }
    }

    /// Deliver an update unless the session already ended. Returns whether it was delivered.
    pub fn deliver(&mut self, update: StreamUpdate) -> bool {
        if self.terminated {
            tracing::debug!(?update, "Session already terminated, dropping update");
            return false;
        }

        self.terminated = update.complete;
        self.delivered += 1;
        (self.consumer)(update);
        true
    }

    /// Terminal update without error (stream end or cancellation)
    pub fn finish(&mut self) -> bool {
        self.deliver(StreamUpdate::finished())
    }

    /// Terminal update with error
    pub fn fail(&mut self, message: impl Into<String>) -> bool {
        self.deliver(StreamUpdate::failed(message))
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Number of callbacks made so far
    pub fn delivered(&self) -> usize {
        self.delivered
    }
}
