use serde_json::Value;

pub const DATA_PREFIX: &str = "data:";

/// Reassembles SSE `data:` frames into JSON values
///
/// Decoded text is appended to a pending buffer. Each pass splits the buffer
/// into lines and folds them into logical frames: a `data:` line starts a new
/// frame, any other non-blank line continues the current one. A frame is
/// complete once it parses as JSON. A frame that does not parse yet stays in
/// the buffer, together with every line after it, until more text arrives.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    pending: String,
    in_flight: bool,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append decoded text without processing it
    pub fn push(&mut self, text: &str) {
        self.pending.push_str(text);
    }

    /// Append decoded text and return every frame it completes
    pub fn feed(&mut self, text: &str) -> Vec<Value> {
        self.push(text);
        self.process()
    }

    /// Run one pass over the pending buffer
    ///
    /// Returns nothing while another pass is in flight. Text pushed in the
    /// meantime is still buffered and picked up by the next pass.
    pub fn process(&mut self) -> Vec<Value> {
        if self.in_flight {
            tracing::trace!("Frame pass already in flight, skipping");
            return Vec::new();
        }

        self.in_flight = true;
        let frames = self.walk();
        self.in_flight = false;
        frames
    }

    /// Final pass at end of stream. Anything still unparsed is dropped.
    pub fn finish(&mut self) -> Vec<Value> {
        let frames = self.process();

        if !self.pending.trim().is_empty() {
            tracing::warn!(
                bytes = self.pending.len(),
                fragment = %truncate(&self.pending, 200),
                "Dropping unparsed trailing frame at end of stream"
            );
        }
        self.pending.clear();

        frames
    }

    fn walk(&mut self) -> Vec<Value> {
        let (frames, rest) = Self::fold_lines(&self.pending);
        if let Some(rest) = rest {
            self.pending = rest;
        }
        frames
    }

    /// Returns the completed frames and, when lines were consumed, the new pending text
    fn fold_lines(pending: &str) -> (Vec<Value>, Option<String>) {
        let mut frames = Vec::new();
        let lines: Vec<&str> = pending.split('\n').collect();

        // lines before this index are folded into frames already emitted
        let mut consumed = 0;
        let mut frame = String::new();
        let mut stalled = false;

        for (i, line) in lines.iter().enumerate() {
            if line.trim().is_empty() {
                continue;
            }

            if let Some(rest) = line.strip_prefix(DATA_PREFIX) {
                if !frame.is_empty() {
                    match serde_json::from_str::<Value>(&frame) {
                        Ok(value) => {
                            frames.push(value);
                            frame.clear();
                            consumed = i;
                        }
                        Err(e) => {
                            tracing::debug!(
                                error = %e,
                                size = frame.len(),
                                "Incomplete frame, waiting for more data"
                            );
                            stalled = true;
                            break;
                        }
                    }
                }
                frame.push_str(rest.trim());
            } else if !frame.is_empty() {
                // continuation of a payload with embedded line breaks
                frame.push_str(line);
            }
        }

        if !stalled && !frame.is_empty() {
            match serde_json::from_str::<Value>(&frame) {
                Ok(value) => {
                    frames.push(value);
                    consumed = lines.len();
                }
                Err(e) => {
                    tracing::debug!(
                        error = %e,
                        size = frame.len(),
                        "Incomplete frame at end of buffer, keeping it"
                    );
                }
            }
        }

        let rest = if consumed >= lines.len() {
            Some(String::new())
        } else if consumed > 0 {
            Some(lines[consumed..].join("\n"))
        } else {
            None
        };

        (frames, rest)
    }

    /// Text not yet resolved into a complete frame
    pub fn pending(&self) -> &str {
        &self.pending
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
