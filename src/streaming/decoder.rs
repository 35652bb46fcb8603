use bytes::{Buf, BytesMut};

const REPLACEMENT: char = '\u{FFFD}';

/// Streaming UTF-8 decoder
///
/// A multi-byte sequence cut at a chunk boundary is held back until the next
/// chunk completes it. Invalid sequences decode to U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: BytesMut,
}

impl Utf8Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode as much of `chunk` (plus any held bytes) as is complete
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);
        let mut out = String::with_capacity(self.pending.len());

        while !self.pending.is_empty() {
            match std::str::from_utf8(&self.pending) {
                Ok(text) => {
                    out.push_str(text);
                    self.pending.clear();
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&self.pending[..valid]));

                    match e.error_len() {
                        Some(len) => {
                            out.push(REPLACEMENT);
                            self.pending.advance(valid + len);
                        }
                        None => {
                            // incomplete sequence at the end, wait for more bytes
                            self.pending.advance(valid);
                            break;
                        }
                    }
                }
            }
        }

        out
    }

    /// Flush at end of stream. A dangling partial sequence becomes U+FFFD.
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            return String::new();
        }

        tracing::debug!(
            bytes = self.pending.len(),
            "Incomplete UTF-8 sequence at end of stream"
        );
        let out = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        out
    }

    /// Number of bytes held back waiting for the rest of a character
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_in_chunks(bytes: &[u8], size: usize) -> String {
        let mut decoder = Utf8Decoder::new();
        let mut out = String::new();
        for chunk in bytes.chunks(size) {
            out.push_str(&decoder.decode(chunk));
        }
        out.push_str(&decoder.finish());
        out
    }

    #[test]
    fn test_ascii_passthrough() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode(b"data: {}"), "data: {}");
        assert_eq!(decoder.pending_len(), 0);
    }

    #[test]
    fn test_split_multibyte_held() {
        // "你" is E4 BD A0
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode(&[b'a', 0xE4, 0xBD]), "a");
        assert_eq!(decoder.pending_len(), 2);
        assert_eq!(decoder.decode(&[0xA0, b'b']), "你b");
        assert_eq!(decoder.pending_len(), 0);
    }

    #[test]
    fn test_every_split_point() {
        let text = "héllo 你好 🦀 done";
        let bytes = text.as_bytes();
        for size in 1..=bytes.len() {
            assert_eq!(decode_in_chunks(bytes, size), text, "chunk size {}", size);
        }
    }

    #[test]
    fn test_invalid_byte_replaced() {
        let bytes = [b'a', 0xFF, b'b'];
        assert_eq!(decode_in_chunks(&bytes, 1), "a\u{FFFD}b");
        assert_eq!(decode_in_chunks(&bytes, 3), "a\u{FFFD}b");
    }

    #[test]
    fn test_truncated_sequence_at_finish() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode(&[b'x', 0xF0, 0x9F]), "x");
        assert_eq!(decoder.finish(), "\u{FFFD}");
        assert_eq!(decoder.pending_len(), 0);
        assert_eq!(decoder.finish(), "");
    }
}
