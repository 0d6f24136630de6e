//! UTF-8 safe streaming decoder for id-by-id output.
//!
//! Byte-level token boundaries rarely align with character boundaries, so a
//! token fed in isolation may end mid code point. This decoder buffers the
//! decoded bytes and emits only complete UTF-8, holding back an incomplete
//! trailing sequence until its continuation bytes arrive.

use super::byte_level;
use super::tokenizer::Tokenizer;

/// Stateful decoder over a borrowed tokenizer.
///
/// ```ignore
/// let mut decoder = StreamingDecoder::new(&tokenizer);
/// for id in id_stream {
///     if let Some(text) = decoder.push(id) {
///         print!("{text}");
///     }
/// }
/// print!("{}", decoder.flush());
/// ```
pub struct StreamingDecoder<'a> {
    tokenizer: &'a Tokenizer,
    buffer: Vec<u8>,
}

impl<'a> StreamingDecoder<'a> {
    pub fn new(tokenizer: &'a Tokenizer) -> Self {
        Self {
            tokenizer,
            buffer: Vec::with_capacity(16),
        }
    }

    /// Feed one id; returns completed text, if any.
    ///
    /// Special token strings are emitted verbatim, added tokens emit their
    /// string, vocabulary tokens pass through the inverse codec. Unknown ids
    /// contribute nothing.
    pub fn push(&mut self, id: u32) -> Option<String> {
        self.push_all(&[id])
    }

    /// Feed several ids at once; returns completed text, if any.
    pub fn push_all(&mut self, ids: &[u32]) -> Option<String> {
        for &id in ids {
            if let Some(token) = self.tokenizer.vocab().token_of(id) {
                byte_level::visible_to_bytes(token, &mut self.buffer);
            } else if let Some(token) = self.tokenizer.added_tokens().token_of(id) {
                self.buffer.extend_from_slice(token.as_bytes());
            }
        }
        self.drain_complete()
    }

    /// Emit whatever remains, replacing an incomplete trailing sequence.
    pub fn flush(&mut self) -> String {
        if self.buffer.is_empty() {
            return String::new();
        }
        let text = String::from_utf8_lossy(&self.buffer).into_owned();
        self.buffer.clear();
        text
    }

    /// Discard buffered bytes.
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    /// Whether bytes are waiting for a continuation.
    pub fn has_pending(&self) -> bool {
        !self.buffer.is_empty()
    }

    /// Number of buffered bytes.
    pub fn pending_bytes(&self) -> usize {
        self.buffer.len()
    }

    /// Drain the longest decodable prefix, converting definitely-invalid
    /// sequences to replacement characters and keeping only a possibly
    /// incomplete tail buffered.
    fn drain_complete(&mut self) -> Option<String> {
        let mut out = String::new();
        loop {
            match std::str::from_utf8(&self.buffer) {
                Ok(text) => {
                    out.push_str(text);
                    self.buffer.clear();
                    break;
                }
                Err(err) => {
                    let valid = err.valid_up_to();
                    // SAFETY: from_utf8 validated this prefix.
                    out.push_str(unsafe { std::str::from_utf8_unchecked(&self.buffer[..valid]) });
                    match err.error_len() {
                        // Truly invalid bytes: replace and keep going.
                        Some(bad) => {
                            out.push('\u{FFFD}');
                            self.buffer.drain(..valid + bad);
                        }
                        // Incomplete tail: keep it buffered.
                        None => {
                            self.buffer.drain(..valid);
                            break;
                        }
                    }
                }
            }
        }
        if out.is_empty() {
            None
        } else {
            Some(out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::merges::Merges;
    use crate::core::vocab::Vocab;

    fn test_tokenizer() -> Tokenizer {
        let mut json = String::from("{");
        for b in 0u8..=255 {
            json.push_str(&format!(
                "{}: {},",
                serde_json::to_string(byte_level::byte_to_str(b)).unwrap(),
                b
            ));
        }
        json.push_str(r#""Hello": 300, "Ġworld": 301}"#);
        let vocab = Vocab::from_json_slice(json.as_bytes()).unwrap();
        let merges = Merges::from_str("#\n").unwrap();
        Tokenizer::new(vocab, merges)
            .unwrap()
            .with_added_tokens([("<|note|>", 1000u32)])
            .unwrap()
    }

    #[test]
    fn ascii_tokens_emit_immediately() {
        let tokenizer = test_tokenizer();
        let mut decoder = StreamingDecoder::new(&tokenizer);
        assert_eq!(decoder.push(300), Some("Hello".to_string()));
        assert_eq!(decoder.push(301), Some(" world".to_string()));
        assert!(!decoder.has_pending());
    }

    #[test]
    fn split_code_point_is_buffered() {
        let tokenizer = test_tokenizer();
        let mut decoder = StreamingDecoder::new(&tokenizer);
        // "世" is 0xE4 0xB8 0x96; feed the single-byte tokens one at a time.
        assert_eq!(decoder.push(0xE4), None);
        assert_eq!(decoder.pending_bytes(), 1);
        assert_eq!(decoder.push(0xB8), None);
        assert_eq!(decoder.push(0x96), Some("世".to_string()));
        assert!(!decoder.has_pending());
    }

    #[test]
    fn added_token_passes_through() {
        let tokenizer = test_tokenizer();
        let mut decoder = StreamingDecoder::new(&tokenizer);
        assert_eq!(decoder.push(1000), Some("<|note|>".to_string()));
    }

    #[test]
    fn unknown_id_is_silent() {
        let tokenizer = test_tokenizer();
        let mut decoder = StreamingDecoder::new(&tokenizer);
        assert_eq!(decoder.push(999_999), None);
        assert!(!decoder.has_pending());
    }

    #[test]
    fn flush_replaces_incomplete_tail() {
        let tokenizer = test_tokenizer();
        let mut decoder = StreamingDecoder::new(&tokenizer);
        decoder.push(0xE4);
        decoder.push(0xB8);
        let flushed = decoder.flush();
        assert!(flushed.contains('\u{FFFD}'));
        assert!(!decoder.has_pending());
    }

    #[test]
    fn invalid_byte_is_replaced_inline() {
        let tokenizer = test_tokenizer();
        let mut decoder = StreamingDecoder::new(&tokenizer);
        // A lone continuation byte can never become valid.
        let out = decoder.push_all(&[0x80, b'a' as u32]).unwrap();
        assert_eq!(out, "\u{FFFD}a");
    }

    #[test]
    fn push_all_batches() {
        let tokenizer = test_tokenizer();
        let mut decoder = StreamingDecoder::new(&tokenizer);
        let out = decoder.push_all(&[300, 301]).unwrap();
        assert_eq!(out, "Hello world");
    }

    #[test]
    fn reset_discards() {
        let tokenizer = test_tokenizer();
        let mut decoder = StreamingDecoder::new(&tokenizer);
        decoder.push(0xE4);
        assert!(decoder.has_pending());
        decoder.reset();
        assert!(!decoder.has_pending());
    }
}
