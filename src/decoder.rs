/// Streaming UTF-8 decoder for response bodies.
///
/// Transport chunk boundaries can land in the middle of a multi-byte
/// character. The decoder holds the incomplete tail of one chunk and
/// prepends it to the next, so callers only ever see whole characters.
/// Invalid sequences decode to U+FFFD rather than failing the stream.
#[derive(Debug, Default)]
pub struct Utf8StreamDecoder {
    pending: Vec<u8>,
}

impl Utf8StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode one chunk, keeping any incomplete trailing character for later.
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        let mut input = std::mem::take(&mut self.pending);
        input.extend_from_slice(bytes);

        let mut out = String::with_capacity(input.len());
        let mut rest: &[u8] = &input;

        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    break;
                }
                Err(err) => {
                    let (valid, after) = rest.split_at(err.valid_up_to());
                    out.push_str(std::str::from_utf8(valid).unwrap_or_default());

                    match err.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        None => {
                            // Truncated character at the end of the input
                            self.pending = after.to_vec();
                            break;
                        }
                    }
                }
            }
        }

        out
    }

    /// Flush bytes still held at end of stream.
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            return String::new();
        }
        let pending = std::mem::take(&mut self.pending);
        String::from_utf8_lossy(&pending).into_owned()
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}
