//! Output chunks and the handlers that receive them.

use std::sync::Mutex;

/// Streaming output chunk from a child process.
#[derive(Debug, Clone)]
pub struct OutputChunk {
    /// Raw bytes as read from the pipe.
    pub raw: Vec<u8>,
    /// Decoded text (lossy UTF-8).
    ///
    /// While streaming, a multibyte character split across two reads shows
    /// up whole in the chunk that completes it, so `text` may be shorter
    /// than `raw` suggests and can even be empty.
    pub text: String,
    /// Stream source.
    pub source: OutputSource,
}

/// Source of output data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputSource {
    /// Standard output.
    Stdout,
    /// Standard error.
    Stderr,
}

impl OutputChunk {
    /// Create a new output chunk.
    pub fn new(raw: Vec<u8>, source: OutputSource) -> Self {
        let text = String::from_utf8_lossy(&raw).into_owned();
        Self { raw, text, source }
    }

    /// Create a chunk from bytes and text the caller already decoded.
    pub fn with_text(raw: Vec<u8>, text: String, source: OutputSource) -> Self {
        Self { raw, text, source }
    }

    /// Create a stdout chunk.
    pub fn stdout_chunk(raw: Vec<u8>) -> Self {
        Self::new(raw, OutputSource::Stdout)
    }

    /// Create a stderr chunk.
    pub fn stderr_chunk(raw: Vec<u8>) -> Self {
        Self::new(raw, OutputSource::Stderr)
    }

    /// The text, if this chunk came from stdout.
    pub fn stdout(&self) -> Option<&str> {
        match self.source {
            OutputSource::Stdout => Some(&self.text),
            OutputSource::Stderr => None,
        }
    }

    /// The text, if this chunk came from stderr.
    pub fn stderr(&self) -> Option<&str> {
        match self.source {
            OutputSource::Stdout => None,
            OutputSource::Stderr => Some(&self.text),
        }
    }
}

/// Incremental UTF-8 decoder for one output stream.
///
/// Holds back an incomplete trailing sequence until the next read completes
/// it. Invalid bytes become U+FFFD exactly as `String::from_utf8_lossy` does.
#[derive(Debug, Default)]
pub(crate) struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    /// Decode the next read, carrying any incomplete tail forward.
    pub(crate) fn decode(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);

        let mut text = String::with_capacity(self.pending.len());
        let mut start = 0;
        loop {
            let rest = &self.pending[start..];
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    text.push_str(valid);
                    start = self.pending.len();
                    break;
                }
                Err(e) => {
                    let valid_len = e.valid_up_to();
                    text.push_str(&String::from_utf8_lossy(&rest[..valid_len]));
                    match e.error_len() {
                        Some(bad) => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            start += valid_len + bad;
                        }
                        // Truncated sequence at the end: wait for more bytes.
                        None => {
                            start += valid_len;
                            break;
                        }
                    }
                }
            }
        }

        self.pending.drain(..start);
        text
    }

    /// Flush whatever is still held back once the stream hits EOF.
    pub(crate) fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let tail = std::mem::take(&mut self.pending);
        Some(String::from_utf8_lossy(&tail).into_owned())
    }
}

/// Receives output chunks while a process runs.
///
/// Called from the task driving the run, once per read, in read order for
/// each stream. A stream ending mid-character gets one more chunk carrying
/// only the replacement text. Any `Fn(&OutputChunk) + Send + Sync` closure is a handler.
pub trait OutputHandler: Send + Sync {
    fn on_output(&self, chunk: &OutputChunk);
}

impl<F> OutputHandler for F
where
    F: Fn(&OutputChunk) + Send + Sync,
{
    fn on_output(&self, chunk: &OutputChunk) {
        self(chunk)
    }
}

/// Handler that accumulates stdout and stderr text separately.
#[derive(Debug, Default)]
pub struct CapturedOutput {
    stdout: Mutex<String>,
    stderr: Mutex<String>,
}

impl CapturedOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything captured from stdout so far.
    pub fn stdout(&self) -> String {
        self.stdout
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Everything captured from stderr so far.
    pub fn stderr(&self) -> String {
        self.stderr
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl OutputHandler for CapturedOutput {
    fn on_output(&self, chunk: &OutputChunk) {
        let target = match chunk.source {
            OutputSource::Stdout => &self.stdout,
            OutputSource::Stderr => &self.stderr,
        };
        target
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push_str(&chunk.text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_output_chunk_stdout() {
        let chunk = OutputChunk::stdout_chunk(b"test output".to_vec());
        assert_eq!(chunk.source, OutputSource::Stdout);
        assert_eq!(chunk.stdout(), Some("test output"));
        assert_eq!(chunk.stderr(), None);
    }

    #[test]
    fn test_output_chunk_stderr() {
        let chunk = OutputChunk::stderr_chunk(b"oops".to_vec());
        assert_eq!(chunk.stdout(), None);
        assert_eq!(chunk.stderr(), Some("oops"));
    }

    #[test]
    fn test_output_chunk_lossy_text() {
        let chunk = OutputChunk::stdout_chunk(vec![b'o', b'k', 0xff]);
        assert_eq!(chunk.raw.len(), 3);
        assert!(chunk.text.starts_with("ok"));
        assert!(chunk.text.contains('\u{FFFD}'));
    }

    #[test]
    fn test_decoder_joins_split_character() {
        let mut decoder = Utf8Decoder::default();
        assert_eq!(decoder.decode(b"caf\xc3"), "caf");
        assert_eq!(decoder.decode(b"\xa9!"), "\u{e9}!");
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn test_decoder_byte_at_a_time() {
        let euro = "\u{20ac}".as_bytes();
        let mut decoder = Utf8Decoder::default();
        let text: String = euro.iter().map(|b| decoder.decode(&[*b])).collect();
        assert_eq!(text, "\u{20ac}");
    }

    #[test]
    fn test_decoder_replaces_invalid_bytes() {
        let mut decoder = Utf8Decoder::default();
        assert_eq!(decoder.decode(b"a\xffb"), "a\u{FFFD}b");
        assert_eq!(
            decoder.decode(b"x\xc3y"),
            String::from_utf8_lossy(b"x\xc3y")
        );
    }

    #[test]
    fn test_decoder_flushes_truncated_tail() {
        let mut decoder = Utf8Decoder::default();
        assert_eq!(decoder.decode(b"end\xe2\x82"), "end");
        assert_eq!(decoder.finish().as_deref(), Some("\u{FFFD}"));
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn test_captured_output_separates_streams() {
        let capture = CapturedOutput::new();
        capture.on_output(&OutputChunk::stdout_chunk(b"a".to_vec()));
        capture.on_output(&OutputChunk::stderr_chunk(b"x".to_vec()));
        capture.on_output(&OutputChunk::stdout_chunk(b"b".to_vec()));

        assert_eq!(capture.stdout(), "ab");
        assert_eq!(capture.stderr(), "x");
    }

    #[test]
    fn test_closure_handler() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let handler = move |chunk: &OutputChunk| {
            sink.lock().unwrap().push(chunk.source);
        };

        handler.on_output(&OutputChunk::stderr_chunk(b"e".to_vec()));
        assert_eq!(*seen.lock().unwrap(), vec![OutputSource::Stderr]);
    }
}
