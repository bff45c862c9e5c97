//! Stream draining and per-chunk output handling

use memoexec_core::{Error, Result};
use std::io::Write;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Which child stream a buffer collects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

impl StreamKind {
    fn label(self) -> &'static str {
        match self {
            StreamKind::Stdout => "stdout",
            StreamKind::Stderr => "stderr",
        }
    }
}

/// Append-only text accumulator for one stream of one run.
///
/// Bytes are decoded as UTF-8 incrementally: a multi-byte sequence split
/// across two chunks is held back until its remaining bytes arrive. Invalid
/// sequences decode to U+FFFD.
#[derive(Debug, Default)]
pub struct StreamBuffer {
    text: String,
    pending: Vec<u8>,
}

impl StreamBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode `chunk`, append it, and return the newly decoded text
    pub fn push(&mut self, chunk: &[u8]) -> &str {
        let start = self.text.len();
        self.pending.extend_from_slice(chunk);

        let mut consumed = 0;
        loop {
            match std::str::from_utf8(&self.pending[consumed..]) {
                Ok(valid) => {
                    self.text.push_str(valid);
                    consumed = self.pending.len();
                    break;
                }
                Err(e) => {
                    let valid_end = consumed + e.valid_up_to();
                    // Slice was just validated up to valid_end
                    self.text
                        .push_str(&String::from_utf8_lossy(&self.pending[consumed..valid_end]));
                    match e.error_len() {
                        Some(invalid_len) => {
                            self.text.push(char::REPLACEMENT_CHARACTER);
                            consumed = valid_end + invalid_len;
                        }
                        None => {
                            // Incomplete sequence at the end; wait for more bytes
                            consumed = valid_end;
                            break;
                        }
                    }
                }
            }
        }
        self.pending.drain(..consumed);

        &self.text[start..]
    }

    /// Text decoded so far
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Flush any held-back bytes lossily and return the full text
    pub fn finish(mut self) -> String {
        if !self.pending.is_empty() {
            self.text.push_str(&String::from_utf8_lossy(&self.pending));
        }
        self.text
    }
}

/// Read `reader` to EOF in chunks of `chunk_size` bytes, echoing each decoded
/// chunk to stdout when `echo` is set
pub(crate) async fn drain_stream<R>(
    mut reader: R,
    kind: StreamKind,
    program: &str,
    chunk_size: usize,
    echo: bool,
) -> Result<String>
where
    R: AsyncRead + Unpin,
{
    let mut buffer = StreamBuffer::new();
    let mut chunk = vec![0u8; chunk_size.max(1)];

    loop {
        let read = reader
            .read(&mut chunk)
            .await
            .map_err(|e| Error::child_io(program, format!("read {}", kind.label()), e))?;
        if read == 0 {
            break;
        }

        let text = buffer.push(&chunk[..read]);
        if echo && !text.is_empty() {
            echo_to_stdout(text);
        }
    }

    Ok(buffer.finish())
}

fn echo_to_stdout(text: &str) {
    let mut stdout = std::io::stdout().lock();
    // A closed stdout must not abort the run; the output is still captured
    if let Err(e) = stdout.write_all(text.as_bytes()).and_then(|()| stdout.flush()) {
        tracing::debug!(error = %e, "failed to echo child output");
    }
}
