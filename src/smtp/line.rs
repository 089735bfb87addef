use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};

/// Upper bound for a single line; longer input ends the session.
pub const MAX_LINE_LENGTH: usize = 1 << 20;

/// Splits a byte stream into lines, keeping each line's terminator.
pub struct LineReader<R> {
    inner: BufReader<R>,
    buf: Vec<u8>,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner: BufReader::new(inner),
            buf: Vec::new(),
        }
    }

    /// Read the next line including its `\n` (or `\r\n`).
    ///
    /// Returns `Ok(None)` at end of stream. A trailing fragment without a
    /// line feed is treated the same way. Invalid UTF-8 is replaced rather
    /// than rejected.
    /// Next line with its terminator, as received.
    pub async fn next_line(&mut self) -> std::io::Result<Option<Vec<u8>>> {
        self.buf.clear();

        let n = (&mut self.inner)
            .take(MAX_LINE_LENGTH as u64)
            .read_until(b'\n', &mut self.buf)
            .await?;

        if n == 0 {
            return Ok(None);
        }

        if !self.buf.ends_with(b"\n") {
            if n == MAX_LINE_LENGTH {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    "line too long",
                ));
            }
            tracing::debug!(bytes = n, "discarding unterminated trailing line");
            return Ok(None);
        }

        Ok(Some(std::mem::take(&mut self.buf)))
    }
}
