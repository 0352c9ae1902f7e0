use std::io::{ErrorKind, Read};

use crate::codec::{LineDecoder, WireConfig};
use crate::error::{Result, WireError};

const READ_CHUNK_SIZE: usize = 8 * 1024;
/// Upper bound on bytes pulled in a single poll, so one chatty companion
/// cannot starve the outbound side of the loop.
const POLL_BUDGET: usize = 64 * 1024;

/// Pulls complete lines from a non-blocking `Read` stream.
///
/// Partial lines stay buffered across polls.
pub struct LineReader<T> {
    inner: T,
    decoder: LineDecoder,
    closed: bool,
}

impl<T: Read> LineReader<T> {
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, WireConfig::default())
    }

    pub fn with_config(inner: T, config: WireConfig) -> Self {
        Self {
            inner,
            decoder: LineDecoder::new(config.max_line_length),
            closed: false,
        }
    }

    /// Read whatever is available now and append complete lines to `out`.
    ///
    /// Returns the number of lines appended. `WouldBlock` ends the poll
    /// quietly. End-of-stream yields [`WireError::ConnectionClosed`], after
    /// any lines that were already complete have been appended.
    /// [`WireError::LineTooLong`] drops the offending line only; the next
    /// poll carries on with the line after it.
    pub fn poll_lines(&mut self, out: &mut Vec<String>) -> Result<usize> {
        let before = out.len();
        if self.closed {
            return Err(WireError::ConnectionClosed);
        }

        let mut chunk = [0u8; READ_CHUNK_SIZE];
        let mut pulled = 0usize;
        while pulled < POLL_BUDGET {
            match self.inner.read(&mut chunk) {
                Ok(0) => {
                    self.closed = true;
                    break;
                }
                Ok(n) => {
                    pulled += n;
                    self.decoder.push(&chunk[..n]);
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => break,
                Err(err) => return Err(WireError::Io(err)),
            }
        }

        while let Some(line) = self.decoder.next_line()? {
            out.push(line);
        }

        if self.closed && out.len() == before {
            return Err(WireError::ConnectionClosed);
        }
        Ok(out.len() - before)
    }

    /// Whether end-of-stream has been observed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}
