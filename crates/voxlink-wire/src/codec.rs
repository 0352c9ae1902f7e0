use std::time::Duration;

use bytes::{Buf, BufMut, BytesMut};

use crate::command::Command;
use crate::error::{Result, WireError};

/// Longest inbound line accepted before the stream is treated as garbage.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 64 * 1024;
/// How long a writer keeps retrying a stream that refuses bytes.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// Limits applied by [`crate::LineReader`] and [`crate::LineWriter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireConfig {
    pub max_line_length: usize,
    /// `None` retries forever.
    pub write_timeout: Option<Duration>,
}

impl Default for WireConfig {
    fn default() -> Self {
        Self {
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            write_timeout: Some(DEFAULT_WRITE_TIMEOUT),
        }
    }
}

/// Append every line of `command` to `dst`, each terminated by `\n`.
pub fn encode_command(command: &Command, dst: &mut BytesMut) {
    command.for_each_line(|line| {
        dst.reserve(line.len() + 1);
        dst.put_slice(line.as_bytes());
        dst.put_u8(b'\n');
    });
}

/// Splits an inbound byte stream into lines.
///
/// Bytes are buffered until a `\n` arrives; a trailing `\r` is dropped and
/// invalid UTF-8 is replaced rather than rejected.
#[derive(Debug)]
pub struct LineDecoder {
    buf: BytesMut,
    max_line_length: usize,
    discarding: bool,
}

impl LineDecoder {
    pub fn new(max_line_length: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(8 * 1024),
            max_line_length,
            discarding: false,
        }
    }

    pub fn push(&mut self, bytes: &[u8]) {
        if !self.discarding {
            self.buf.extend_from_slice(bytes);
            return;
        }
        // Skip the rest of an overlong line.
        if let Some(pos) = bytes.iter().position(|&b| b == b'\n') {
            self.discarding = false;
            self.buf.extend_from_slice(&bytes[pos + 1..]);
        }
    }

    /// Next complete line, if one is buffered.
    ///
    /// Fails with [`WireError::LineTooLong`] once more than the line limit is
    /// buffered without a terminator. The partial line is dropped, as is the
    /// rest of it up to the next terminator; decoding resumes after that.
    pub fn next_line(&mut self) -> Result<Option<String>> {
        let Some(pos) = self.buf.iter().position(|&b| b == b'\n') else {
            if self.buf.len() > self.max_line_length {
                let size = self.buf.len();
                self.buf.clear();
                self.discarding = true;
                return Err(WireError::LineTooLong {
                    size,
                    max: self.max_line_length,
                });
            }
            return Ok(None);
        };

        let raw = self.buf.split_to(pos);
        self.buf.advance(1);
        let raw = raw.strip_suffix(b"\r").unwrap_or(&raw);
        Ok(Some(String::from_utf8_lossy(raw).into_owned()))
    }

    /// Bytes held back waiting for a terminator.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    pub fn clear(&mut self) {
        self.buf.clear();
        self.discarding = false;
    }
}

impl Default for LineDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINE_LENGTH)
    }
}
