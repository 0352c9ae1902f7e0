use std::io::{ErrorKind, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::BytesMut;
use tracing::trace;

use crate::codec::{encode_command, WireConfig};
use crate::command::Command;
use crate::error::{Result, WireError};

const INITIAL_BUFFER_CAPACITY: usize = 4 * 1024;
const RETRY_PAUSE: Duration = Duration::from_millis(1);

/// Writes whole commands to a possibly non-blocking `Write` stream.
///
/// A command is encoded once and written until every byte is accepted, so
/// multi-line blocks are never interleaved with other output.
pub struct LineWriter<T> {
    inner: T,
    buf: BytesMut,
    config: WireConfig,
    running: Option<Arc<AtomicBool>>,
}

impl<T: Write> LineWriter<T> {
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, WireConfig::default())
    }

    pub fn with_config(inner: T, config: WireConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
            running: None,
        }
    }

    /// Abandon a stalled write with [`WireError::Cancelled`] once `running`
    /// reads `false`.
    pub fn with_running_flag(mut self, running: Arc<AtomicBool>) -> Self {
        self.running = Some(running);
        self
    }

    /// Encode and write every line of `command`.
    pub fn send(&mut self, command: &Command) -> Result<()> {
        self.buf.clear();
        encode_command(command, &mut self.buf);
        trace!(command = command.label(), bytes = self.buf.len(), "writing command");
        self.write_buffered()
    }

    /// Write one raw line; a `\n` terminator is appended.
    pub fn send_line(&mut self, line: &str) -> Result<()> {
        self.buf.clear();
        self.buf.extend_from_slice(line.as_bytes());
        self.buf.extend_from_slice(b"\n");
        self.write_buffered()
    }

    fn write_buffered(&mut self) -> Result<()> {
        let deadline = self.config.write_timeout.map(|t| Instant::now() + t);
        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(WireError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => {
                    self.pause_until(deadline)?;
                }
                Err(err) => return Err(WireError::Io(err)),
            }
        }
        self.flush_until(deadline)
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        let deadline = self.config.write_timeout.map(|t| Instant::now() + t);
        self.flush_until(deadline)
    }

    fn flush_until(&mut self, deadline: Option<Instant>) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => self.pause_until(deadline)?,
                Err(err) => return Err(WireError::Io(err)),
            }
        }
    }

    fn pause_until(&self, deadline: Option<Instant>) -> Result<()> {
        if self
            .running
            .as_ref()
            .is_some_and(|running| !running.load(Ordering::Acquire))
        {
            return Err(WireError::Cancelled);
        }
        if let Some(deadline) = deadline {
            if Instant::now() >= deadline {
                return Err(WireError::WriteTimeout(
                    self.config.write_timeout.unwrap_or_default(),
                ));
            }
        }
        std::thread::sleep(RETRY_PAUSE);
        Ok(())
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

    pub fn config(&self) -> &WireConfig {
        &self.config
    }
}
