use std::io::{Read, Write};
use std::time::Duration;

use crate::error::Result;

/// A connected companion channel implementing `Read` and `Write`.
///
/// On Unix this wraps a Unix domain socket stream, on Windows a named pipe
/// client handle.
///
/// After [`IpcStream::set_nonblocking`]`(true)` a read never waits: it
/// returns [`std::io::ErrorKind::WouldBlock`] when no bytes are pending and
/// `Ok(0)` once the companion has closed its end.
pub struct IpcStream {
    inner: IpcStreamInner,
    nonblocking: bool,
}

enum IpcStreamInner {
    #[cfg(unix)]
    Unix(std::os::unix::net::UnixStream),
    #[cfg(windows)]
    Pipe(std::fs::File),
}

impl Read for IpcStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            #[cfg(unix)]
            IpcStreamInner::Unix(stream) => stream.read(buf),
            #[cfg(windows)]
            IpcStreamInner::Pipe(file) => {
                if !self.nonblocking {
                    return file.read(buf);
                }
                // Named pipes have no non-blocking mode for synchronous handles;
                // only read what the pipe reports as already buffered.
                let available = crate::pipe::bytes_available(file)?;
                if available == 0 {
                    return Err(std::io::Error::from(std::io::ErrorKind::WouldBlock));
                }
                let len = available.min(buf.len());
                file.read(&mut buf[..len])
            }
        }
    }
}

impl Write for IpcStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            #[cfg(unix)]
            IpcStreamInner::Unix(stream) => write_no_sigpipe(stream, buf),
            #[cfg(windows)]
            IpcStreamInner::Pipe(file) => file.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            #[cfg(unix)]
            IpcStreamInner::Unix(stream) => stream.flush(),
            #[cfg(windows)]
            IpcStreamInner::Pipe(file) => file.flush(),
        }
    }
}

impl IpcStream {
    /// Wrap a connected Unix domain socket stream.
    #[cfg(unix)]
    pub(crate) fn from_unix(stream: std::os::unix::net::UnixStream) -> Self {
        #[cfg(any(target_os = "macos", target_os = "ios"))]
        if let Err(err) = suppress_sigpipe(&stream) {
            tracing::debug!(error = %err, "failed to set SO_NOSIGPIPE");
        }
        Self {
            inner: IpcStreamInner::Unix(stream),
            nonblocking: false,
        }
    }

    /// Wrap an opened named pipe client handle.
    #[cfg(windows)]
    pub(crate) fn from_pipe(file: std::fs::File) -> Self {
        Self {
            inner: IpcStreamInner::Pipe(file),
            nonblocking: false,
        }
    }

    /// Switch reads between waiting and "only what is available now".
    pub fn set_nonblocking(&mut self, nonblocking: bool) -> Result<()> {
        match &self.inner {
            #[cfg(unix)]
            IpcStreamInner::Unix(stream) => stream.set_nonblocking(nonblocking)?,
            #[cfg(windows)]
            IpcStreamInner::Pipe(_) => {}
        }
        self.nonblocking = nonblocking;
        Ok(())
    }

    /// Whether reads are currently non-blocking.
    pub fn is_nonblocking(&self) -> bool {
        self.nonblocking
    }

    /// Set the write timeout on the underlying stream.
    ///
    /// Synchronous named pipe handles have no write timeout; the call is a
    /// no-op there.
    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            #[cfg(unix)]
            IpcStreamInner::Unix(stream) => stream.set_write_timeout(timeout).map_err(Into::into),
            #[cfg(windows)]
            IpcStreamInner::Pipe(_) => {
                let _ = timeout;
                Ok(())
            }
        }
    }

    /// Try to clone this stream (new descriptor/handle onto the same channel).
    ///
    /// On Unix the clone shares the blocking mode with the original.
    pub fn try_clone(&self) -> Result<Self> {
        let inner = match &self.inner {
            #[cfg(unix)]
            IpcStreamInner::Unix(stream) => IpcStreamInner::Unix(stream.try_clone()?),
            #[cfg(windows)]
            IpcStreamInner::Pipe(file) => IpcStreamInner::Pipe(file.try_clone()?),
        };
        Ok(Self {
            inner,
            nonblocking: self.nonblocking,
        })
    }

    /// Close both directions. Pending reads on clones observe end-of-stream.
    ///
    /// Named pipe handles close when the last clone is dropped; here the
    /// I/O pending on the handle is cancelled so a blocked writer returns.
    pub fn shutdown(&self) -> Result<()> {
        match &self.inner {
            #[cfg(unix)]
            IpcStreamInner::Unix(stream) => match stream.shutdown(std::net::Shutdown::Both) {
                Ok(()) => Ok(()),
                Err(err) if err.kind() == std::io::ErrorKind::NotConnected => Ok(()),
                Err(err) => Err(err.into()),
            },
            #[cfg(windows)]
            IpcStreamInner::Pipe(file) => crate::pipe::cancel_pending_io(file).map_err(Into::into),
        }
    }
}

/// Write without raising SIGPIPE when the companion is gone.
#[cfg(target_os = "linux")]
fn write_no_sigpipe(
    stream: &mut std::os::unix::net::UnixStream,
    buf: &[u8],
) -> std::io::Result<usize> {
    use std::os::fd::AsRawFd;

    // SAFETY: `buf` is a valid readable slice of `buf.len()` bytes and the
    // descriptor is an open socket owned by `stream` for the whole call.
    let rc = unsafe {
        libc::send(
            stream.as_raw_fd(),
            buf.as_ptr().cast::<libc::c_void>(),
            buf.len(),
            libc::MSG_NOSIGNAL,
        )
    };
    if rc < 0 {
        Err(std::io::Error::last_os_error())
    } else {
        Ok(rc as usize)
    }
}

#[cfg(all(unix, not(target_os = "linux")))]
fn write_no_sigpipe(
    stream: &mut std::os::unix::net::UnixStream,
    buf: &[u8],
) -> std::io::Result<usize> {
    stream.write(buf)
}

#[cfg(any(target_os = "macos", target_os = "ios"))]
fn suppress_sigpipe(stream: &std::os::unix::net::UnixStream) -> std::io::Result<()> {
    use std::os::fd::AsRawFd;

    let one: libc::c_int = 1;
    // SAFETY: `one` outlives the call and its size is passed exactly; the
    // descriptor is an open socket owned by `stream`.
    let rc = unsafe {
        libc::setsockopt(
            stream.as_raw_fd(),
            libc::SOL_SOCKET,
            libc::SO_NOSIGPIPE,
            (&one as *const libc::c_int).cast::<libc::c_void>(),
            std::mem::size_of::<libc::c_int>() as libc::socklen_t,
        )
    };
    if rc == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

impl std::fmt::Debug for IpcStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match &self.inner {
            #[cfg(unix)]
            IpcStreamInner::Unix(_) => "unix",
            #[cfg(windows)]
            IpcStreamInner::Pipe(_) => "named-pipe",
        };
        f.debug_struct("IpcStream")
            .field("type", &kind)
            .field("nonblocking", &self.nonblocking)
            .finish()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::io::ErrorKind;
    use std::os::unix::net::UnixStream;

    use super::*;

    fn pair() -> (IpcStream, UnixStream) {
        let (left, right) = UnixStream::pair().unwrap();
        (IpcStream::from_unix(left), right)
    }

    #[test]
    fn nonblocking_read_reports_would_block_when_idle() {
        let (mut stream, _peer) = pair();
        stream.set_nonblocking(true).unwrap();
        assert!(stream.is_nonblocking());

        let mut buf = [0u8; 16];
        let err = stream.read(&mut buf).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::WouldBlock);
    }

    #[test]
    fn nonblocking_read_returns_pending_bytes() {
        let (mut stream, mut peer) = pair();
        stream.set_nonblocking(true).unwrap();
        peer.write_all(b"RES|1|0.9\n").unwrap();

        let mut buf = [0u8; 64];
        let n = stream.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"RES|1|0.9\n");
    }

    #[test]
    fn read_after_peer_close_is_eof() {
        let (mut stream, peer) = pair();
        stream.set_nonblocking(true).unwrap();
        drop(peer);

        let mut buf = [0u8; 8];
        assert_eq!(stream.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn write_after_peer_close_is_error_not_signal() {
        let (mut stream, peer) = pair();
        drop(peer);

        let err = stream.write_all(b"CLOSE\n").unwrap_err();
        assert!(matches!(
            err.kind(),
            ErrorKind::BrokenPipe | ErrorKind::ConnectionReset
        ));
    }

    #[test]
    fn clone_shares_channel() {
        let (stream, mut peer) = pair();
        let mut writer = stream.try_clone().unwrap();
        writer.write_all(b"LISTEN|1\n").unwrap();

        let mut buf = [0u8; 9];
        peer.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"LISTEN|1\n");
    }

    #[test]
    fn shutdown_makes_peer_see_eof() {
        let (stream, mut peer) = pair();
        stream.shutdown().unwrap();

        let mut buf = [0u8; 4];
        assert_eq!(peer.read(&mut buf).unwrap(), 0);
    }
}
