use std::io::{Read, Write};
use std::time::Duration;

use tracing::debug;
use voxlink_transport::{Endpoint, IpcStream};

use crate::error::Result;

/// Closes a live channel from a thread other than the engine's.
///
/// After `close`, reads on the channel see end-of-stream and writes fail
/// instead of waiting.
pub trait CloseChannel: Send + Sync {
    fn close(&self);
}

impl CloseChannel for IpcStream {
    fn close(&self) {
        if let Err(err) = self.shutdown() {
            debug!(error = %err, "companion channel shutdown failed");
        }
    }
}

/// One open connection, as the engine receives it.
pub struct Channel<R, W> {
    pub reader: R,
    pub writer: W,
    /// Lets [`VoiceClient::stop`](crate::VoiceClient::stop) break a stalled
    /// read or write.
    pub closer: Option<Box<dyn CloseChannel>>,
}

impl<R, W> std::fmt::Debug for Channel<R, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("closer", &self.closer.is_some())
            .finish_non_exhaustive()
    }
}

impl<R, W> Channel<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            closer: None,
        }
    }

    pub fn with_closer(mut self, closer: impl CloseChannel + 'static) -> Self {
        self.closer = Some(Box::new(closer));
        self
    }
}

/// Opens the channel to the companion for the engine.
///
/// The engine reads and writes from one thread but keeps the two halves in
/// separate buffers, so a connection is handed over as a pair. Reads must
/// not wait: with nothing pending they report `WouldBlock`.
pub trait Connector: Send + 'static {
    type Reader: Read + Send;
    type Writer: Write + Send;

    fn connect(&mut self) -> Result<Channel<Self::Reader, Self::Writer>>;

    /// Where this connector connects to, for logs.
    fn describe(&self) -> String;
}

/// Connects to a real companion over the platform IPC channel.
#[derive(Debug, Clone)]
pub struct EndpointConnector {
    endpoint: Endpoint,
    write_timeout: Option<Duration>,
}

impl EndpointConnector {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            write_timeout: None,
        }
    }

    /// Bound on a single blocking write, where the platform supports one.
    pub fn with_write_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.write_timeout = timeout;
        self
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }
}

impl Connector for EndpointConnector {
    type Reader = IpcStream;
    type Writer = IpcStream;

    fn connect(&mut self) -> Result<Channel<IpcStream, IpcStream>> {
        let mut stream = voxlink_transport::connect(&self.endpoint)?;
        stream.set_write_timeout(self.write_timeout)?;
        stream.set_nonblocking(true)?;
        let writer = stream.try_clone()?;
        let closer = stream.try_clone()?;
        Ok(Channel::new(stream, writer).with_closer(closer))
    }

    fn describe(&self) -> String {
        self.endpoint.to_string()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::io::ErrorKind;

    use voxlink_transport::CompanionListener;

    use super::*;
    use crate::error::ClientError;

    fn temp_dir(tag: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "voxlink-{tag}-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn connected_pair_is_nonblocking_duplex() {
        let dir = temp_dir("connector");
        let sock_path = dir.join("companion.sock");
        let listener = CompanionListener::bind(&sock_path).unwrap();

        let mut connector = EndpointConnector::new(Endpoint::socket(&sock_path))
            .with_write_timeout(Some(Duration::from_secs(1)));
        let channel = connector.connect().unwrap();
        let (mut reader, mut writer) = (channel.reader, channel.writer);
        let mut server = listener.accept().unwrap();

        let mut buf = [0u8; 16];
        assert_eq!(reader.read(&mut buf).unwrap_err().kind(), ErrorKind::WouldBlock);

        writer.write_all(b"CLOSE\n").unwrap();
        let mut got = [0u8; 6];
        server.read_exact(&mut got).unwrap();
        assert_eq!(&got, b"CLOSE\n");

        channel.closer.expect("endpoint channels can be closed").close();
        assert_eq!(reader.read(&mut buf).unwrap(), 0);
        assert!(writer.write_all(b"LISTEN|1\n").is_err());

        drop(listener);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn absent_companion_is_transport_error() {
        let dir = temp_dir("connector-absent");
        let mut connector = EndpointConnector::new(Endpoint::socket(dir.join("none.sock")));
        match connector.connect() {
            Err(ClientError::Transport(err)) => assert!(err.is_not_listening()),
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(connector.describe().ends_with("none.sock"));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
