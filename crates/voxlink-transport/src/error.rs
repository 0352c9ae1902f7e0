use std::path::PathBuf;

/// Errors that can occur while opening or using the companion channel.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The companion endpoint could not be bound (mock companion side).
    #[error("failed to bind to {path}: {source}")]
    Bind {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The companion is not listening at the endpoint (yet).
    #[error("failed to connect to {path}: {source}")]
    Connect {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to accept an incoming client.
    #[error("failed to accept connection: {0}")]
    Accept(std::io::Error),

    /// An I/O error occurred on the open channel.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The socket path is too long for the platform.
    #[error("socket path too long ({len} bytes, max {max}): {path}")]
    PathTooLong {
        path: PathBuf,
        len: usize,
        max: usize,
    },

    /// The endpoint kind cannot be used on this platform.
    #[error("endpoint {0} is not supported on this platform")]
    Unsupported(String),
}

impl TransportError {
    /// Whether this error means "nobody is listening yet" rather than a broken channel.
    pub fn is_not_listening(&self) -> bool {
        match self {
            TransportError::Connect { source, .. } => matches!(
                source.kind(),
                std::io::ErrorKind::NotFound
                    | std::io::ErrorKind::ConnectionRefused
                    | std::io::ErrorKind::WouldBlock
            ),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
