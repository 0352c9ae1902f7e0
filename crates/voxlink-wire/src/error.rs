use std::time::Duration;

/// Errors that can occur while reading or writing protocol lines.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// An I/O error occurred on the underlying stream.
    #[error("wire I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The companion closed the stream.
    #[error("connection closed by companion")]
    ConnectionClosed,

    /// Buffered inbound data exceeded the line limit without a newline.
    #[error("inbound line too long ({size} bytes buffered, max {max})")]
    LineTooLong { size: usize, max: usize },

    /// The stream kept refusing bytes for longer than the write timeout.
    #[error("write timed out after {0:?}")]
    WriteTimeout(Duration),

    /// The write was abandoned because the owner is shutting down.
    #[error("write abandoned: shutting down")]
    Cancelled,

    /// A configuration toggle name that is not part of the protocol.
    #[error("unknown config toggle: {0}")]
    UnknownToggle(String),
}

pub type Result<T> = std::result::Result<T, WireError>;
