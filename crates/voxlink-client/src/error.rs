/// Errors raised while running the companion connection.
///
/// Producers and consumers never see these; the engine logs them and tears
/// the connection down.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level error (connect, stream setup).
    #[error("transport error: {0}")]
    Transport(#[from] voxlink_transport::TransportError),

    /// Wire-level error (read, write, framing).
    #[error("wire error: {0}")]
    Wire(#[from] voxlink_wire::WireError),

    /// The engine thread could not be spawned.
    #[error("failed to spawn engine thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// The connector was lost with a failed spawn or a panicked engine.
    #[error("engine is unavailable after a failed start")]
    EngineUnavailable,
}

pub type Result<T> = std::result::Result<T, ClientError>;
