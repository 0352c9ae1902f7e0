//! Game-side link to a speech-recognition companion process.
//!
//! voxlink keeps a local IPC channel open to the companion, mirrors the
//! game's voice settings to it, forwards dialogue options and favorites,
//! and hands recognition results back to the game.
//!
//! # Crate Structure
//!
//! - [`transport`]: local duplex channel (Unix sockets, named pipes)
//! - [`wire`]: the line protocol spoken with the companion
//! - [`client`]: the self-healing connection engine (behind `client` feature)

/// Re-export transport types.
pub mod transport {
    pub use voxlink_transport::*;
}

/// Re-export wire protocol types.
pub mod wire {
    pub use voxlink_wire::*;
}

/// Re-export client types (requires `client` feature).
#[cfg(feature = "client")]
pub mod client {
    pub use voxlink_client::*;
}
