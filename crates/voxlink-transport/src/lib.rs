//! Local duplex channel between the game-side client and the speech companion.
//!
//! Provides one stream type over the platform's local IPC primitive:
//! - Unix domain sockets (Linux/macOS)
//! - Named pipes (Windows)
//!
//! This is the lowest layer of voxlink. The wire codec and the connection
//! engine build on the [`IpcStream`] returned by [`connect`].

pub mod endpoint;
pub mod error;
pub mod stream;

#[cfg(windows)]
pub mod pipe;
#[cfg(unix)]
pub mod uds;

pub use endpoint::{connect, Endpoint, DEFAULT_CHANNEL_NAME};
pub use error::{Result, TransportError};
pub use stream::IpcStream;

#[cfg(unix)]
pub use uds::CompanionListener;
