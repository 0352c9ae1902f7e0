use std::fmt;
use std::path::PathBuf;

use crate::error::Result;
use crate::stream::IpcStream;

/// Channel name the companion listens on by default.
pub const DEFAULT_CHANNEL_NAME: &str = "DVC_voice_local";

const PIPE_PREFIX: &str = r"\\.\pipe\";

/// Address of the companion's end of the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Filesystem path of a Unix domain socket.
    Socket(PathBuf),
    /// Full Windows named pipe name, e.g. `\\.\pipe\DVC_voice_local`.
    Pipe(String),
}

impl Endpoint {
    /// A Unix domain socket endpoint.
    pub fn socket(path: impl Into<PathBuf>) -> Self {
        Self::Socket(path.into())
    }

    /// A named pipe endpoint. Bare names get the `\\.\pipe\` prefix.
    pub fn pipe(name: &str) -> Self {
        if name.starts_with(PIPE_PREFIX) {
            Self::Pipe(name.to_string())
        } else {
            Self::Pipe(format!("{PIPE_PREFIX}{name}"))
        }
    }

    /// The endpoint the companion uses when nothing else is configured.
    ///
    /// Windows: `\\.\pipe\DVC_voice_local`. Elsewhere: `DVC_voice_local.sock`
    /// in the system temp directory.
    pub fn platform_default() -> Self {
        #[cfg(windows)]
        {
            Self::pipe(DEFAULT_CHANNEL_NAME)
        }
        #[cfg(not(windows))]
        {
            Self::socket(std::env::temp_dir().join(format!("{DEFAULT_CHANNEL_NAME}.sock")))
        }
    }

    /// Path-like rendering used in error values.
    pub fn to_path_buf(&self) -> PathBuf {
        match self {
            Self::Socket(path) => path.clone(),
            Self::Pipe(name) => PathBuf::from(name),
        }
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self::platform_default()
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Socket(path) => write!(f, "{}", path.display()),
            Self::Pipe(name) => f.write_str(name),
        }
    }
}

impl std::str::FromStr for Endpoint {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.starts_with(PIPE_PREFIX) {
            Ok(Self::Pipe(s.to_string()))
        } else {
            Ok(Self::Socket(PathBuf::from(s)))
        }
    }
}

/// Open the client end of the channel (blocking, fails fast when nobody listens).
pub fn connect(endpoint: &Endpoint) -> Result<IpcStream> {
    match endpoint {
        Endpoint::Socket(path) => connect_socket(path),
        Endpoint::Pipe(name) => connect_pipe(name),
    }
}

#[cfg(unix)]
fn connect_socket(path: &std::path::Path) -> Result<IpcStream> {
    crate::uds::connect(path)
}

#[cfg(not(unix))]
fn connect_socket(path: &std::path::Path) -> Result<IpcStream> {
    Err(crate::TransportError::Unsupported(
        path.display().to_string(),
    ))
}

#[cfg(windows)]
fn connect_pipe(name: &str) -> Result<IpcStream> {
    crate::pipe::connect(name)
}

#[cfg(not(windows))]
fn connect_pipe(name: &str) -> Result<IpcStream> {
    Err(crate::TransportError::Unsupported(name.to_string()))
}
