use std::time::Duration;

use voxlink_transport::Endpoint;
use voxlink_wire::{WireConfig, DEFAULT_MAX_LINE_LENGTH, DEFAULT_WRITE_TIMEOUT};

/// Default pause between connect attempts.
pub const DEFAULT_RECONNECT_BACKOFF: Duration = Duration::from_secs(1);
/// Default pause after a service cycle that moved no bytes.
pub const DEFAULT_IDLE_INTERVAL: Duration = Duration::from_millis(15);
/// Default bound of the response queue.
pub const DEFAULT_RESPONSE_CAPACITY: usize = 128;

/// Settings for a [`crate::VoiceClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Where the companion listens.
    pub endpoint: Endpoint,
    pub reconnect_backoff: Duration,
    pub idle_interval: Duration,
    /// Responses kept for the consumer; older ones are shed first.
    pub response_capacity: usize,
    /// How long one command may wait on a full channel before the
    /// connection is considered broken. `None` waits until the client is stopped.
    pub write_timeout: Option<Duration>,
    /// Inbound bytes tolerated without a newline.
    pub max_line_length: usize,
    /// Name of the engine thread.
    pub thread_name: String,
}

impl ClientConfig {
    /// Defaults, talking to `endpoint`.
    pub fn with_endpoint(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            ..Self::default()
        }
    }

    pub(crate) fn wire_config(&self) -> WireConfig {
        WireConfig {
            max_line_length: self.max_line_length,
            write_timeout: self.write_timeout,
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: Endpoint::platform_default(),
            reconnect_backoff: DEFAULT_RECONNECT_BACKOFF,
            idle_interval: DEFAULT_IDLE_INTERVAL,
            response_capacity: DEFAULT_RESPONSE_CAPACITY,
            write_timeout: Some(DEFAULT_WRITE_TIMEOUT),
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            thread_name: "voxlink-engine".to_string(),
        }
    }
}
