//! Self-healing client connection to the speech companion.
//!
//! A [`VoiceClient`] owns one engine thread that keeps the channel open,
//! mirrors sticky configuration to the companion after every (re)connect,
//! sends one-shot commands in a fixed order, and queues what the companion
//! sends back. Producers and consumers never touch the channel directly.

pub mod client;
pub mod config;
pub mod connector;
mod engine;
pub mod error;
pub mod inbox;
pub mod mailbox;
pub mod sticky;

pub use client::VoiceClient;
pub use config::{
    ClientConfig, DEFAULT_IDLE_INTERVAL, DEFAULT_RECONNECT_BACKOFF, DEFAULT_RESPONSE_CAPACITY,
};
pub use connector::{Channel, CloseChannel, Connector, EndpointConnector};
pub use error::{ClientError, Result};
pub use inbox::{ConnectionEvent, EventCell, ResponseQueue};
pub use mailbox::Outbox;
pub use sticky::{StickySlot, StickyStore};
