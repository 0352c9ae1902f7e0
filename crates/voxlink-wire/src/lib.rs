//! Line-oriented text protocol spoken with the speech companion.
//!
//! Every message is one ASCII line terminated by `\n`, with `|` separating
//! fields. Outbound lines carry commands and sticky configuration; inbound
//! lines carry recognition results, triggers, and debug text.
//!
//! The codec is pure; [`LineReader`] and [`LineWriter`] add the byte-stream
//! plumbing (partial reads, non-blocking writes).

pub mod codec;
pub mod command;
pub mod error;
pub mod favorites;
pub mod message;
pub mod reader;
pub mod sanitize;
pub mod writer;

pub use codec::{
    encode_command, LineDecoder, WireConfig, DEFAULT_MAX_LINE_LENGTH, DEFAULT_WRITE_TIMEOUT,
};
pub use command::{Command, ConfigToggle};
pub use error::{Result, WireError};
pub use favorites::{
    parse_favorite_line, FavoriteLine, FavoritesBatch, ItemEntry, PowerEntry, ShoutEntry,
};
pub use message::{
    decode_line, InboundLine, InboundMessage, Trigger, TriggerKind, TriggerTarget,
    CLOSE_REQUEST_INDEX, NO_MATCH_INDEX, STATUS_PREFIX,
};
pub use reader::LineReader;
pub use sanitize::{sanitize_field, sanitize_line};
pub use writer::LineWriter;
