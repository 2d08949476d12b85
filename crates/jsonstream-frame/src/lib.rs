//! JSON object framing over byte streams.
//!
//! Wire contract:
//! - Senders write each message as one compact JSON object followed by `\n`.
//! - Receivers delimit messages by balanced top-level braces, skipping
//!   whitespace between objects. Peers that emit indented or back-to-back
//!   objects interoperate with peers that emit newline-delimited JSON.
//!
//! Partial and coalesced reads are reassembled here, so callers always get
//! complete objects.

pub mod codec;
pub mod error;
pub mod reader;
pub mod writer;

#[cfg(feature = "async")]
pub mod async_codec;

#[cfg(feature = "async")]
pub use async_codec::JsonObjectCodec;
pub use codec::{
    decode_message, encode_message, FrameConfig, ScanState, DEFAULT_MAX_MESSAGE, DELIMITER,
};
pub use error::{FrameError, Result};
pub use reader::FrameReader;
pub use writer::FrameWriter;
