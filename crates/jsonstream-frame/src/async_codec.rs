use bytes::{Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{decode_message, encode_message, ScanState, DEFAULT_MAX_MESSAGE};
use crate::error::{FrameError, Result};

/// `tokio_util` codec with the same wire contract as
/// [`FrameReader`](crate::FrameReader) / [`FrameWriter`](crate::FrameWriter).
#[derive(Debug, Clone)]
pub struct JsonObjectCodec {
    scan: ScanState,
    max_message_size: usize,
}

impl JsonObjectCodec {
    pub fn new() -> Self {
        Self::with_max_message_size(DEFAULT_MAX_MESSAGE)
    }

    pub fn with_max_message_size(max_message_size: usize) -> Self {
        Self {
            scan: ScanState::default(),
            max_message_size,
        }
    }
}

impl Default for JsonObjectCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for JsonObjectCodec {
    type Item = Bytes;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>> {
        decode_message(src, &mut self.scan, self.max_message_size)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>> {
        if let Some(message) = self.decode(src)? {
            return Ok(Some(message));
        }
        if self.scan.in_message() {
            return Err(FrameError::Truncated {
                buffered: src.len(),
            });
        }
        Ok(None)
    }
}

impl Encoder<Bytes> for JsonObjectCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<()> {
        if item.len() > self.max_message_size {
            return Err(FrameError::MessageTooLarge {
                size: item.len(),
                max: self.max_message_size,
            });
        }
        encode_message(&item, dst)
    }
}
