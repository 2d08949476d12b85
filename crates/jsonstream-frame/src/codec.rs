use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Message terminator written after every outbound object.
pub const DELIMITER: u8 = b'\n';

/// Default maximum message size: 1 MiB.
pub const DEFAULT_MAX_MESSAGE: usize = 1024 * 1024;

/// Incremental scanner state for [`decode_message`].
///
/// Keeps the position reached in the receive buffer so that bytes already
/// examined are not rescanned when more data arrives.
#[derive(Debug, Clone, Default)]
pub struct ScanState {
    offset: usize,
    depth: usize,
    in_string: bool,
    escaped: bool,
}

impl ScanState {
    /// Whether the scanner is in the middle of an object.
    pub fn in_message(&self) -> bool {
        self.offset > 0
    }
}

/// Encode one message into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────────────────────────────┬──────┐
/// │ compact JSON object (UTF-8)  │ "\n" │
/// └──────────────────────────────┴──────┘
/// ```
///
/// `payload` must not contain a raw newline. Compact `serde_json` output
/// never does, since newlines inside strings are escaped.
pub fn encode_message(payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    if let Some(offset) = payload.iter().position(|&b| b == DELIMITER) {
        return Err(FrameError::EmbeddedNewline { offset });
    }
    dst.reserve(payload.len() + 1);
    dst.put_slice(payload);
    dst.put_u8(DELIMITER);
    Ok(())
}

/// Decode one JSON object from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete object yet.
/// On success, consumes the object bytes from the buffer. Whitespace between
/// objects is dropped. Only object boundaries are located here; whether the
/// bytes are valid JSON is for the caller's parser to decide.
pub fn decode_message(
    src: &mut BytesMut,
    scan: &mut ScanState,
    max_message: usize,
) -> Result<Option<Bytes>> {
    if !scan.in_message() {
        match src.iter().position(|b| !b.is_ascii_whitespace()) {
            Some(start) => src.advance(start),
            None => {
                src.clear();
                return Ok(None);
            }
        }

        if src[0] != b'{' {
            let byte = src[0];
            let discarded = src
                .iter()
                .position(|&b| b == b'{' || b == DELIMITER)
                .unwrap_or(src.len());
            src.advance(discarded);
            return Err(FrameError::UnexpectedByte { byte, discarded });
        }
    }

    while scan.offset < src.len() {
        let byte = src[scan.offset];
        scan.offset += 1;

        if scan.in_string {
            if scan.escaped {
                scan.escaped = false;
            } else if byte == b'\\' {
                scan.escaped = true;
            } else if byte == b'"' {
                scan.in_string = false;
            }
            continue;
        }

        match byte {
            b'"' => scan.in_string = true,
            b'{' | b'[' => scan.depth += 1,
            b'}' | b']' => {
                scan.depth -= 1;
                if scan.depth == 0 {
                    let len = scan.offset;
                    *scan = ScanState::default();
                    if len > max_message {
                        return Err(FrameError::MessageTooLarge {
                            size: len,
                            max: max_message,
                        });
                    }
                    return Ok(Some(src.split_to(len).freeze()));
                }
            }
            _ => {}
        }
    }

    if src.len() > max_message {
        return Err(FrameError::MessageTooLarge {
            size: src.len(),
            max: max_message,
        });
    }

    Ok(None) // Need more data
}

/// Configuration for message readers and writers.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum message size in bytes. Default: 1 MiB.
    pub max_message_size: usize,
    /// Read timeout for blocking operations.
    pub read_timeout: Option<std::time::Duration>,
    /// Write timeout for blocking operations.
    pub write_timeout: Option<std::time::Duration>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_message_size: DEFAULT_MAX_MESSAGE,
            read_timeout: None,
            write_timeout: None,
        }
    }
}
