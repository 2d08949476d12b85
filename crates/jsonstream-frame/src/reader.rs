use std::io::{ErrorKind, Read};

use bytes::{Bytes, BytesMut};
use jsonstream_transport::JsonStream;

use crate::codec::{decode_message, FrameConfig, ScanState};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;
/// Bytes requested from the stream per read call.
pub const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Reads complete JSON objects from any `Read` stream.
///
/// Handles partial and coalesced reads internally; callers always get
/// complete objects, in arrival order.
pub struct FrameReader<T> {
    inner: T,
    buf: BytesMut,
    scan: ScanState,
    config: FrameConfig,
}

impl<T: Read> FrameReader<T> {
    /// Create a new message reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new message reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            scan: ScanState::default(),
            config,
        }
    }

    /// Read the next complete message (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached between
    /// messages and `Err(FrameError::Truncated)` when it cuts one short.
    pub fn read_message(&mut self) -> Result<Bytes> {
        loop {
            if let Some(message) =
                decode_message(&mut self.buf, &mut self.scan, self.config.max_message_size)?
            {
                return Ok(message);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                if self.scan.in_message() {
                    return Err(FrameError::Truncated {
                        buffered: self.buf.len(),
                    });
                }
                return Err(FrameError::ConnectionClosed);
            }

            tracing::trace!(bytes = read, "read chunk");
            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl FrameReader<JsonStream> {
    /// Create a message reader for `JsonStream` and apply read timeout from config.
    pub fn with_config_stream(inner: JsonStream, config: FrameConfig) -> Result<Self> {
        inner
            .set_read_timeout(config.read_timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }
}

pub(crate) fn transport_to_frame_error(err: jsonstream_transport::TransportError) -> FrameError {
    match err {
        jsonstream_transport::TransportError::Io(io)
        | jsonstream_transport::TransportError::Accept(io) => FrameError::Io(io),
        jsonstream_transport::TransportError::Bind { source, .. }
        | jsonstream_transport::TransportError::Connect { source, .. } => FrameError::Io(source),
        other => FrameError::Io(std::io::Error::other(other.to_string())),
    }
}
