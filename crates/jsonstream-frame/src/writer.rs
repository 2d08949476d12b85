use std::io::{ErrorKind, Write};

use bytes::BytesMut;
use jsonstream_transport::JsonStream;

use crate::codec::{encode_message, FrameConfig};
use crate::error::{FrameError, Result};
use crate::reader::transport_to_frame_error;

/// Writes newline-terminated JSON objects to a `Write` stream.
///
/// The object and its newline are staged in one buffer so a message never
/// reaches the wire in pieces interleaved with another.
pub struct FrameWriter<T> {
    inner: T,
    staging: BytesMut,
    config: FrameConfig,
}

impl<T: Write> FrameWriter<T> {
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            staging: BytesMut::new(),
            config,
        }
    }

    /// Send one serialized JSON object (blocking).
    ///
    /// Oversized payloads and payloads containing a raw newline are rejected
    /// before anything is written.
    pub fn send(&mut self, payload: &[u8]) -> Result<()> {
        let max = self.config.max_message_size;
        if payload.len() > max {
            return Err(FrameError::MessageTooLarge {
                size: payload.len(),
                max,
            });
        }

        self.staging.clear();
        encode_message(payload, &mut self.staging)?;
        write_frame(&mut self.inner, &self.staging)?;
        tracing::trace!(bytes = self.staging.len(), "wrote message");
        Ok(())
    }

    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }

    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl FrameWriter<JsonStream> {
    /// Wrap a connected stream, applying `config.write_timeout` to it.
    pub fn with_config_stream(inner: JsonStream, config: FrameConfig) -> Result<Self> {
        inner
            .set_write_timeout(config.write_timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }
}

/// Write all of `frame` and flush, retrying only on `Interrupted`.
///
/// `WouldBlock`/`TimedOut` surface as I/O errors so a write timeout is honored.
fn write_frame<W: Write>(out: &mut W, mut frame: &[u8]) -> Result<()> {
    while !frame.is_empty() {
        match out.write(frame) {
            Ok(0) => return Err(FrameError::ConnectionClosed),
            Ok(n) => frame = &frame[n..],
            Err(err) if err.kind() == ErrorKind::Interrupted => {}
            Err(err) => return Err(err.into()),
        }
    }
    loop {
        match out.flush() {
            Err(err) if err.kind() == ErrorKind::Interrupted => {}
            other => return other.map_err(FrameError::from),
        }
    }
}
