/// Errors that can occur during message encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// A byte outside any JSON object that is neither whitespace nor `{`.
    ///
    /// The stray run has been discarded; decoding may continue.
    #[error("unexpected byte 0x{byte:02x} outside a JSON object ({discarded} bytes discarded)")]
    UnexpectedByte { byte: u8, discarded: usize },

    /// The message exceeds the configured maximum size.
    #[error("message too large ({size} bytes, max {max})")]
    MessageTooLarge { size: usize, max: usize },

    /// An outbound payload contains a raw newline and would break framing.
    #[error("payload contains a raw newline at offset {offset}")]
    EmbeddedNewline { offset: usize },

    /// An I/O error occurred while reading or writing messages.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection was closed between messages.
    #[error("connection closed")]
    ConnectionClosed,

    /// The connection was closed in the middle of a message.
    #[error("connection closed (incomplete message, {buffered} bytes buffered)")]
    Truncated { buffered: usize },
}

impl FrameError {
    /// Whether the peer closed the stream.
    pub fn is_closed(&self) -> bool {
        matches!(
            self,
            FrameError::ConnectionClosed | FrameError::Truncated { .. }
        )
    }

    /// Whether the error left the stream positioned at a message boundary.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, FrameError::UnexpectedByte { .. })
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
