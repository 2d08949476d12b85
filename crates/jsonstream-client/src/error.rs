/// Why an inbound message could not be interpreted.
#[derive(Debug, thiserror::Error)]
pub enum MalformedMessage {
    /// The bytes are not valid JSON.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The bytes are valid JSON but not an object.
    #[error("expected a JSON object, got {0}")]
    NotAnObject(&'static str),

    /// Bytes arrived outside any JSON object.
    #[error("{0}")]
    Framing(jsonstream_frame::FrameError),
}

/// Errors that can occur in client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level error, including failure to connect.
    #[error("transport error: {0}")]
    Transport(#[from] jsonstream_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] jsonstream_frame::FrameError),

    /// An inbound message could not be decoded.
    #[error("malformed message: {0}")]
    Malformed(#[from] MalformedMessage),

    /// An outbound message could not be serialized.
    #[error("failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),

    /// A `large` string arrived with a length other than its `large_size`.
    #[error("large string size mismatch: received {actual}, declared {declared}")]
    LargeSizeMismatch { actual: usize, declared: f64 },

    /// No message arrived within the configured read timeout.
    #[error("no message received within {0:?}")]
    Timeout(std::time::Duration),

    /// The connection is closed; no further I/O is possible.
    #[error("connection closed")]
    Closed,
}

impl ClientError {
    /// Whether this error means the endpoint could not be reached.
    pub fn is_connect_failure(&self) -> bool {
        matches!(self, ClientError::Transport(err) if err.is_connect_failure())
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
