use std::fmt;
use std::io;

use jsonstream_client::{ClientError, Outcome};
use jsonstream_frame::FrameError;
use jsonstream_transport::TransportError;

pub const SUCCESS: i32 = 0;
/// `crash` command, malformed message, or any other protocol/I/O failure.
pub const FAILURE: i32 = 1;
pub const CONNECT_FAILED: i32 = 2;
/// A `large` string arrived with a length other than its declared `large_size`.
pub const SIZE_MISMATCH: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;
pub const INTERRUPTED: i32 = 130;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn outcome_code(outcome: Outcome) -> i32 {
    match outcome {
        Outcome::Exit | Outcome::PeerClosed => SUCCESS,
        Outcome::Crash => FAILURE,
    }
}

/// Exit code for a rejected command line. `--help` and `--version` exit 0.
pub fn parse_error_code(err: &clap::Error) -> i32 {
    if err.use_stderr() {
        USAGE
    } else {
        SUCCESS
    }
}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        _ => FAILURE,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    if err.is_connect_failure() {
        return CliError::new(CONNECT_FAILED, format!("{context}: {err}"));
    }
    match err {
        TransportError::Bind { source, .. }
        | TransportError::Accept(source)
        | TransportError::Io(source) => io_error(context, source),
        other => CliError::new(FAILURE, format!("{context}: {other}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        other => CliError::new(FAILURE, format!("{context}: {other}")),
    }
}

pub fn client_error(context: &str, err: ClientError) -> CliError {
    match err {
        ClientError::Transport(err) => transport_error(context, err),
        ClientError::Frame(err) => frame_error(context, err),
        ClientError::Timeout(_) => CliError::new(TIMEOUT, format!("{context}: {err}")),
        ClientError::LargeSizeMismatch { .. } => {
            CliError::new(SIZE_MISMATCH, format!("{context}: {err}"))
        }
        ClientError::Encode(_) => CliError::new(INTERNAL, format!("{context}: {err}")),
        ClientError::Malformed(_) | ClientError::Closed => {
            CliError::new(FAILURE, format!("{context}: {err}"))
        }
    }
}
