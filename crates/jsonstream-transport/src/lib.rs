//! Socket transport for the jsonstream test client.
//!
//! Provides a single byte-stream type over the two endpoint kinds a
//! jsonstream server listens on:
//! - Local domain sockets addressed by filesystem path (Unix)
//! - TCP `host:port` pairs
//!
//! This is the lowest layer. Framing and the protocol client build on the
//! [`JsonStream`] type provided here.

pub mod endpoint;
pub mod error;
pub mod stream;
pub mod tcp;

#[cfg(unix)]
pub mod uds;

pub use endpoint::{Endpoint, DEFAULT_SOCKET_PATH};
pub use error::{Result, TransportError};
pub use stream::JsonStream;

#[cfg(unix)]
pub use uds::{LocalListener, MAX_SOCKET_PATH};

use std::time::Duration;

/// Connect to `endpoint` (blocking).
///
/// `timeout` bounds TCP connection establishment. Local socket connects
/// either succeed or fail immediately, so the timeout does not apply to them.
pub fn connect(endpoint: &Endpoint, timeout: Option<Duration>) -> Result<JsonStream> {
    match endpoint {
        #[cfg(unix)]
        Endpoint::Local(path) => {
            let _ = timeout;
            uds::connect(path)
        }
        #[cfg(not(unix))]
        Endpoint::Local(path) => {
            let _ = timeout;
            Err(TransportError::Connect {
                endpoint: endpoint.to_string(),
                source: std::io::Error::new(
                    std::io::ErrorKind::Unsupported,
                    format!("local sockets are not supported on this platform: {}", path.display()),
                ),
            })
        }
        Endpoint::Tcp { host, port } => tcp::connect(host, *port, timeout),
    }
}
