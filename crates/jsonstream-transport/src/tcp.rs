use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::debug;

use crate::error::{Result, TransportError};
use crate::stream::JsonStream;

/// Connect to a TCP endpoint (blocking).
///
/// Every resolved address is tried in order; the last failure is reported.
pub fn connect(host: &str, port: u16, timeout: Option<Duration>) -> Result<JsonStream> {
    let endpoint = if host.contains(':') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    };
    let connect_err = |source| TransportError::Connect {
        endpoint: endpoint.clone(),
        source,
    };

    let addrs = (host, port).to_socket_addrs().map_err(connect_err)?;

    let mut last_err = None;
    for addr in addrs {
        let attempt = match timeout {
            Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
            None => TcpStream::connect(addr),
        };
        match attempt {
            Ok(stream) => {
                stream.set_nodelay(true).map_err(connect_err)?;
                debug!(%addr, "connected to tcp endpoint");
                return Ok(JsonStream::from_tcp(stream));
            }
            Err(err) => {
                debug!(%addr, error = %err, "tcp connect attempt failed");
                last_err = Some(err);
            }
        }
    }

    Err(connect_err(last_err.unwrap_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::AddrNotAvailable,
            "host resolved to no addresses",
        )
    })))
}
