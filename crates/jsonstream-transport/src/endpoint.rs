use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::TransportError;

/// Socket path used when no endpoint is configured.
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/tst_socket";

/// Where the client connects. Exactly one endpoint is active per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Filesystem-addressed local domain socket.
    Local(PathBuf),
    /// TCP host and port.
    Tcp { host: String, port: u16 },
}

impl Endpoint {
    /// Local socket endpoint at `path`.
    pub fn local(path: impl Into<PathBuf>) -> Self {
        Endpoint::Local(path.into())
    }

    /// Parse a `host:port` pair into a TCP endpoint.
    ///
    /// IPv6 literals must be bracketed (`[::1]:4000`).
    pub fn parse_tcp(input: &str) -> Result<Self, TransportError> {
        let invalid = |reason| TransportError::InvalidEndpoint {
            input: input.to_string(),
            reason,
        };

        let (host, port) = input
            .rsplit_once(':')
            .ok_or_else(|| invalid("expected host:port"))?;
        let host = host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host);
        if host.is_empty() {
            return Err(invalid("host must not be empty"));
        }
        if host.contains(':') && !input.starts_with('[') {
            return Err(invalid("IPv6 hosts must be bracketed"));
        }
        let port: u16 = port.parse().map_err(|_| invalid("port must be 0-65535"))?;
        if port == 0 {
            return Err(invalid("port must be non-zero"));
        }

        Ok(Endpoint::Tcp {
            host: host.to_string(),
            port,
        })
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        match self {
            Endpoint::Local(_) => "local-socket",
            Endpoint::Tcp { .. } => "tcp",
        }
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Endpoint::Local(PathBuf::from(DEFAULT_SOCKET_PATH))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Local(path) => write!(f, "{}", path.display()),
            Endpoint::Tcp { host, port } if host.contains(':') => write!(f, "[{host}]:{port}"),
            Endpoint::Tcp { host, port } => write!(f, "{host}:{port}"),
        }
    }
}

impl FromStr for Endpoint {
    type Err = TransportError;

    /// `tcp://host:port` selects TCP; anything else is a local socket path.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.strip_prefix("tcp://") {
            Some(rest) => Endpoint::parse_tcp(rest),
            None if s.is_empty() => Err(TransportError::InvalidEndpoint {
                input: String::new(),
                reason: "socket path must not be empty",
            }),
            None => Ok(Endpoint::local(s)),
        }
    }
}
