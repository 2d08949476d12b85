use std::io;
use std::os::unix::fs::{FileTypeExt, MetadataExt, PermissionsExt};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::stream::JsonStream;

/// `sockaddr_un.sun_path` capacity, including the trailing NUL.
#[cfg(target_os = "linux")]
pub const MAX_SOCKET_PATH: usize = 108;
#[cfg(not(target_os = "linux"))]
pub const MAX_SOCKET_PATH: usize = 104;

/// Mode applied to socket files created by [`LocalListener::bind`].
pub const SOCKET_MODE: u32 = 0o600;

/// Connect to a server listening on a local socket path.
pub fn connect(path: &Path) -> Result<JsonStream> {
    check_path_len(path)?;
    let stream = UnixStream::connect(path).map_err(|source| TransportError::Connect {
        endpoint: path.display().to_string(),
        source,
    })?;
    debug!(path = %path.display(), "connected to local socket");
    Ok(JsonStream::from_unix(stream))
}

/// Server side of a local socket, for harnesses that stand in for a
/// jsonstream server.
///
/// The socket file is removed on drop, unless something else has replaced it
/// in the meantime.
pub struct LocalListener {
    listener: UnixListener,
    path: PathBuf,
    identity: FileIdentity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileIdentity {
    dev: u64,
    ino: u64,
}

impl FileIdentity {
    /// Identity of the socket at `path`, or `None` if the path holds anything else.
    fn socket_at(path: &Path) -> io::Result<Option<Self>> {
        let metadata = std::fs::symlink_metadata(path)?;
        Ok(metadata.file_type().is_socket().then(|| Self {
            dev: metadata.dev(),
            ino: metadata.ino(),
        }))
    }
}

impl LocalListener {
    /// Listen on `path`, replacing a stale socket file left there earlier.
    ///
    /// Refuses to touch an existing path that is not a socket.
    pub fn bind(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        check_path_len(&path)?;
        let bind_err = |source: io::Error| TransportError::Bind {
            path: path.clone(),
            source,
        };

        match FileIdentity::socket_at(&path) {
            Ok(Some(_)) => {
                debug!(path = %path.display(), "removing stale socket");
                std::fs::remove_file(&path).map_err(bind_err)?;
            }
            Ok(None) => {
                return Err(bind_err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    "existing path is not a socket",
                )));
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(bind_err(err)),
        }

        let listener = UnixListener::bind(&path).map_err(bind_err)?;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(SOCKET_MODE))
            .map_err(bind_err)?;
        let identity = FileIdentity::socket_at(&path)
            .map_err(bind_err)?
            .ok_or_else(|| bind_err(io::Error::other("socket file vanished after bind")))?;

        info!(path = %path.display(), "listening on local socket");
        Ok(Self {
            listener,
            path,
            identity,
        })
    }

    /// Wait for the next client (blocking).
    pub fn accept(&self) -> Result<JsonStream> {
        let (stream, _) = self.listener.accept().map_err(TransportError::Accept)?;
        debug!(path = %self.path.display(), "accepted client");
        Ok(JsonStream::from_unix(stream))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LocalListener {
    fn drop(&mut self) {
        match FileIdentity::socket_at(&self.path) {
            Ok(Some(identity)) if identity == self.identity => {
                let _ = std::fs::remove_file(&self.path);
            }
            _ => debug!(path = %self.path.display(), "socket path replaced; leaving it"),
        }
    }
}

fn check_path_len(path: &Path) -> Result<()> {
    let len = path.as_os_str().len();
    if len >= MAX_SOCKET_PATH {
        return Err(TransportError::PathTooLong {
            path: path.to_path_buf(),
            len,
            max: MAX_SOCKET_PATH,
        });
    }
    Ok(())
}
