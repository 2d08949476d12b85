use jsonstream_frame::{FrameConfig, FrameReader, FrameWriter};
use jsonstream_transport::Endpoint;
use tracing::{debug, info};

use crate::client::{Client, ClientConfig};
use crate::error::Result;

/// Connect to a jsonstream server with default configuration.
pub fn connect(endpoint: &Endpoint) -> Result<Client> {
    connect_with_config(endpoint, ClientConfig::default())
}

/// Connect with explicit configuration.
///
/// On success the on-connect hook has already run: the registration message,
/// if one is configured, is on the wire.
pub fn connect_with_config(endpoint: &Endpoint, config: ClientConfig) -> Result<Client> {
    let stream = jsonstream_transport::connect(endpoint, config.connect_timeout)?;
    if let Some((uid, gid, pid)) = stream.peer_credentials() {
        debug!(uid, gid, pid, "peer credentials");
    }
    let reader_stream = stream.try_clone()?;

    let frame_config = FrameConfig {
        max_message_size: config.max_message_size,
        read_timeout: config.read_timeout,
        write_timeout: config.write_timeout,
    };
    let reader = FrameReader::with_config_stream(reader_stream, frame_config.clone())?;
    let writer = FrameWriter::with_config_stream(stream, frame_config)?;

    info!(
        %endpoint,
        transport = endpoint.transport_name(),
        "connected"
    );

    let mut client = Client::from_parts(reader, writer, config);
    client.register()?;
    Ok(client)
}

#[cfg(all(test, unix))]
mod tests {
    use std::thread;

    use jsonstream_transport::LocalListener;
    use serde_json::Value;

    use super::*;
    use crate::client::{Outcome, Registration};
    use crate::error::ClientError;

    fn unique_sock_path(tag: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "jsc-{tag}-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
        dir.join("server.sock")
    }

    #[test]
    fn registration_then_session_over_uds() {
        let sock_path = unique_sock_path("session");
        let listener = LocalListener::bind(&sock_path).expect("listener should bind");

        let server = thread::spawn(move || {
            let stream = listener.accept().expect("listener should accept");
            let mut writer = FrameWriter::new(stream.try_clone().unwrap());
            let mut reader = FrameReader::new(stream);

            let registration: Value =
                serde_json::from_slice(&reader.read_message().unwrap()).unwrap();
            let first: Value = serde_json::from_slice(&reader.read_message().unwrap()).unwrap();

            writer.send(br#"{"command":"reply"}"#).unwrap();
            let reply: Value = serde_json::from_slice(&reader.read_message().unwrap()).unwrap();
            writer.send(br#"{"command":"exit"}"#).unwrap();

            (registration, first, reply)
        });

        let config = ClientConfig {
            registration: Registration::Token("t0k3n".to_string()),
            ..ClientConfig::default()
        };
        let mut client = connect_with_config(&Endpoint::local(&sock_path), config)
            .expect("client should connect");
        client.send_envelope().expect("initial envelope should send");
        assert_eq!(client.run().expect("session should end cleanly"), Outcome::Exit);

        let (registration, first, reply) = server.join().expect("server thread should complete");
        assert_eq!(registration, serde_json::json!({ "token": "t0k3n" }));
        assert_eq!(first["number"], 0);
        assert_eq!(reply["number"], 1);

        let _ = std::fs::remove_dir_all(sock_path.parent().unwrap());
    }

    #[test]
    fn tcp_endpoint_session() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut writer = FrameWriter::new(stream.try_clone().unwrap());
            let mut reader = FrameReader::new(stream);
            let first: Value = serde_json::from_slice(&reader.read_message().unwrap()).unwrap();
            writer.send(br#"{"command":"crash"}"#).unwrap();
            first
        });

        let endpoint = Endpoint::parse_tcp(&format!("127.0.0.1:{port}")).unwrap();
        let mut client = connect(&endpoint).expect("client should connect over tcp");
        client.send_envelope().unwrap();
        assert_eq!(client.run().unwrap(), Outcome::Crash);

        let first = server.join().unwrap();
        assert_eq!(first["text"], "Standard text");
    }

    #[test]
    fn missing_socket_is_connect_failure() {
        let sock_path = unique_sock_path("missing");
        let err = connect(&Endpoint::local(&sock_path)).err().expect("connect should fail");
        assert!(matches!(err, ClientError::Transport(_)));
        assert!(err.is_connect_failure());
        let _ = std::fs::remove_dir_all(sock_path.parent().unwrap());
    }
}
