#![cfg(all(unix, feature = "cli"))]

use std::io::Write;
use std::net::TcpListener;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};
use std::thread;

use jsonstream_client::Envelope;
use jsonstream_frame::{FrameReader, FrameWriter};
use jsonstream_transport::{JsonStream, LocalListener};
use serde_json::{json, Value};

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = PathBuf::from(format!(
        "/tmp/jscli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn client_command() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_jsonstream-testclient"));
    cmd.env_remove("JSONSTREAM_SOCKET")
        .env_remove("JSONSTREAM_TCP")
        .env_remove("JSONSTREAM_TOKEN")
        .arg("--log-level")
        .arg("debug")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    cmd
}

struct ServerSide {
    reader: FrameReader<JsonStream>,
    writer: FrameWriter<JsonStream>,
}

impl ServerSide {
    fn new(stream: JsonStream) -> Self {
        Self {
            writer: FrameWriter::new(stream.try_clone().expect("stream should clone")),
            reader: FrameReader::new(stream),
        }
    }

    fn recv_value(&mut self) -> Value {
        let bytes = self.reader.read_message().expect("client message should arrive");
        serde_json::from_slice(&bytes).expect("client message should be JSON")
    }

    fn recv_envelope(&mut self) -> Envelope {
        let bytes = self.reader.read_message().expect("envelope should arrive");
        let envelope = Envelope::from_json(&bytes).expect("envelope should decode");
        assert!(envelope.has_standard_fields(), "{envelope:?}");
        envelope
    }

    fn send(&mut self, message: Value) {
        let payload = serde_json::to_vec(&message).expect("message should encode");
        self.writer.send(&payload).expect("message should send");
    }

    fn send_raw(&mut self, bytes: &[u8]) {
        let stream = self.writer.get_mut();
        stream.write_all(bytes).expect("raw bytes should send");
        stream.flush().expect("raw bytes should flush");
    }

    fn wait_for_disconnect(&mut self) {
        loop {
            match self.reader.read_message() {
                Ok(_) => continue,
                Err(err) if err.is_closed() => return,
                Err(err) if err.is_recoverable() => continue,
                Err(_) => return,
            }
        }
    }
}

/// Run the client against a one-shot local socket server driven by `script`.
fn run_local_session<F, T>(tag: &str, extra_args: &[&str], script: F) -> (Output, T)
where
    F: FnOnce(&mut ServerSide) -> T + Send + 'static,
    T: Send + 'static,
{
    let dir = unique_temp_dir(tag);
    let sock_path = dir.join("server.sock");
    let listener = LocalListener::bind(&sock_path).expect("listener should bind");

    let server = thread::spawn(move || {
        let stream = listener.accept().expect("listener should accept");
        let mut side = ServerSide::new(stream);
        script(&mut side)
    });

    let output = client_command()
        .arg("--socket")
        .arg(&sock_path)
        .args(extra_args)
        .output()
        .expect("client should run");

    let result = server.join().expect("server thread should finish");
    let _ = std::fs::remove_dir_all(&dir);
    (output, result)
}

fn assert_quiet_stdout(output: &Output) {
    assert!(
        output.stdout.is_empty(),
        "stdout should stay empty, got: {}",
        String::from_utf8_lossy(&output.stdout)
    );
}

#[test]
fn exit_command_ends_with_status_zero() {
    let (output, opening) = run_local_session("exit", &[], |side| {
        let opening = side.recv_envelope();
        side.send(json!({ "command": "exit" }));
        side.wait_for_disconnect();
        opening
    });

    assert_eq!(opening.number, 0);
    assert_eq!(output.status.code(), Some(0));
    assert_quiet_stdout(&output);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Standard text"), "stderr: {stderr}");
}

#[test]
fn crash_command_ends_with_status_one() {
    let (output, ()) = run_local_session("crash", &[], |side| {
        side.recv_envelope();
        side.send(json!({ "command": "crash" }));
        side.wait_for_disconnect();
    });

    assert_eq!(output.status.code(), Some(1));
    assert_quiet_stdout(&output);
}

#[test]
fn reply_and_flurry_continue_the_sequence() {
    let (output, numbers) = run_local_session("flurry", &[], |side| {
        let mut numbers = vec![side.recv_envelope().number];
        side.send(json!({ "command": "reply" }));
        numbers.push(side.recv_envelope().number);
        side.send(json!({ "command": "flurry", "count": 3 }));
        for _ in 0..3 {
            numbers.push(side.recv_envelope().number);
        }
        side.send(json!({ "command": "exit" }));
        side.wait_for_disconnect();
        numbers
    });

    assert_eq!(numbers, vec![0, 1, 2, 3, 4]);
    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn unknown_and_empty_commands_are_ignored() {
    let (output, number) = run_local_session("ignored", &[], |side| {
        side.recv_envelope();
        side.send(json!({ "command": "dance" }));
        side.send(json!({ "command": "" }));
        side.send(json!({ "text": "no command here" }));
        side.send(json!({ "command": "flurry" }));
        side.send(json!({ "command": "reply" }));
        let number = side.recv_envelope().number;
        side.send(json!({ "command": "exit" }));
        side.wait_for_disconnect();
        number
    });

    assert_eq!(number, 1);
    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn indented_server_messages_are_accepted() {
    let (output, number) = run_local_session("indented", &[], |side| {
        side.recv_envelope();
        side.send_raw(b"{\n    \"command\": \"reply\"\n}\n");
        let number = side.recv_envelope().number;
        side.send_raw(b"{\n    \"command\": \"exit\"\n}\n");
        side.wait_for_disconnect();
        number
    });

    assert_eq!(number, 1);
    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn peer_close_ends_with_status_zero() {
    let (output, ()) = run_local_session("peer-close", &[], |side| {
        side.recv_envelope();
    });

    assert_eq!(output.status.code(), Some(0));
    assert_quiet_stdout(&output);
}

#[test]
fn malformed_message_is_fatal_by_default() {
    let (output, ()) = run_local_session("malformed-fatal", &[], |side| {
        side.recv_envelope();
        side.send_raw(b"[1,2]\n");
        side.wait_for_disconnect();
    });

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error:"), "stderr: {stderr}");
}

#[test]
fn malformed_message_skipped_on_request() {
    let (output, number) = run_local_session(
        "malformed-skip",
        &["--on-malformed", "skip"],
        |side| {
            side.recv_envelope();
            side.send_raw(b"not json\n{\"command\": }\n");
            side.send(json!({ "command": "reply" }));
            let number = side.recv_envelope().number;
            side.send(json!({ "command": "exit" }));
            side.wait_for_disconnect();
            number
        },
    );

    assert_eq!(number, 1);
    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn token_registration_precedes_first_envelope() {
    let (output, (registration, opening)) =
        run_local_session("token", &["--token", "secret"], |side| {
            let registration = side.recv_value();
            let opening = side.recv_envelope();
            side.send(json!({ "command": "exit" }));
            side.wait_for_disconnect();
            (registration, opening)
        });

    assert_eq!(registration, json!({ "token": "secret" }));
    assert_eq!(opening.number, 0);
    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn read_timeout_ends_with_status_124() {
    let (output, ()) = run_local_session("timeout", &["--read-timeout", "200ms"], |side| {
        side.recv_envelope();
        side.wait_for_disconnect();
    });

    assert_eq!(output.status.code(), Some(124));
}

#[test]
fn legacy_single_dash_socket_flag() {
    let dir = unique_temp_dir("legacy");
    let sock_path = dir.join("server.sock");
    let listener = LocalListener::bind(&sock_path).expect("listener should bind");

    let server = thread::spawn(move || {
        let mut side = ServerSide::new(listener.accept().expect("listener should accept"));
        side.recv_envelope();
        side.send(json!({ "command": "exit" }));
        side.wait_for_disconnect();
    });

    let output = client_command()
        .arg("-socket")
        .arg(&sock_path)
        .output()
        .expect("client should run");

    server.join().expect("server thread should finish");
    assert_eq!(output.status.code(), Some(0));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn tcp_session() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("tcp listener should bind");
    let addr = listener.local_addr().expect("listener should have an address");

    let server = thread::spawn(move || {
        let (stream, _) = listener.accept().expect("tcp listener should accept");
        let mut side = ServerSide::new(JsonStream::from_tcp(stream));
        side.recv_envelope();
        side.send(json!({ "command": "flurry", "count": 2 }));
        let numbers = [side.recv_envelope().number, side.recv_envelope().number];
        side.send(json!({ "command": "crash" }));
        side.wait_for_disconnect();
        numbers
    });

    let output = client_command()
        .arg("--tcp")
        .arg(addr.to_string())
        .output()
        .expect("client should run");

    assert_eq!(server.join().expect("server thread should finish"), [1, 2]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn missing_socket_is_connect_failure() {
    let dir = unique_temp_dir("missing");
    let output = client_command()
        .arg("--socket")
        .arg(dir.join("absent.sock"))
        .output()
        .expect("client should run");

    assert_eq!(output.status.code(), Some(2));
    assert_quiet_stdout(&output);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to connect"), "stderr: {stderr}");
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn large_string_intact_then_reply() {
    let (output, number) = run_local_session("large-ok", &[], |side| {
        side.recv_envelope();
        let large = "L".repeat(200_000);
        side.send(json!({ "large": large, "large_size": 200_000, "command": "reply" }));
        let number = side.recv_envelope().number;
        side.send(json!({ "command": "exit" }));
        side.wait_for_disconnect();
        number
    });

    assert_eq!(number, 1);
    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn large_string_size_mismatch_exits_three() {
    let (output, ()) = run_local_session("large-bad", &[], |side| {
        side.recv_envelope();
        side.send(json!({ "large": "short", "large_size": 6, "command": "reply" }));
        side.wait_for_disconnect();
    });

    assert_eq!(output.status.code(), Some(3));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("size mismatch"), "stderr: {stderr}");
}

#[test]
fn schema_flag_opens_with_paint_text_event() {
    let (output, (opening, reply)) = run_local_session("schema", &["-schema"], |side| {
        let opening = side.recv_value();
        side.send(json!({ "command": "reply" }));
        let reply = side.recv_envelope();
        side.send(json!({ "command": "exit" }));
        side.wait_for_disconnect();
        (opening, reply)
    });

    assert_eq!(
        opening,
        json!({
            "event": "PaintTextEvent",
            "text": "Schema test",
            "font-size": 100,
            "x": 25,
            "y": 100,
            "bold": true
        })
    );
    assert_eq!(reply.number, 0);
    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn socket_env_does_not_block_explicit_tcp() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("tcp listener should bind");
    let addr = listener.local_addr().expect("listener should have an address");

    let server = thread::spawn(move || {
        let (stream, _) = listener.accept().expect("tcp listener should accept");
        let mut side = ServerSide::new(JsonStream::from_tcp(stream));
        side.recv_envelope();
        side.send(json!({ "command": "exit" }));
        side.wait_for_disconnect();
    });

    let output = client_command()
        .env("JSONSTREAM_SOCKET", "/tmp/jscli-env-unused.sock")
        .arg("--tcp")
        .arg(addr.to_string())
        .output()
        .expect("client should run");

    server.join().expect("server thread should finish");
    assert_eq!(
        output.status.code(),
        Some(0),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn socket_env_is_used_without_flags() {
    let dir = unique_temp_dir("env-socket");
    let sock_path = dir.join("server.sock");
    let listener = LocalListener::bind(&sock_path).expect("listener should bind");

    let server = thread::spawn(move || {
        let mut side = ServerSide::new(listener.accept().expect("listener should accept"));
        side.recv_envelope();
        side.send(json!({ "command": "exit" }));
        side.wait_for_disconnect();
    });

    let output = client_command()
        .env("JSONSTREAM_SOCKET", &sock_path)
        .output()
        .expect("client should run");

    server.join().expect("server thread should finish");
    assert_eq!(output.status.code(), Some(0));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn unknown_flag_is_usage_error() {
    let output = client_command()
        .arg("--socket")
        .arg("/tmp/jscli-unused.sock")
        .arg("--bogus")
        .output()
        .expect("client should run");

    assert_eq!(output.status.code(), Some(64));
    assert_quiet_stdout(&output);
}

#[test]
fn help_exits_zero() {
    let output = client_command().arg("--help").output().expect("client should run");
    assert_eq!(output.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&output.stdout).contains("--socket"));
}

#[test]
fn invalid_registration_is_usage_error() {
    let output = client_command()
        .arg("--socket")
        .arg("/tmp/jscli-unused.sock")
        .arg("--registration")
        .arg("[]")
        .output()
        .expect("client should run");

    assert_eq!(output.status.code(), Some(64));
}
