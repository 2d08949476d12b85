//! Companion server that drives a test client through a fixed script.
//!
//! Run with:
//!   cargo run --example scripted-server -- /tmp/tst_socket reply flurry:3 exit
//!
//! In another terminal:
//!   cargo run -- -socket /tmp/tst_socket
//!
//! Each script step is `exit`, `crash`, `reply` or `flurry:<count>`. The server
//! waits for the client's opening envelope, then sends one command per step
//! and reads back as many envelopes as that command asks for.

use std::error::Error;
use std::path::PathBuf;

use jsonstream::client::{Envelope, COMMAND_CRASH, COMMAND_EXIT, COMMAND_FLURRY, COMMAND_REPLY};
use jsonstream::frame::{FrameReader, FrameWriter};
use jsonstream::transport::{LocalListener, DEFAULT_SOCKET_PATH};

fn main() -> Result<(), Box<dyn Error>> {
    let mut args = std::env::args().skip(1);
    let sock_path = PathBuf::from(args.next().unwrap_or_else(|| DEFAULT_SOCKET_PATH.to_string()));
    let script: Vec<String> = args.collect();

    let listener = LocalListener::bind(&sock_path)?;
    eprintln!("Listening on {}", sock_path.display());

    let stream = listener.accept()?;
    let mut writer = FrameWriter::new(stream.try_clone()?);
    let mut reader = FrameReader::new(stream);

    let opening = Envelope::from_json(&reader.read_message()?)?;
    eprintln!("Client opened with envelope #{}", opening.number);

    let mut sequence = 0u64;
    for step in &script {
        let (command, count) = match step.split_once(':') {
            Some((name, count)) => (name, Some(count.parse::<u64>()?)),
            None => (step.as_str(), None),
        };
        let expected = match command {
            COMMAND_REPLY => 1,
            COMMAND_FLURRY => count.unwrap_or(0),
            COMMAND_EXIT | COMMAND_CRASH => 0,
            other => return Err(format!("unknown script step: {other}").into()),
        };

        let mut message = Envelope::standard(sequence);
        message.command = Some(command.to_string());
        message.count = count;
        writer.send(&message.to_json()?)?;
        sequence += 1;
        eprintln!("Sent {step}");

        for _ in 0..expected {
            let envelope = Envelope::from_json(&reader.read_message()?)?;
            eprintln!(
                "Received envelope #{} (standard fields: {})",
                envelope.number,
                envelope.has_standard_fields()
            );
        }
    }

    match reader.read_message() {
        Err(err) if err.is_closed() => eprintln!("Client disconnected"),
        Ok(extra) => eprintln!("Unexpected message: {}", String::from_utf8_lossy(&extra)),
        Err(err) => return Err(err.into()),
    }
    Ok(())
}
