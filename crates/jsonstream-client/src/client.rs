use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use jsonstream_frame::{FrameError, FrameReader, FrameWriter, DEFAULT_MAX_MESSAGE};
use jsonstream_transport::JsonStream;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::command::{Command, Inbound};
use crate::envelope::{Envelope, SchemaTestMessage};
use crate::error::{ClientError, MalformedMessage, Result};

/// Default upper bound on envelopes sent for a single `flurry`.
pub const DEFAULT_MAX_FLURRY: u64 = 10_000;

/// Message sent once, right after connecting.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Registration {
    /// Send nothing.
    #[default]
    None,
    /// Send `{"token": <token>}` for servers that authorize by token.
    Token(String),
    /// Send this object verbatim.
    Message(Map<String, Value>),
}

impl Registration {
    /// Serialized registration payload, or `None` when nothing is sent.
    pub fn to_payload(&self) -> Option<serde_json::Result<Vec<u8>>> {
        match self {
            Registration::None => None,
            Registration::Token(token) => {
                Some(serde_json::to_vec(&serde_json::json!({ "token": token })))
            }
            Registration::Message(message) => Some(serde_json::to_vec(message)),
        }
    }
}

/// What to do when an inbound message cannot be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MalformedPolicy {
    /// Close the connection and surface [`ClientError::Malformed`].
    #[default]
    Fatal,
    /// Log, discard the message and keep reading.
    Skip,
}

/// Configuration for a client connection.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Sent once after connecting.
    pub registration: Registration,
    /// Handling of undecodable inbound messages.
    pub malformed: MalformedPolicy,
    /// Upper bound on envelopes sent for one `flurry`.
    pub max_flurry: u64,
    /// TCP connect timeout. `None` blocks until the OS gives up.
    pub connect_timeout: Option<Duration>,
    /// Maximum wait for an inbound message. `None` waits forever.
    pub read_timeout: Option<Duration>,
    pub write_timeout: Option<Duration>,
    /// Largest inbound or outbound message accepted, in bytes.
    pub max_message_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            registration: Registration::None,
            malformed: MalformedPolicy::Fatal,
            max_flurry: DEFAULT_MAX_FLURRY,
            connect_timeout: None,
            read_timeout: None,
            write_timeout: None,
            max_message_size: DEFAULT_MAX_MESSAGE,
        }
    }
}

/// Connection lifecycle. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Closed,
}

/// Why the receive loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The server sent `exit`.
    Exit,
    /// The server sent `crash`.
    Crash,
    /// The server closed the connection.
    PeerClosed,
}

/// Protocol client owning one connection.
///
/// Holds the envelope counter: the next envelope sent carries
/// `number == self.sent()`.
pub struct Client<R = JsonStream, W = JsonStream> {
    reader: FrameReader<R>,
    writer: FrameWriter<W>,
    config: ClientConfig,
    state: ConnectionState,
    sent: u64,
    registered: bool,
}

impl<R: Read, W: Write> Client<R, W> {
    /// Assemble a client from an already-connected reader/writer pair.
    pub fn from_parts(
        reader: FrameReader<R>,
        writer: FrameWriter<W>,
        config: ClientConfig,
    ) -> Self {
        Self {
            reader,
            writer,
            config,
            state: ConnectionState::Connected,
            sent: 0,
            registered: false,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Number of envelopes sent so far on this client.
    pub fn sent(&self) -> u64 {
        self.sent
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Mark the connection closed. Further I/O fails with [`ClientError::Closed`].
    pub fn close(&mut self) {
        if self.state == ConnectionState::Connected {
            debug!(sent = self.sent, "closing connection");
            self.state = ConnectionState::Closed;
        }
    }

    /// On-connect hook: send the configured registration message.
    ///
    /// Returns `true` if a message was written. Fires at most once per client.
    pub fn register(&mut self) -> Result<bool> {
        self.ensure_connected()?;
        if self.registered {
            return Ok(false);
        }
        let Some(payload) = self.config.registration.to_payload() else {
            self.registered = true;
            return Ok(false);
        };
        let payload = payload.map_err(ClientError::Encode)?;

        info!(
            payload = %String::from_utf8_lossy(&payload),
            "sending registration message"
        );
        self.write(&payload)?;
        self.registered = true;
        Ok(true)
    }

    /// Build, send and count one standard envelope.
    pub fn send_envelope(&mut self) -> Result<Envelope> {
        self.ensure_connected()?;
        let envelope = Envelope::standard(self.sent);
        let payload = envelope.to_json().map_err(ClientError::Encode)?;

        info!(
            number = envelope.number,
            payload = %String::from_utf8_lossy(&payload),
            "sending envelope"
        );
        self.write(&payload)?;
        self.sent += 1;
        Ok(envelope)
    }

    /// Send the schema test message in place of an envelope.
    ///
    /// Does not advance the envelope counter.
    pub fn send_schema_test(&mut self) -> Result<SchemaTestMessage> {
        self.ensure_connected()?;
        let message = SchemaTestMessage::paint_text();
        let payload = serde_json::to_vec(&message).map_err(ClientError::Encode)?;

        info!(
            payload = %String::from_utf8_lossy(&payload),
            "sending schema test message"
        );
        self.write(&payload)?;
        Ok(message)
    }

    /// Receive the next decodable message.
    ///
    /// Returns `Ok(None)` once the peer has closed the connection. Malformed
    /// messages are skipped or surfaced according to [`MalformedPolicy`].
    pub fn recv(&mut self) -> Result<Option<Inbound>> {
        self.ensure_connected()?;
        loop {
            let malformed = match self.reader.read_message() {
                Ok(bytes) => {
                    debug!(payload = %String::from_utf8_lossy(&bytes), "received message");
                    match Inbound::parse(&bytes) {
                        Ok(inbound) => return Ok(Some(inbound)),
                        Err(err) => err,
                    }
                }
                Err(err) if err.is_closed() => {
                    if let FrameError::Truncated { buffered } = err {
                        warn!(buffered, "peer closed connection mid-message");
                    } else {
                        info!("peer closed connection");
                    }
                    self.close();
                    return Ok(None);
                }
                Err(err) if err.is_recoverable() => MalformedMessage::Framing(err),
                Err(FrameError::Io(err))
                    if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
                        && self.config.read_timeout.is_some() =>
                {
                    self.close();
                    return Err(ClientError::Timeout(
                        self.config.read_timeout.unwrap_or_default(),
                    ));
                }
                Err(err) => {
                    self.close();
                    return Err(err.into());
                }
            };

            match self.config.malformed {
                MalformedPolicy::Skip => {
                    warn!(error = %malformed, "skipping malformed message");
                }
                MalformedPolicy::Fatal => {
                    self.close();
                    return Err(malformed.into());
                }
            }
        }
    }

    /// Apply an inbound message's command.
    ///
    /// A `large` string is checked against `large_size` first; a mismatch
    /// closes the connection with [`ClientError::LargeSizeMismatch`].
    /// Returns `Some(outcome)` when the command ends the session.
    pub fn handle(&mut self, inbound: &Inbound) -> Result<Option<Outcome>> {
        if let Some(check) = inbound.large_check() {
            if !check.is_intact() {
                warn!(
                    actual = check.actual,
                    declared = check.declared,
                    "large string size mismatch"
                );
                self.close();
                return Err(ClientError::LargeSizeMismatch {
                    actual: check.actual,
                    declared: check.declared,
                });
            }
            debug!(size = check.actual, "large string intact");
        }

        let Some(command) = &inbound.command else {
            return Ok(None);
        };
        info!(command = command.name(), "received command");

        match command {
            Command::Exit => {
                self.close();
                Ok(Some(Outcome::Exit))
            }
            Command::Crash => {
                self.close();
                Ok(Some(Outcome::Crash))
            }
            Command::Reply => {
                self.send_envelope()?;
                Ok(None)
            }
            Command::Flurry { count: Some(count) } => {
                let count = if *count > self.config.max_flurry {
                    warn!(
                        requested = *count,
                        max = self.config.max_flurry,
                        "flurry count above limit; truncating"
                    );
                    self.config.max_flurry
                } else {
                    *count
                };
                for _ in 0..count {
                    self.send_envelope()?;
                }
                Ok(None)
            }
            Command::Flurry { count: None } => {
                warn!("flurry without a usable count; ignoring");
                Ok(None)
            }
            Command::Unsupported(name) => {
                debug!(command = %name, "ignoring unsupported command");
                Ok(None)
            }
        }
    }

    /// Receive and dispatch messages until a command or the peer ends the session.
    pub fn run(&mut self) -> Result<Outcome> {
        loop {
            let Some(inbound) = self.recv()? else {
                return Ok(Outcome::PeerClosed);
            };
            if let Some(outcome) = self.handle(&inbound)? {
                return Ok(outcome);
            }
        }
    }

    fn ensure_connected(&self) -> Result<()> {
        match self.state {
            ConnectionState::Connected => Ok(()),
            ConnectionState::Closed => Err(ClientError::Closed),
        }
    }

    fn write(&mut self, payload: &[u8]) -> Result<()> {
        if let Err(err) = self.writer.send(payload) {
            // A rejected payload never reached the wire; anything else leaves
            // the stream in an unknown state.
            if !matches!(
                err,
                FrameError::MessageTooLarge { .. } | FrameError::EmbeddedNewline { .. }
            ) {
                self.close();
            }
            return Err(err.into());
        }
        Ok(())
    }
}
