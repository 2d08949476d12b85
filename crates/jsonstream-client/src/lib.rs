//! Protocol client for a jsonstream server.
//!
//! Connects over a local socket or TCP, sends standard [`Envelope`]s and
//! reacts to the closed set of server commands (`exit`, `crash`, `reply`,
//! `flurry`).

pub mod client;
pub mod command;
pub mod connector;
pub mod envelope;
pub mod error;

pub use client::{
    Client, ClientConfig, ConnectionState, MalformedPolicy, Outcome, Registration,
    DEFAULT_MAX_FLURRY,
};
pub use command::{
    Command, Inbound, LargeCheck, COMMAND_CRASH, COMMAND_EXIT, COMMAND_FLURRY, COMMAND_REPLY, LARGE,
    LARGE_SIZE,
};
pub use connector::{connect, connect_with_config};
pub use envelope::{Envelope, EnvelopeObject, SchemaTestMessage};
pub use error::{ClientError, MalformedMessage, Result};
