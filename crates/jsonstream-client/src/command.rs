use serde_json::{Map, Value};

use crate::error::MalformedMessage;

/// `command` value that terminates the client with status 0.
pub const COMMAND_EXIT: &str = "exit";
/// `command` value that terminates the client with status 1.
pub const COMMAND_CRASH: &str = "crash";
/// `command` value that asks for one envelope.
pub const COMMAND_REPLY: &str = "reply";
/// `command` value that asks for `count` envelopes.
pub const COMMAND_FLURRY: &str = "flurry";

/// A directive carried in the `command` field of an inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Exit,
    Crash,
    Reply,
    /// `count` is `None` when the field is missing or not a non-negative
    /// integer. Integral floats such as `3.0` count as integers.
    Flurry { count: Option<u64> },
    /// Anything outside the known set; ignored by the client.
    Unsupported(String),
}

impl Command {
    fn from_fields(command: &Value, count: Option<&Value>) -> Option<Self> {
        let name = match command {
            Value::String(name) if name.is_empty() => return None,
            Value::String(name) => name.as_str(),
            other => return Some(Command::Unsupported(other.to_string())),
        };

        Some(match name {
            COMMAND_EXIT => Command::Exit,
            COMMAND_CRASH => Command::Crash,
            COMMAND_REPLY => Command::Reply,
            COMMAND_FLURRY => Command::Flurry {
                count: count.and_then(integral_count),
            },
            other => Command::Unsupported(other.to_string()),
        })
    }

    /// Wire name, for diagnostics.
    pub fn name(&self) -> &str {
        match self {
            Command::Exit => COMMAND_EXIT,
            Command::Crash => COMMAND_CRASH,
            Command::Reply => COMMAND_REPLY,
            Command::Flurry { .. } => COMMAND_FLURRY,
            Command::Unsupported(name) => name,
        }
    }
}

fn integral_count(value: &Value) -> Option<u64> {
    if let Some(count) = value.as_u64() {
        return Some(count);
    }
    let count = value.as_f64()?;
    (count.is_finite() && count >= 0.0 && count.fract() == 0.0 && count <= u64::MAX as f64)
        .then_some(count as u64)
}

/// A decoded inbound message.
///
/// Any JSON object is accepted. Only `command`, `count`, `large` and
/// `large_size` are interpreted; the remaining members are kept for
/// diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct Inbound {
    pub command: Option<Command>,
    pub body: Map<String, Value>,
}

impl Inbound {
    /// Decode one complete message.
    pub fn parse(bytes: &[u8]) -> Result<Self, MalformedMessage> {
        let body = match serde_json::from_slice::<Value>(bytes)? {
            Value::Object(body) => body,
            other => return Err(MalformedMessage::NotAnObject(json_type_name(&other))),
        };

        let command = body
            .get("command")
            .and_then(|command| Command::from_fields(command, body.get("count")));

        Ok(Self { command, body })
    }

    /// Compare a `large` string with its declared `large_size`.
    ///
    /// Returns `None` when neither member is present. A missing or
    /// non-string `large` counts as empty and a missing or non-numeric
    /// `large_size` as zero. Length is counted in UTF-16 code units, the unit
    /// the server declares sizes in.
    pub fn large_check(&self) -> Option<LargeCheck> {
        if !self.body.contains_key(LARGE) && !self.body.contains_key(LARGE_SIZE) {
            return None;
        }
        let actual = self
            .body
            .get(LARGE)
            .and_then(Value::as_str)
            .map_or(0, |large| large.encode_utf16().count());
        let declared = self
            .body
            .get(LARGE_SIZE)
            .and_then(Value::as_f64)
            .unwrap_or(0.0);
        Some(LargeCheck { actual, declared })
    }
}

/// Member carrying a large string for transport checks.
pub const LARGE: &str = "large";
/// Member declaring the length of [`LARGE`].
pub const LARGE_SIZE: &str = "large_size";

/// Result of [`Inbound::large_check`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LargeCheck {
    /// Received length of `large`.
    pub actual: usize,
    /// Value of `large_size`.
    pub declared: f64,
}

impl LargeCheck {
    pub fn is_intact(&self) -> bool {
        self.actual as f64 == self.declared
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
