use serde::{Deserialize, Serialize};

/// `text` carried by every client-originated envelope.
pub const STANDARD_TEXT: &str = "Standard text";
/// `int` carried by every client-originated envelope.
pub const FIXED_INT: i64 = 100;
/// `float` carried by every client-originated envelope.
pub const FIXED_FLOAT: f64 = 100.0;
/// `array` carried by every client-originated envelope.
pub const FIXED_ARRAY: [&str; 3] = ["one", "two", "three"];
/// `object.item1` carried by every client-originated envelope.
pub const ITEM1: &str = "This is item 1";
/// `object.item2` carried by every client-originated envelope.
pub const ITEM2: &str = "This is item 2";

/// The single message structure exchanged between client and server.
///
/// Besides `number`, every field holds a fixed value chosen to cover each
/// JSON type. `command` and `count` only appear on server-originated
/// envelopes and are left out of the serialized form when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub text: String,
    pub number: u64,
    pub int: i64,
    pub float: f64,
    #[serde(rename = "true")]
    pub yes: bool,
    #[serde(rename = "false")]
    pub no: bool,
    pub array: Vec<String>,
    pub object: EnvelopeObject,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
}

/// The nested `object` member of an [`Envelope`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeObject {
    pub item1: String,
    pub item2: String,
}

impl Envelope {
    /// Build the standard client envelope carrying sequence `number`.
    pub fn standard(number: u64) -> Self {
        Self {
            text: STANDARD_TEXT.to_string(),
            number,
            int: FIXED_INT,
            float: FIXED_FLOAT,
            yes: true,
            no: false,
            array: FIXED_ARRAY.iter().map(|s| s.to_string()).collect(),
            object: EnvelopeObject {
                item1: ITEM1.to_string(),
                item2: ITEM2.to_string(),
            },
            command: None,
            count: None,
        }
    }

    /// Serialize to compact UTF-8 JSON (no trailing newline).
    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// Parse an envelope from JSON bytes.
    pub fn from_json(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }

    /// Whether every fixed-value field holds its standard value.
    pub fn has_standard_fields(&self) -> bool {
        self.text == STANDARD_TEXT
            && self.int == FIXED_INT
            && self.float == FIXED_FLOAT
            && self.yes
            && !self.no
            && self.array.iter().map(String::as_str).eq(FIXED_ARRAY)
            && self.object.item1 == ITEM1
            && self.object.item2 == ITEM2
    }
}

/// Opening message sent instead of the standard envelope when exercising a
/// server's schema validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaTestMessage {
    pub event: String,
    pub text: String,
    #[serde(rename = "font-size")]
    pub font_size: i64,
    pub x: i64,
    pub y: i64,
    pub bold: bool,
}

impl SchemaTestMessage {
    /// The `PaintTextEvent` message.
    pub fn paint_text() -> Self {
        Self {
            event: "PaintTextEvent".to_string(),
            text: "Schema test".to_string(),
            font_size: 100,
            x: 25,
            y: 100,
            bold: true,
        }
    }
}
