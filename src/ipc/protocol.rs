use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One command pushed from a CLI client to the running TUI
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Request {
    /// Command name (e.g., "run", "add-context-item-text")
    pub command: String,
    /// Positional arguments, in order
    #[serde(default)]
    pub args: Vec<String>,
    /// Piped standard input of the client, empty when none was sent
    #[serde(default)]
    pub stdin: String,
}

impl Request {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Self::default()
        }
    }

    pub fn with_args(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
            stdin: String::new(),
        }
    }

    pub fn stdin(mut self, stdin: impl Into<String>) -> Self {
        self.stdin = stdin.into();
        self
    }

    /// Positional argument at `index`, or "" when the client sent fewer
    pub fn arg(&self, index: usize) -> &str {
        self.args.get(index).map(String::as_str).unwrap_or("")
    }

    /// First argument joined with stdin: `arg0 + "\n" + stdin` when stdin is present
    pub fn text_payload(&self) -> String {
        if self.stdin.is_empty() {
            self.arg(0).to_string()
        } else {
            format!("{}\n{}", self.arg(0), self.stdin)
        }
    }
}

/// A frame that could not be turned into a `Request`
#[derive(Debug)]
pub enum DecodeError {
    Json(serde_json::Error),
    NotAnObject,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(e) => write!(f, "invalid JSON: {e}"),
            Self::NotAnObject => write!(f, "request must be a JSON object"),
        }
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Json(e) => Some(e),
            Self::NotAnObject => None,
        }
    }
}

impl From<serde_json::Error> for DecodeError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

/// Longest frame the server accepts, excluding the newline
pub const MAX_FRAME_BYTES: usize = 1 << 20;

/// Encode a request as a single newline-terminated JSON frame
pub fn encode(request: &Request) -> Vec<u8> {
    // Serializing a struct of strings cannot fail
    let mut frame = serde_json::to_vec(request).unwrap_or_default();
    frame.push(b'\n');
    frame
}

/// Decode one frame. Trailing line terminators are ignored.
pub fn decode(frame: &[u8]) -> Result<Request, DecodeError> {
    let mut end = frame.len();
    while end > 0 && matches!(frame[end - 1], b'\n' | b'\r') {
        end -= 1;
    }

    let value: Value = serde_json::from_slice(&frame[..end])?;
    if !value.is_object() {
        return Err(DecodeError::NotAnObject);
    }

    Ok(serde_json::from_value(value)?)
}
