//! Control command decoding
//!
//! Both ingress paths (the `/control` WebSocket and the broker queue) carry
//! the same JSON shapes:
//!
//! ```text
//! {"type":"input","port":0,"buttons":{"a":true,"start":true}}
//! {"type":"mouse","port":0,"x":10,"y":20,"left":true,"right":false}
//! {"type":"reset"}
//! {"type":"pause","paused":true}
//! ```
//!
//! Field checks are lenient in the way browser clients expect: a missing
//! `port` is port 0, and button flags use JavaScript truthiness (absent,
//! `false`, `null`, `0` and `""` all mean "not pressed"). `paused` is the
//! exception: it must be a real boolean when present.

use serde_json::{Map, Value};

use crate::error::ControlDecodeError;

use super::constants::BUTTON_FIELDS;

/// Normalized control command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    /// Joypad state for a port
    Input { port: u32, button_mask: u16 },
    /// Pointer (mouse) position and optional button state
    Pointer {
        port: u32,
        x: i32,
        y: i32,
        left: Option<bool>,
        right: Option<bool>,
    },
    /// Hard reset
    Reset,
    /// Pause or resume execution
    Pause { paused: bool },
}

impl ControlCommand {
    /// Short name used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            ControlCommand::Input { .. } => "input",
            ControlCommand::Pointer { .. } => "mouse",
            ControlCommand::Reset => "reset",
            ControlCommand::Pause { .. } => "pause",
        }
    }

    /// Decode from UTF-8 JSON text
    pub fn from_json_str(text: &str) -> Result<Self, ControlDecodeError> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(&value)
    }

    /// Decode from raw JSON bytes (broker message bodies)
    pub fn from_json_slice(body: &[u8]) -> Result<Self, ControlDecodeError> {
        let value: Value = serde_json::from_slice(body)?;
        Self::from_value(&value)
    }

    /// Decode from an already-parsed JSON value
    pub fn from_value(value: &Value) -> Result<Self, ControlDecodeError> {
        let obj = value.as_object().ok_or(ControlDecodeError::NotAnObject)?;
        let kind = obj
            .get("type")
            .and_then(Value::as_str)
            .ok_or(ControlDecodeError::MissingType)?;

        match kind {
            "input" => {
                let buttons = obj
                    .get("buttons")
                    .filter(|v| !v.is_null())
                    .ok_or(ControlDecodeError::MissingField("buttons"))?;
                Ok(ControlCommand::Input {
                    port: port(obj)?,
                    button_mask: button_mask(buttons),
                })
            }
            "mouse" => Ok(ControlCommand::Pointer {
                port: port(obj)?,
                x: coordinate(obj, "x")?,
                y: coordinate(obj, "y")?,
                left: obj.get("left").map(truthy),
                right: obj.get("right").map(truthy),
            }),
            "reset" => Ok(ControlCommand::Reset),
            "pause" => Ok(ControlCommand::Pause {
                paused: paused(obj)?,
            }),
            other => Err(ControlDecodeError::UnknownType(other.to_string())),
        }
    }
}

/// Fold a `buttons` object into the joypad bit mask
pub fn button_mask(buttons: &Value) -> u16 {
    BUTTON_FIELDS
        .iter()
        .filter(|(name, _)| buttons.get(*name).is_some_and(truthy))
        .fold(0, |mask, (_, bit)| mask | bit)
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn port(obj: &Map<String, Value>) -> Result<u32, ControlDecodeError> {
    match obj.get("port") {
        None | Some(Value::Null) => Ok(0),
        Some(v) => v
            .as_u64()
            .and_then(|p| u32::try_from(p).ok())
            .ok_or(ControlDecodeError::InvalidField { field: "port" }),
    }
}

/// Absent means pause; anything but a JSON bool is rejected
fn paused(obj: &Map<String, Value>) -> Result<bool, ControlDecodeError> {
    match obj.get("paused") {
        None => Ok(true),
        Some(Value::Bool(b)) => Ok(*b),
        Some(_) => Err(ControlDecodeError::InvalidField { field: "paused" }),
    }
}

fn coordinate(obj: &Map<String, Value>, field: &'static str) -> Result<i32, ControlDecodeError> {
    let value = obj
        .get(field)
        .filter(|v| !v.is_null())
        .ok_or(ControlDecodeError::MissingField(field))?;

    value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f.trunc() as i64))
        .and_then(|v| i32::try_from(v).ok())
        .ok_or(ControlDecodeError::InvalidField { field })
}
