//! Error types
//!
//! Each subsystem owns a focused error enum; [`Error`] aggregates them for
//! callers that drive the whole relay.

use thiserror::Error;

/// Top-level error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Control message error: {0}")]
    Control(#[from] ControlDecodeError),

    #[error("Frame decode error: {0}")]
    Frame(#[from] FrameDecodeError),

    #[error("Broker error: {0}")]
    Broker(#[from] BrokerError),
}

/// Failure to turn an inbound control payload into a command
#[derive(Error, Debug)]
pub enum ControlDecodeError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("control message is not a JSON object")]
    NotAnObject,

    #[error("missing `type` field")]
    MissingType,

    #[error("unknown control type: {0}")]
    UnknownType(String),

    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("field `{field}` has an invalid value")]
    InvalidField { field: &'static str },
}

impl ControlDecodeError {
    /// Valid JSON that simply names no command
    ///
    /// These are logged and dropped rather than retried; redelivery can
    /// never make them decode.
    pub fn is_unroutable(&self) -> bool {
        matches!(
            self,
            ControlDecodeError::NotAnObject
                | ControlDecodeError::MissingType
                | ControlDecodeError::UnknownType(_)
        )
    }
}

/// Failure to parse an outbound binary frame
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameDecodeError {
    #[error("empty frame")]
    Empty,

    #[error("unexpected frame tag 0x{0:02x}")]
    UnexpectedTag(u8),

    #[error("frame truncated: need {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },
}

/// Broker bridge failures
#[derive(Error, Debug)]
pub enum BrokerError {
    #[error("broker endpoint not configured (set {0})")]
    MissingEndpoint(&'static str),

    #[error("AMQP error: {0}")]
    Amqp(#[from] lapin::Error),

    #[error("bridge already running")]
    AlreadyRunning,
}

pub type Result<T> = std::result::Result<T, Error>;
