//! Broadcast frame type
//!
//! A `BroadcastFrame` is one encoded message on its way to every subscriber
//! of a channel.

use bytes::Bytes;

/// How the frame is delivered on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// Binary WebSocket message
    Binary,
    /// UTF-8 text WebSocket message
    Text,
}

/// A message to be broadcast to subscribers
///
/// This is designed to be cheap to clone due to `Bytes` reference counting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastFrame {
    /// Wire message kind
    pub kind: FrameKind,
    /// Encoded payload (zero-copy via reference counting)
    pub data: Bytes,
}

impl BroadcastFrame {
    /// Create a binary frame
    pub fn binary(data: Bytes) -> Self {
        Self {
            kind: FrameKind::Binary,
            data,
        }
    }

    /// Create a text frame
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: FrameKind::Text,
            data: Bytes::from(text.into()),
        }
    }

    pub fn is_binary(&self) -> bool {
        self.kind == FrameKind::Binary
    }

    /// Payload size in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
