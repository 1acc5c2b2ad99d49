//! Relay wire protocol
//!
//! This module provides:
//! - Wire constants (frame tags, button bits)
//! - Binary video/audio frame encoding and decoding
//! - Control command decoding from JSON

pub mod codec;
pub mod constants;
pub mod control;

pub use codec::{
    decode_audio, decode_video, encode_audio, encode_video, DecodedAudio, DecodedVideo,
};
pub use control::ControlCommand;
