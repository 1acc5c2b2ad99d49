//! Media handling for the relay
//!
//! This module provides:
//! - RGB565 to RGB24 pixel conversion
//! - Transient video/audio frame types

pub mod frame;
pub mod pixel;

pub use frame::{AudioFrame, VideoFrame};
pub use pixel::{convert_pixels_to_rgb24, convert_rgb565_to_rgb24, rgb565_to_rgb888};
