//! Transient video and audio frames
//!
//! Frames are produced once per engine event, encoded, broadcast and dropped.

use bytes::Bytes;

use super::pixel::convert_rgb565_to_rgb24;

/// A converted video frame ready for encoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFrame {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Row stride of the source buffer in bytes
    pub stride: u32,
    /// Packed RGB24 pixels (`width * height * 3` bytes)
    pub rgb24: Bytes,
}

impl VideoFrame {
    /// Build a frame from a raw RGB565 engine buffer
    pub fn from_rgb565(src: &[u8], width: u32, height: u32, stride: u32) -> Self {
        let rgb24 = convert_rgb565_to_rgb24(src, width as usize, height as usize, stride as usize);
        Self {
            width,
            height,
            stride,
            rgb24: Bytes::from(rgb24),
        }
    }
}

/// A block of interleaved stereo 16-bit PCM
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFrame {
    /// Number of stereo sample pairs
    pub samples: u32,
    /// Interleaved L/R i16 little-endian PCM, 4 bytes per sample pair
    pub pcm: Bytes,
}

impl AudioFrame {
    /// Bytes per stereo sample pair
    pub const BYTES_PER_SAMPLE_PAIR: usize = 4;

    pub fn new(samples: u32, pcm: Bytes) -> Self {
        Self { samples, pcm }
    }

    /// Build a frame from interleaved i16 samples
    pub fn from_interleaved(samples: &[i16]) -> Self {
        let pcm: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        Self {
            samples: (samples.len() / 2) as u32,
            pcm: Bytes::from(pcm),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_frame_from_rgb565() {
        let src = [0x00, 0xF8, 0xE0, 0x07]; // red, green
        let frame = VideoFrame::from_rgb565(&src, 2, 1, 4);

        assert_eq!(frame.width, 2);
        assert_eq!(frame.height, 1);
        assert_eq!(&frame.rgb24[..], &[248, 0, 0, 0, 252, 0]);
    }

    #[test]
    fn test_audio_from_interleaved() {
        let frame = AudioFrame::from_interleaved(&[1, -1, 256, -256]);

        assert_eq!(frame.samples, 2);
        assert_eq!(frame.pcm.len(), 2 * AudioFrame::BYTES_PER_SAMPLE_PAIR);
        assert_eq!(&frame.pcm[..4], &[0x01, 0x00, 0xFF, 0xFF]);
    }
}
