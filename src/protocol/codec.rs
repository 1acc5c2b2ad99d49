//! Binary frame codec
//!
//! Outbound media is sent as binary WebSocket messages:
//!
//! ```text
//! Video:  +------+-------------+--------------+----------------------+
//!         | 0x01 | width (u32) | height (u32) | RGB24 pixels         |
//!         +------+-------------+--------------+----------------------+
//!
//! Audio:  +------+------------------+--------------------------------+
//!         | 0x02 | sample_count u32 | interleaved stereo i16 PCM     |
//!         +------+------------------+--------------------------------+
//! ```
//!
//! All integers are little-endian. The rom-loaded notification is a text
//! message, not a binary frame.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::FrameDecodeError;
use crate::media::{AudioFrame, VideoFrame};

use super::constants::{
    AUDIO_FRAME_TAG, AUDIO_HEADER_SIZE, ROM_LOADED_NOTIFICATION, VIDEO_FRAME_TAG,
    VIDEO_HEADER_SIZE,
};

/// Encode a converted video frame
pub fn encode_video(frame: &VideoFrame) -> Bytes {
    encode_video_parts(frame.width, frame.height, &frame.rgb24)
}

/// Encode a video frame from its raw parts
pub fn encode_video_parts(width: u32, height: u32, rgb24: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(VIDEO_HEADER_SIZE + rgb24.len());
    buf.put_u8(VIDEO_FRAME_TAG);
    buf.put_u32_le(width);
    buf.put_u32_le(height);
    buf.put_slice(rgb24);
    buf.freeze()
}

/// Encode an audio block
pub fn encode_audio(frame: &AudioFrame) -> Bytes {
    encode_audio_parts(frame.samples, &frame.pcm)
}

/// Encode an audio block from its raw parts
pub fn encode_audio_parts(samples: u32, pcm: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(AUDIO_HEADER_SIZE + pcm.len());
    buf.put_u8(AUDIO_FRAME_TAG);
    buf.put_u32_le(samples);
    buf.put_slice(pcm);
    buf.freeze()
}

/// The rom-loaded text notification
pub fn rom_loaded_notification() -> &'static str {
    ROM_LOADED_NOTIFICATION
}

/// A parsed video frame (viewer side)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedVideo {
    pub width: u32,
    pub height: u32,
    pub rgb24: Bytes,
}

/// A parsed audio block (viewer side)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedAudio {
    pub samples: u32,
    pub pcm: Bytes,
}

/// Parse a binary video frame.
///
/// The payload is returned as-is; no check is made that it matches
/// `width * height * 3`.
pub fn decode_video(data: Bytes) -> Result<DecodedVideo, FrameDecodeError> {
    let mut data = check_header(data, VIDEO_FRAME_TAG, VIDEO_HEADER_SIZE)?;
    data.advance(1);
    let width = data.get_u32_le();
    let height = data.get_u32_le();

    Ok(DecodedVideo {
        width,
        height,
        rgb24: data,
    })
}

/// Parse a binary audio block
pub fn decode_audio(data: Bytes) -> Result<DecodedAudio, FrameDecodeError> {
    let mut data = check_header(data, AUDIO_FRAME_TAG, AUDIO_HEADER_SIZE)?;
    data.advance(1);
    let samples = data.get_u32_le();

    Ok(DecodedAudio { samples, pcm: data })
}

fn check_header(data: Bytes, tag: u8, header_size: usize) -> Result<Bytes, FrameDecodeError> {
    let first = *data.first().ok_or(FrameDecodeError::Empty)?;
    if first != tag {
        return Err(FrameDecodeError::UnexpectedTag(first));
    }
    if data.len() < header_size {
        return Err(FrameDecodeError::Truncated {
            needed: header_size,
            available: data.len(),
        });
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_header_layout() {
        let encoded = encode_video_parts(256, 224, &[1, 2, 3]);

        assert_eq!(encoded[0], 0x01);
        assert_eq!(&encoded[1..5], &256u32.to_le_bytes());
        assert_eq!(&encoded[5..9], &224u32.to_le_bytes());
        assert_eq!(&encoded[9..], &[1, 2, 3]);
    }

    #[test]
    fn test_video_round_trip() {
        let payload: Vec<u8> = (0..(4 * 3 * 3)).map(|i| i as u8).collect();
        let frame = VideoFrame {
            width: 4,
            height: 3,
            stride: 8,
            rgb24: Bytes::from(payload.clone()),
        };

        let decoded = decode_video(encode_video(&frame)).unwrap();
        assert_eq!(decoded.width, 4);
        assert_eq!(decoded.height, 3);
        assert_eq!(&decoded.rgb24[..], &payload[..]);
    }

    #[test]
    fn test_audio_header_layout() {
        let frame = AudioFrame::from_interleaved(&[100, -100, 7, -7]);
        let encoded = encode_audio(&frame);

        assert_eq!(encoded[0], 0x02);
        assert_eq!(&encoded[1..5], &2u32.to_le_bytes());
        assert_eq!(encoded.len(), AUDIO_HEADER_SIZE + 8);

        let decoded = decode_audio(encoded).unwrap();
        assert_eq!(decoded.samples, 2);
        assert_eq!(decoded.pcm, frame.pcm);
    }

    #[test]
    fn test_decode_rejects_wrong_tag() {
        let audio = encode_audio_parts(1, &[0, 0, 0, 0]);
        assert_eq!(
            decode_video(audio),
            Err(FrameDecodeError::UnexpectedTag(AUDIO_FRAME_TAG))
        );
    }

    #[test]
    fn test_decode_rejects_truncated_header() {
        let data = Bytes::from_static(&[VIDEO_FRAME_TAG, 0x10, 0x00]);
        assert_eq!(
            decode_video(data),
            Err(FrameDecodeError::Truncated {
                needed: VIDEO_HEADER_SIZE,
                available: 3
            })
        );
        assert_eq!(decode_audio(Bytes::new()), Err(FrameDecodeError::Empty));
    }

    #[test]
    fn test_rom_loaded_notification_is_json() {
        let value: serde_json::Value = serde_json::from_str(rom_loaded_notification()).unwrap();
        assert_eq!(value["type"], "romLoaded");
    }
}
