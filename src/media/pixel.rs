//! RGB565 to RGB24 pixel conversion
//!
//! The engine renders into a packed 16-bit framebuffer:
//!
//! ```text
//!  15      11 10         5 4       0
//! +----------+------------+---------+
//! |  R (5)   |   G (6)    |  B (5)  |
//! +----------+------------+---------+
//! ```
//!
//! Rows may be padded, so the source stride can exceed `width * 2` bytes.
//! Output is tightly packed RGB24, row-major, no padding.

/// Bytes per source pixel
pub const RGB565_BYTES_PER_PIXEL: usize = 2;

/// Bytes per output pixel
pub const RGB24_BYTES_PER_PIXEL: usize = 3;

/// Expand a single RGB565 pixel to 8-bit channels
#[inline]
pub fn rgb565_to_rgb888(pixel: u16) -> [u8; 3] {
    let r = ((pixel >> 11) & 0x1F) << 3;
    let g = ((pixel >> 5) & 0x3F) << 2;
    let b = (pixel & 0x1F) << 3;
    [r as u8, g as u8, b as u8]
}

/// Size of the converted buffer for a frame
#[inline]
pub fn rgb24_len(width: usize, height: usize) -> usize {
    width * height * RGB24_BYTES_PER_PIXEL
}

/// Convert a little-endian RGB565 byte buffer to RGB24.
///
/// `stride` is the source row length in bytes. The output is always exactly
/// `width * height * 3` bytes. A stride or buffer that understates the frame
/// is a caller error; pixels that fall outside `src` come out black.
pub fn convert_rgb565_to_rgb24(src: &[u8], width: usize, height: usize, stride: usize) -> Vec<u8> {
    let mut out = vec![0u8; rgb24_len(width, height)];
    if width == 0 {
        return out;
    }

    for (y, dst_row) in out.chunks_exact_mut(width * RGB24_BYTES_PER_PIXEL).enumerate() {
        let row_start = y * stride;
        let Some(src_row) = src.get(row_start..) else {
            break;
        };

        for (dst, px) in dst_row
            .chunks_exact_mut(RGB24_BYTES_PER_PIXEL)
            .zip(src_row.chunks_exact(RGB565_BYTES_PER_PIXEL))
        {
            let pixel = u16::from_le_bytes([px[0], px[1]]);
            dst.copy_from_slice(&rgb565_to_rgb888(pixel));
        }
    }

    out
}

/// Convert an RGB565 pixel slice to RGB24.
///
/// Same as [`convert_rgb565_to_rgb24`] but for callers that already hold
/// `u16` pixels; `stride_pixels` is the row length in pixels.
pub fn convert_pixels_to_rgb24(
    src: &[u16],
    width: usize,
    height: usize,
    stride_pixels: usize,
) -> Vec<u8> {
    let mut out = vec![0u8; rgb24_len(width, height)];
    if width == 0 {
        return out;
    }

    for (y, dst_row) in out.chunks_exact_mut(width * RGB24_BYTES_PER_PIXEL).enumerate() {
        let Some(src_row) = src.get(y * stride_pixels..) else {
            break;
        };
        for (dst, &pixel) in dst_row.chunks_exact_mut(RGB24_BYTES_PER_PIXEL).zip(src_row) {
            dst.copy_from_slice(&rgb565_to_rgb888(pixel));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn to_le_bytes(pixels: &[u16]) -> Vec<u8> {
        pixels.iter().flat_map(|p| p.to_le_bytes()).collect()
    }

    #[test]
    fn test_primary_colors() {
        assert_eq!(rgb565_to_rgb888(0xF800), [248, 0, 0]);
        assert_eq!(rgb565_to_rgb888(0x07E0), [0, 252, 0]);
        assert_eq!(rgb565_to_rgb888(0x001F), [0, 0, 248]);
        assert_eq!(rgb565_to_rgb888(0xFFFF), [248, 252, 248]);
        assert_eq!(rgb565_to_rgb888(0x0000), [0, 0, 0]);
    }

    #[test]
    fn test_channel_ranges_for_all_pixels() {
        for pixel in 0..=u16::MAX {
            let [r, g, b] = rgb565_to_rgb888(pixel);
            assert!(r <= 248 && r % 8 == 0, "red {} from {:#06x}", r, pixel);
            assert!(g <= 252 && g % 4 == 0, "green {} from {:#06x}", g, pixel);
            assert!(b <= 248 && b % 8 == 0, "blue {} from {:#06x}", b, pixel);
        }
    }

    #[test]
    fn test_output_length() {
        let src = to_le_bytes(&[0u16; 6]);
        let out = convert_rgb565_to_rgb24(&src, 3, 2, 6);
        assert_eq!(out.len(), 3 * 2 * 3);
    }

    #[test]
    fn test_padded_stride_skips_padding() {
        // 2x2 frame, each row padded with one junk pixel (stride = 6 bytes)
        let src = to_le_bytes(&[0xF800, 0x07E0, 0xFFFF, 0x001F, 0x0000, 0xFFFF]);
        let out = convert_rgb565_to_rgb24(&src, 2, 2, 6);

        assert_eq!(
            out,
            vec![
                248, 0, 0, 0, 252, 0, // row 0
                0, 0, 248, 0, 0, 0, // row 1
            ]
        );
    }

    #[test]
    fn test_short_buffer_is_black() {
        let src = to_le_bytes(&[0xFFFF]);
        let out = convert_rgb565_to_rgb24(&src, 2, 2, 4);

        assert_eq!(out.len(), 12);
        assert_eq!(&out[..3], &[248, 252, 248]);
        assert!(out[3..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_pixel_slice_matches_byte_conversion() {
        let pixels = [0x1234u16, 0xABCD, 0x0F0F, 0xF0F0];
        let from_bytes = convert_rgb565_to_rgb24(&to_le_bytes(&pixels), 2, 2, 4);
        let from_pixels = convert_pixels_to_rgb24(&pixels, 2, 2, 2);
        assert_eq!(from_bytes, from_pixels);
    }

    #[test]
    fn test_zero_sized_frame() {
        assert!(convert_rgb565_to_rgb24(&[], 0, 10, 0).is_empty());
        assert!(convert_rgb565_to_rgb24(&[], 10, 0, 20).is_empty());
    }
}
