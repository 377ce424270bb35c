//! Synthetic fixtures shared by unit tests across the crate: solid/gradient
//! pixel fills and a raw (non-JPEG) one-shot decoder test double, so
//! pipeline tests don't depend on a real codec.

use crate::decoder::OneShot;
use crate::error::{PyramidError, PyramidResult};
use crate::geometry::{LevelGeometry, BYTES_PER_PIXEL};

/// Writes `R=x mod 256, G=0, B=0, A=255` into the row-major region of a
/// level, given the level's whole mapped slice (scratch band included).
pub(crate) fn fill_gradient(full: &mut [u8], geometry: &LevelGeometry) {
    let bpp = BYTES_PER_PIXEL as usize;
    for y in 0..geometry.height as usize {
        let row_off = geometry.scanline_offset(y as u32) as usize;
        for x in 0..geometry.width as usize {
            let px = row_off + x * bpp;
            let r = (x % 256) as u8;
            full[px] = 255;
            full[px + 1] = 0;
            full[px + 2] = 0;
            full[px + 3] = r;
        }
    }
}

/// A minimal valid JPEG (1x1 white pixel, baseline, single component) used
/// to exercise the real zune-jpeg-backed adapter without shipping a binary
/// fixture file.
pub(crate) fn minimal_valid_jpeg() -> Vec<u8> {
    #[rustfmt::skip]
    let bytes: Vec<u8> = vec![
        0xFF, 0xD8,
        0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46,
        0x00, 0x01, 0x01, 0x00, 0x00, 0x01, 0x00, 0x01,
        0x00, 0x00,
        0xFF, 0xDB, 0x00, 0x43, 0x00,
        0x08, 0x06, 0x06, 0x07, 0x06, 0x05, 0x08, 0x07,
        0x07, 0x07, 0x09, 0x09, 0x08, 0x0A, 0x0C, 0x14,
        0x0D, 0x0C, 0x0B, 0x0B, 0x0C, 0x19, 0x12, 0x13,
        0x0F, 0x14, 0x1D, 0x1A, 0x1F, 0x1E, 0x1D, 0x1A,
        0x1C, 0x1C, 0x20, 0x24, 0x2E, 0x27, 0x20, 0x22,
        0x2C, 0x23, 0x1C, 0x1C, 0x28, 0x37, 0x29, 0x2C,
        0x30, 0x31, 0x34, 0x34, 0x34, 0x1F, 0x27, 0x39,
        0x3D, 0x38, 0x32, 0x3C, 0x2E, 0x33, 0x34, 0x32,
        0xFF, 0xC0, 0x00, 0x0B, 0x08, 0x00, 0x01, 0x00,
        0x01, 0x01, 0x01, 0x11, 0x00,
        0xFF, 0xC4, 0x00, 0x1F, 0x00, 0x00, 0x01, 0x05,
        0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x02,
        0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A,
        0x0B,
        0xFF, 0xC4, 0x00, 0xB5, 0x10, 0x00, 0x02, 0x01,
        0x03, 0x03, 0x02, 0x04, 0x03, 0x05, 0x05, 0x04,
        0x04, 0x00, 0x00, 0x01, 0x7D, 0x01, 0x02, 0x03,
        0x00, 0x04, 0x11, 0x05, 0x12, 0x21, 0x31, 0x41,
        0x06, 0x13, 0x51, 0x61, 0x07, 0x22, 0x71, 0x14,
        0x32, 0x81, 0x91, 0xA1, 0x08, 0x23, 0x42, 0xB1,
        0xC1, 0x15, 0x52, 0xD1, 0xF0, 0x24, 0x33, 0x62,
        0x72, 0x82, 0x09, 0x0A, 0x16, 0x17, 0x18, 0x19,
        0x1A, 0x25, 0x26, 0x27, 0x28, 0x29, 0x2A, 0x34,
        0x35, 0x36, 0x37, 0x38, 0x39, 0x3A, 0x43, 0x44,
        0x45, 0x46, 0x47, 0x48, 0x49, 0x4A, 0x53, 0x54,
        0x55, 0x56, 0x57, 0x58, 0x59, 0x5A, 0x63, 0x64,
        0x65, 0x66, 0x67, 0x68, 0x69, 0x6A, 0x73, 0x74,
        0x75, 0x76, 0x77, 0x78, 0x79, 0x7A, 0x83, 0x84,
        0x85, 0x86, 0x87, 0x88, 0x89, 0x8A, 0x92, 0x93,
        0x94, 0x95, 0x96, 0x97, 0x98, 0x99, 0x9A, 0xA2,
        0xA3, 0xA4, 0xA5, 0xA6, 0xA7, 0xA8, 0xA9, 0xAA,
        0xB2, 0xB3, 0xB4, 0xB5, 0xB6, 0xB7, 0xB8, 0xB9,
        0xBA, 0xC2, 0xC3, 0xC4, 0xC5, 0xC6, 0xC7, 0xC8,
        0xC9, 0xCA, 0xD2, 0xD3, 0xD4, 0xD5, 0xD6, 0xD7,
        0xD8, 0xD9, 0xDA, 0xE1, 0xE2, 0xE3, 0xE4, 0xE5,
        0xE6, 0xE7, 0xE8, 0xE9, 0xEA, 0xF1, 0xF2, 0xF3,
        0xF4, 0xF5, 0xF6, 0xF7, 0xF8, 0xF9, 0xFA,
        0xFF, 0xDA, 0x00, 0x08, 0x01, 0x01, 0x00, 0x00,
        0x3F, 0x00, 0x7B, 0x40,
        0xFF, 0xD9,
    ];
    bytes
}

/// A raw, non-compressed test container: `[width:u32 LE][height:u32 LE]`
/// followed by tightly-packed ABGR8 pixels. Lets pipeline tests drive the
/// `OneShot`/`Streaming` contracts without a real codec.
pub(crate) fn encode_synthetic(width: u32, height: u32, pixels: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + pixels.len());
    out.extend_from_slice(&width.to_le_bytes());
    out.extend_from_slice(&height.to_le_bytes());
    out.extend_from_slice(pixels);
    out
}

/// Builds tight ABGR8 pixels for a solid color, suitable for
/// `encode_synthetic`.
pub(crate) fn solid_pixels(width: u32, height: u32, r: u8, g: u8, b: u8) -> Vec<u8> {
    let mut out = vec![0u8; (width * height * BYTES_PER_PIXEL) as usize];
    for px in out.chunks_exact_mut(BYTES_PER_PIXEL as usize) {
        px[0] = 255;
        px[1] = b;
        px[2] = g;
        px[3] = r;
    }
    out
}

/// Test double for [`OneShot`] matching the `encode_synthetic` container
/// format above.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct SyntheticOneShot;

impl OneShot for SyntheticOneShot {
    fn probe_size(&self, input: &[u8]) -> Option<(u32, u32)> {
        if input.len() < 8 {
            return None;
        }
        let width = u32::from_le_bytes(input[0..4].try_into().ok()?);
        let height = u32::from_le_bytes(input[4..8].try_into().ok()?);
        Some((width, height))
    }

    fn decode(
        &self,
        input: &[u8],
        dst: &mut [u8],
        dst_row_bytes: u32,
        dst_width: u32,
        dst_height: u32,
    ) -> PyramidResult<()> {
        if input.len() < 8 {
            return Err(PyramidError::Decoder("incomplete header".into()));
        }
        let width = u32::from_le_bytes(input[0..4].try_into().unwrap());
        let height = u32::from_le_bytes(input[4..8].try_into().unwrap());
        if width != dst_width || height != dst_height {
            return Err(PyramidError::Decoder("size mismatch".into()));
        }
        let bpp = BYTES_PER_PIXEL as usize;
        let body_len = width as usize * height as usize * bpp;
        if input.len() < 8 + body_len {
            return Err(PyramidError::Decoder("incomplete body".into()));
        }
        let pixels = &input[8..8 + body_len];
        for y in 0..height as usize {
            let src_off = y * width as usize * bpp;
            let src = &pixels[src_off..src_off + width as usize * bpp];
            let dst_off = y * dst_row_bytes as usize;
            dst[dst_off..dst_off + width as usize * bpp].copy_from_slice(src);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_round_trips_through_one_shot() {
        let pixels = solid_pixels(4, 3, 10, 20, 30);
        let input = encode_synthetic(4, 3, &pixels);
        let decoder = SyntheticOneShot;
        assert_eq!(decoder.probe_size(&input), Some((4, 3)));
        let mut dst = vec![0u8; 4 * 3 * BYTES_PER_PIXEL as usize];
        decoder.decode(&input, &mut dst, 4 * BYTES_PER_PIXEL, 4, 3).unwrap();
        assert_eq!(dst, pixels);
    }
}
