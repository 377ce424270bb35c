//! Decoder adapter contracts. The core depends only on these two shapes --
//! a one-shot "decompress this whole buffer into that destination" push, and
//! a streaming "feed me bytes, pull scanlines back" contract -- never on a
//! specific codec's internals.
//!
//! Both concrete adapters here use zune-jpeg for the actual decompression.
//! `OneShotTurbo` is the same codec under a different adapter name: the
//! corpus carries no second JPEG codec dependency to ground a genuinely
//! different implementation on, and fabricating one would mean an
//! unvalidated crate. Noted in the design ledger.

use zune_jpeg::JpegDecoder;

use crate::error::{PyramidError, PyramidResult};
use crate::geometry::BYTES_PER_PIXEL;

/// One-shot decoder: give it the whole compressed buffer and a destination
/// to decompress into.
pub trait OneShot {
    /// Parses just enough of `input` to report dimensions, without a full
    /// pixel decode. Returns `None` if `input` doesn't yet contain a
    /// complete header.
    fn probe_size(&self, input: &[u8]) -> Option<(u32, u32)>;

    /// Decompresses `input` into `dst`, writing ABGR8 pixels (alpha forced
    /// to 255) at `dst_row_bytes` stride. Fails the whole build on error.
    fn decode(
        &self,
        input: &[u8],
        dst: &mut [u8],
        dst_row_bytes: u32,
        dst_width: u32,
        dst_height: u32,
    ) -> PyramidResult<()>;
}

fn expand_to_abgr(pixels: &[u8], components: u8, dst_row_bytes: u32, width: u32, height: u32, dst: &mut [u8]) {
    let stride = dst_row_bytes as usize;
    let bpp = BYTES_PER_PIXEL as usize;
    for y in 0..height as usize {
        let row = &mut dst[y * stride..y * stride + width as usize * bpp];
        for x in 0..width as usize {
            let (r, g, b) = match components {
                1 => {
                    let v = pixels[y * width as usize + x];
                    (v, v, v)
                }
                _ => {
                    let base = (y * width as usize + x) * components as usize;
                    (pixels[base], pixels[base + 1], pixels[base + 2])
                }
            };
            let px = x * bpp;
            // ABGR8, little-endian memory order: byte0=A, byte1=B, byte2=G, byte3=R.
            row[px] = 255;
            row[px + 1] = b;
            row[px + 2] = g;
            row[px + 3] = r;
        }
    }
}

/// Zune-jpeg backed one-shot adapter.
#[derive(Debug, Default, Clone, Copy)]
pub struct ZuneOneShot;

impl OneShot for ZuneOneShot {
    fn probe_size(&self, input: &[u8]) -> Option<(u32, u32)> {
        let mut decoder = JpegDecoder::new(input);
        decoder.decode_headers().ok()?;
        let info = decoder.info()?;
        Some((info.width as u32, info.height as u32))
    }

    fn decode(
        &self,
        input: &[u8],
        dst: &mut [u8],
        dst_row_bytes: u32,
        dst_width: u32,
        dst_height: u32,
    ) -> PyramidResult<()> {
        let mut decoder = JpegDecoder::new(input);
        let pixels = decoder
            .decode()
            .map_err(|e| PyramidError::Decoder(format!("{:?}", e)))?;
        let info = decoder
            .info()
            .ok_or_else(|| PyramidError::Decoder("missing header info after decode".into()))?;
        if info.width as u32 != dst_width || info.height as u32 != dst_height {
            return Err(PyramidError::Decoder(format!(
                "decoded size {}x{} does not match expected {}x{}",
                info.width, info.height, dst_width, dst_height
            )));
        }
        expand_to_abgr(&pixels, info.components as u8, dst_row_bytes, dst_width, dst_height, dst);
        Ok(())
    }
}

pub type CgStyleOneShot = ZuneOneShot;
pub type OneShotTurbo = ZuneOneShot;

/// Streaming decoder contract.
pub trait Streaming {
    /// Hands more compressed bytes to the decoder. Idempotent with respect
    /// to partial input: if the decoder cannot yet make progress, it just
    /// buffers and returns `Ok(())`.
    fn push_bytes(&mut self, buf: &[u8]) -> PyramidResult<()>;

    /// `(width, height, components)` once the header has been parsed.
    fn header_ready(&self) -> Option<(u32, u32, u32)>;

    /// Writes up to `max_rows` fully decoded scanlines into `dst` at
    /// `row_stride`, returning how many were written. May return 0 if the
    /// decoder is currently suspended pending more input.
    fn pull_scanlines(&mut self, dst: &mut [u8], max_rows: u32, row_stride: u32) -> PyramidResult<u32>;

    /// Called once the caller has no more bytes to offer. Forces a final
    /// decode attempt; a decode failure here is `DecoderError`, not
    /// `DecoderNeedsMore`.
    fn finish(&mut self) -> PyramidResult<()>;

    fn is_done(&self) -> bool;
}

/// Adapts a one-shot decoder to the streaming contract by buffering input
/// until a full decode succeeds, then serving scanlines out of the decoded
/// buffer. True incremental scanline decoding is a codec-internal concern
/// this core does not implement; this adapter is the documented stand-in
/// used by `DecoderKind::StreamingScanline`.
pub struct StreamingScanlineAdapter<D: OneShot> {
    decoder: D,
    buffer: Vec<u8>,
    header: Option<(u32, u32, u32)>,
    decoded: Option<Vec<u8>>,
    stride: u32,
    next_row: u32,
}

impl<D: OneShot> StreamingScanlineAdapter<D> {
    pub fn new(decoder: D) -> Self {
        Self {
            decoder,
            buffer: Vec::new(),
            header: None,
            decoded: None,
            stride: 0,
            next_row: 0,
        }
    }

    fn try_decode(&mut self) -> PyramidResult<bool> {
        if self.decoded.is_some() {
            return Ok(true);
        }
        let (width, height) = match self.decoder.probe_size(&self.buffer) {
            Some(dims) => dims,
            None => return Ok(false),
        };
        self.header = Some((width, height, 3));
        self.stride = width * BYTES_PER_PIXEL;
        let mut buf = vec![0u8; self.stride as usize * height as usize];
        match self.decoder.decode(&self.buffer, &mut buf, self.stride, width, height) {
            Ok(()) => {
                self.decoded = Some(buf);
                Ok(true)
            }
            Err(_) => Ok(false),
        }
    }
}

impl<D: OneShot> Streaming for StreamingScanlineAdapter<D> {
    fn push_bytes(&mut self, buf: &[u8]) -> PyramidResult<()> {
        self.buffer.extend_from_slice(buf);
        let _ = self.try_decode()?;
        Ok(())
    }

    fn header_ready(&self) -> Option<(u32, u32, u32)> {
        self.header
    }

    fn pull_scanlines(&mut self, dst: &mut [u8], max_rows: u32, row_stride: u32) -> PyramidResult<u32> {
        let decoded = match &self.decoded {
            Some(d) => d,
            None => return Ok(0),
        };
        let (_, height, _) = self.header.unwrap();
        let rows_available = height - self.next_row;
        let n = rows_available.min(max_rows);
        for i in 0..n {
            let src_start = (self.next_row + i) as usize * self.stride as usize;
            let src = &decoded[src_start..src_start + self.stride as usize];
            let dst_start = i as usize * row_stride as usize;
            dst[dst_start..dst_start + self.stride as usize].copy_from_slice(src);
        }
        self.next_row += n;
        Ok(n)
    }

    fn finish(&mut self) -> PyramidResult<()> {
        if self.decoded.is_some() {
            return Ok(());
        }
        let (width, height) = self
            .decoder
            .probe_size(&self.buffer)
            .ok_or_else(|| PyramidError::Decoder("stream ended before a complete header".into()))?;
        self.header = Some((width, height, 3));
        self.stride = width * BYTES_PER_PIXEL;
        let mut buf = vec![0u8; self.stride as usize * height as usize];
        self.decoder
            .decode(&self.buffer, &mut buf, self.stride, width, height)
            .map_err(|_| PyramidError::Decoder("stream ended before a complete image".into()))?;
        self.decoded = Some(buf);
        Ok(())
    }

    fn is_done(&self) -> bool {
        match &self.header {
            Some((_, height, _)) => self.decoded.is_some() && self.next_row >= *height,
            None => false,
        }
    }
}
