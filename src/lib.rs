//! raster_pyramid_core - Tiled-image pyramid builder for large raster images.
//!
//! This Rust extension provides:
//! - Memory-mapped, scratch-band retiling of row-major pixels into tile-major
//!   files, one pyramid level at a time
//! - A whole-image pipeline (decode once, derive every level) and a
//!   streaming pipeline (scanlines arrive incrementally over the network)
//! - Background fsync scheduling with back-pressure on memory-constrained
//!   builds
//! - Random-access, zero-copy tile read-back via the Python buffer protocol

mod config;
mod decoder;
mod downsample;
mod error;
mod flush;
mod geometry;
mod mapper;
mod mem_probe;
mod provider;
mod pyramid;
mod tile_builder;
mod tile_buffer;
#[cfg(test)]
pub(crate) mod test_utils;

use std::path::Path;

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use config::{DecoderKind, DownsamplerKind, PyramidConfig};
use pyramid::{FeedOutcome, Pyramid};
use tile_buffer::TileBuffer;

fn parse_decoder_kind(name: &str) -> PyResult<DecoderKind> {
    match name {
        "streaming_scanline" => Ok(DecoderKind::StreamingScanline),
        "cg_style_one_shot" => Ok(DecoderKind::CgStyleOneShot),
        "one_shot_turbo" => Ok(DecoderKind::OneShotTurbo),
        other => Err(PyValueError::new_err(format!("unknown decoder kind: {other}"))),
    }
}

fn parse_downsampler_kind(name: &str) -> PyResult<DownsamplerKind> {
    match name {
        "decimate" => Ok(DownsamplerKind::Decimate),
        "high_quality" => Ok(DownsamplerKind::HighQuality),
        other => Err(PyValueError::new_err(format!("unknown downsampler kind: {other}"))),
    }
}

fn build_config(
    levels: u32,
    flush_disk_cache: bool,
    memory_constrained: Option<bool>,
    downsampler: &str,
) -> PyResult<PyramidConfig> {
    Ok(PyramidConfig {
        levels,
        flush_disk_cache,
        memory_constrained,
        downsampler: parse_downsampler_kind(downsampler)?,
    })
}

/// Python-exposed tiled-image pyramid builder and random-access reader.
///
/// Usage:
/// ```python
/// from raster_pyramid_core import RustPyramid
///
/// pyramid = RustPyramid.new_from_path("/path/to/image.jpg", levels=4)
/// width, height = pyramid.image_size
/// tile = pyramid.tile_at(1.0, row=0, col=0)  # zero-copy TileBuffer
/// ```
#[pyclass]
pub struct RustPyramid {
    inner: Pyramid,
}

#[pymethods]
impl RustPyramid {
    /// Builds a pyramid from an already-decoded, tightly packed ABGR8
    /// pixel buffer (`width * height * 4` bytes, no row padding).
    #[staticmethod]
    #[pyo3(signature = (pixels, width, height, levels=3, flush_disk_cache=false, memory_constrained=None, downsampler="decimate"))]
    #[allow(clippy::too_many_arguments)]
    fn new_from_image(
        pixels: &[u8],
        width: u32,
        height: u32,
        levels: u32,
        flush_disk_cache: bool,
        memory_constrained: Option<bool>,
        downsampler: &str,
    ) -> PyResult<Self> {
        let config = build_config(levels, flush_disk_cache, memory_constrained, downsampler)?;
        let inner = Pyramid::new_from_image(pixels, width, height, config)?;
        Ok(Self { inner })
    }

    /// Builds a pyramid by decoding a whole file up front.
    ///
    /// `decoder_kind` is one of `"streaming_scanline"` (default),
    /// `"cg_style_one_shot"`, `"one_shot_turbo"`.
    #[staticmethod]
    #[pyo3(signature = (path, decoder_kind="streaming_scanline", levels=3, flush_disk_cache=false, memory_constrained=None, downsampler="decimate"))]
    #[allow(clippy::too_many_arguments)]
    fn new_from_path(
        path: &str,
        decoder_kind: &str,
        levels: u32,
        flush_disk_cache: bool,
        memory_constrained: Option<bool>,
        downsampler: &str,
    ) -> PyResult<Self> {
        let config = build_config(levels, flush_disk_cache, memory_constrained, downsampler)?;
        let kind = parse_decoder_kind(decoder_kind)?;
        let inner = Pyramid::new_from_path(Path::new(path), kind, config)?;
        Ok(Self { inner })
    }

    /// Builds a pyramid whose compressed bytes arrive later, via repeated
    /// calls to [`Self::append_bytes`] followed by [`Self::data_finished`].
    #[staticmethod]
    #[pyo3(signature = (decoder_kind="streaming_scanline", levels=3, flush_disk_cache=false, memory_constrained=None, downsampler="decimate"))]
    fn new_for_network(
        decoder_kind: &str,
        levels: u32,
        flush_disk_cache: bool,
        memory_constrained: Option<bool>,
        downsampler: &str,
    ) -> PyResult<Self> {
        let config = build_config(levels, flush_disk_cache, memory_constrained, downsampler)?;
        let kind = parse_decoder_kind(decoder_kind)?;
        Ok(Self { inner: Pyramid::new_for_network(kind, config) })
    }

    /// Feeds more compressed bytes to a network-fed pyramid.
    ///
    /// Returns `True` if at least one scanline (or the whole image)
    /// progressed, `False` if the decoder is still waiting for more input.
    fn append_bytes(&self, py: Python<'_>, buf: &[u8]) -> PyResult<bool> {
        let outcome = py.allow_threads(|| self.inner.append_bytes(buf))?;
        Ok(!matches!(outcome, FeedOutcome::NeedMore))
    }

    /// Signals end of input and forces the final decode/finalize pass.
    fn data_finished(&self, py: Python<'_>) -> PyResult<()> {
        py.allow_threads(|| self.inner.data_finished())?;
        Ok(())
    }

    /// `(width, height)` once the header has been decoded, else `None`.
    #[getter]
    fn image_size(&self) -> Option<(u32, u32)> {
        self.inner.image_size()
    }

    /// Fetches one tile as a zero-copy buffer.
    fn tile_at<'py>(
        &self,
        py: Python<'py>,
        scale_fraction: f64,
        row: u32,
        col: u32,
    ) -> PyResult<Bound<'py, TileBuffer>> {
        let tile = self.inner.tile_at(scale_fraction, row, col)?;
        let buf = Py::new(py, TileBuffer::new(tile))?;
        Ok(buf.into_bound(py))
    }

    /// Outstanding dirtied bytes across this pyramid's levels, awaiting
    /// background flush.
    #[getter]
    fn dirty_bytes(&self) -> u64 {
        self.inner.dirty_bytes()
    }

    /// Whether new level allocation is currently suspended by the flush
    /// coordinator's back-pressure gate.
    #[getter]
    fn is_throttled(&self) -> bool {
        self.inner.is_throttled()
    }
}

/// raster_pyramid_core - tiled-image pyramid builder for large raster images.
#[pymodule]
fn raster_pyramid_core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<RustPyramid>()?;
    m.add_class::<TileBuffer>()?;
    Ok(())
}
