//! Producer-facing pyramid builder. Wires the mapper, downsampler, tile
//! builder, flush coordinator and tile provider into the whole-image and
//! streaming pipelines from the data-flow overview, and exposes the single
//! sticky-failure API surface a host (or the pyo3 binding in `lib.rs`)
//! drives directly -- every test below constructs `Pyramid` straight from
//! this module and never goes through `pyo3`.

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::{DecoderKind, PyramidConfig};
use crate::decoder::{OneShot, Streaming, StreamingScanlineAdapter, ZuneOneShot};
use crate::downsample;
use crate::error::{PyramidError, PyramidResult};
use crate::flush::FlushCoordinator;
use crate::geometry::{LevelGeometry, BYTES_PER_PIXEL};
use crate::mapper::{MapMode, Mapper};
use crate::provider::{Tile, TileProvider};
use crate::tile_builder::{self, StreamingProgress};

/// Explicit state machine for the streaming pipeline, rather than an
/// implicit generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamPhase {
    AwaitingHeader,
    StreamingScanlines,
    Done,
}

/// What one `append_bytes`/`data_finished` step accomplished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedOutcome {
    NeedMore,
    Progressed,
    Done,
}

/// A clonable snapshot of a [`PyramidError`], kept so the sticky `failed`
/// flag can hand back an equivalent error on every subsequent call without
/// requiring `PyramidError` itself (whose `Io` variant wraps a
/// non-`Clone` `std::io::Error`) to implement `Clone`.
#[derive(Clone, Debug)]
enum Sticky {
    Io(String),
    Decoder(String),
    OutOfRange(u32, u32, u32),
}

impl Sticky {
    fn capture(err: &PyramidError) -> Self {
        match err {
            PyramidError::Io(e) => Sticky::Io(e.to_string()),
            PyramidError::Decoder(s) => Sticky::Decoder(s.clone()),
            PyramidError::DecoderNeedsMore => Sticky::Decoder("decoder needs more input".into()),
            PyramidError::OutOfRange { level, row, col } => Sticky::OutOfRange(*level, *row, *col),
        }
    }

    fn restore(&self) -> PyramidError {
        match self {
            Sticky::Io(s) => PyramidError::Io(std::io::Error::new(std::io::ErrorKind::Other, s.clone())),
            Sticky::Decoder(s) => PyramidError::Decoder(s.clone()),
            Sticky::OutOfRange(level, row, col) => {
                PyramidError::OutOfRange { level: *level, row: *row, col: *col }
            }
        }
    }
}

struct LevelSlot {
    geometry: LevelGeometry,
    progress: StreamingProgress,
}

/// State for a pyramid driven by the streaming scanline decoder contract
/// (`DecoderKind::StreamingScanline`).
struct StreamingState {
    decoder: Box<dyn Streaming + Send>,
    phase: StreamPhase,
    width: u32,
    height: u32,
    levels: Vec<LevelSlot>,
    rows_written: u32,
    scanline_buf: Vec<u8>,
}

/// What drives a pyramid under construction.
enum ProducerState {
    /// Bytes/scanlines feed the per-scanline pipeline directly.
    Streaming(StreamingState),
    /// Any other decoder kind: bytes accumulate until a single one-shot
    /// decode runs the whole-image pipeline in one step at `data_finished`.
    Buffering { buffer: Vec<u8> },
    Finished,
}

/// A tiled-image pyramid builder and random-access reader. The pyo3
/// binding in `lib.rs` is a thin adapter over this type.
pub struct Pyramid {
    mapper: Arc<Mapper>,
    flush: FlushCoordinator,
    config: PyramidConfig,
    header: Mutex<Option<(u32, u32)>>,
    failed: Mutex<Option<Sticky>>,
    state: Mutex<ProducerState>,
    provider: Mutex<Option<TileProvider>>,
}

impl Pyramid {
    /// Whole-image constructor: `pixels` is a tightly packed (no row
    /// padding) ABGR8 buffer, `width * height * 4` bytes.
    pub fn new_from_image(pixels: &[u8], width: u32, height: u32, config: PyramidConfig) -> PyramidResult<Self> {
        let mapper = Arc::new(Mapper::new());
        let flush = FlushCoordinator::new();
        let levels = build_whole_image(&mapper, &flush, &config, pixels, width, height)?;
        let provider = TileProvider::new(Arc::clone(&mapper), levels);
        Ok(Self {
            mapper,
            flush,
            config,
            header: Mutex::new(Some((width, height))),
            failed: Mutex::new(None),
            state: Mutex::new(ProducerState::Finished),
            provider: Mutex::new(Some(provider)),
        })
    }

    /// File constructor. `StreamingScanline` drives the same per-scanline
    /// pipeline `new_for_network` uses, fed from the whole file at once;
    /// the other two kinds decode the file in one shot.
    pub fn new_from_path(path: &Path, decoder_kind: DecoderKind, config: PyramidConfig) -> PyramidResult<Self> {
        let bytes = std::fs::read(path).map_err(PyramidError::Io)?;
        let pyramid = Self::new_for_network(decoder_kind, config);
        pyramid.append_bytes(&bytes)?;
        pyramid.data_finished()?;
        Ok(pyramid)
    }

    /// Streaming constructor. Bytes arrive later via [`Self::append_bytes`];
    /// [`Self::data_finished`] forces the last decode/finalize pass.
    pub fn new_for_network(decoder_kind: DecoderKind, config: PyramidConfig) -> Self {
        let mapper = Arc::new(Mapper::new());
        let flush = FlushCoordinator::new();
        let state = match decoder_kind {
            DecoderKind::StreamingScanline => ProducerState::Streaming(StreamingState {
                decoder: Box::new(StreamingScanlineAdapter::new(ZuneOneShot)),
                phase: StreamPhase::AwaitingHeader,
                width: 0,
                height: 0,
                levels: Vec::new(),
                rows_written: 0,
                scanline_buf: Vec::new(),
            }),
            DecoderKind::CgStyleOneShot | DecoderKind::OneShotTurbo => {
                ProducerState::Buffering { buffer: Vec::new() }
            }
        };
        Self {
            mapper,
            flush,
            config,
            header: Mutex::new(None),
            failed: Mutex::new(None),
            state: Mutex::new(state),
            provider: Mutex::new(None),
        }
    }

    /// Hands more compressed bytes to the build. Idempotent: if the
    /// pyramid's decoder cannot yet make progress this just buffers.
    pub fn append_bytes(&self, buf: &[u8]) -> PyramidResult<FeedOutcome> {
        self.check_failed()?;
        let result = self.append_bytes_inner(buf);
        self.capture_failure(result)
    }

    fn append_bytes_inner(&self, buf: &[u8]) -> PyramidResult<FeedOutcome> {
        let mut state = self.state.lock();
        match &mut *state {
            ProducerState::Streaming(s) => {
                drive_streaming(&self.mapper, &self.flush, &self.config, &self.header, &self.provider, s, Some(buf))
            }
            ProducerState::Buffering { buffer } => {
                buffer.extend_from_slice(buf);
                Ok(FeedOutcome::NeedMore)
            }
            ProducerState::Finished => Ok(FeedOutcome::Done),
        }
    }

    /// Forces the final decode/finalize pass: no more bytes are coming.
    pub fn data_finished(&self) -> PyramidResult<()> {
        self.check_failed()?;
        let result = self.data_finished_inner();
        self.capture_failure(result)
    }

    fn data_finished_inner(&self) -> PyramidResult<()> {
        let mut state = self.state.lock();
        match &mut *state {
            ProducerState::Streaming(s) => {
                finish_streaming(&self.mapper, &self.flush, &self.config, &self.header, &self.provider, s)?;
                *state = ProducerState::Finished;
                Ok(())
            }
            ProducerState::Buffering { buffer } => {
                let decoder = ZuneOneShot;
                let (width, height) = decoder
                    .probe_size(buffer)
                    .ok_or_else(|| PyramidError::Decoder("stream ended before a complete header".into()))?;
                let stride = width * BYTES_PER_PIXEL;
                let mut pixels = vec![0u8; stride as usize * height as usize];
                decoder
                    .decode(buffer, &mut pixels, stride, width, height)
                    .map_err(|_| PyramidError::Decoder("stream ended before a complete image".into()))?;
                let levels = build_whole_image(&self.mapper, &self.flush, &self.config, &pixels, width, height)?;
                *self.header.lock() = Some((width, height));
                *self.provider.lock() = Some(TileProvider::new(Arc::clone(&self.mapper), levels));
                *state = ProducerState::Finished;
                Ok(())
            }
            ProducerState::Finished => Ok(()),
        }
    }

    /// `(width_0, height_0)` once the header has been decoded. This may
    /// still return a value even after a later failure, since the header
    /// is obtained before any failure that follows it.
    pub fn image_size(&self) -> Option<(u32, u32)> {
        *self.header.lock()
    }

    /// Fetches one tile's bytes. Non-fatal `OutOfRange` if the request
    /// falls outside the pyramid's bounds, or inside a tile row that
    /// hasn't been retiled yet.
    pub fn tile_at(&self, scale_fraction: f64, row: u32, col: u32) -> PyramidResult<Tile> {
        self.check_failed()?;
        let provider = self.provider.lock();
        match provider.as_ref() {
            Some(p) => p.tile_at(scale_fraction, row, col),
            None => Err(PyramidError::OutOfRange { level: 0, row, col }),
        }
    }

    /// Outstanding dirtied bytes across this pyramid's levels (0 once all
    /// background flushes have completed).
    pub fn dirty_bytes(&self) -> u64 {
        self.flush.dirty_bytes()
    }

    pub fn is_throttled(&self) -> bool {
        self.flush.is_throttled()
    }

    fn check_failed(&self) -> PyramidResult<()> {
        if let Some(sticky) = self.failed.lock().as_ref() {
            return Err(sticky.restore());
        }
        Ok(())
    }

    /// Once `failed` is set, every subsequent operation is a no-op that
    /// returns the same error. `DecoderNeedsMore` is not an error and
    /// never sets it.
    fn capture_failure<T>(&self, result: PyramidResult<T>) -> PyramidResult<T> {
        if let Err(err) = &result {
            if !matches!(err, PyramidError::DecoderNeedsMore) {
                *self.failed.lock() = Some(Sticky::capture(err));
            }
        }
        result
    }
}

fn width_bytes(width: u32) -> usize {
    (width * BYTES_PER_PIXEL) as usize
}

/// Copies a tightly packed (no padding) pixel buffer into a level's padded
/// row-major region.
fn write_tight_pixels(dst_full: &mut [u8], geometry: &LevelGeometry, pixels: &[u8]) {
    let tight_stride = width_bytes(geometry.width);
    for y in 0..geometry.height {
        let dst_off = geometry.scanline_offset(y) as usize;
        let src_off = y as usize * tight_stride;
        dst_full[dst_off..dst_off + tight_stride].copy_from_slice(&pixels[src_off..src_off + tight_stride]);
    }
}

/// Finalizes level `k`: retiles every row, truncates the scratch band, and
/// (when the build is configured to) schedules a background flush of the
/// now tile-major file. Shared by the whole-image and streaming end paths.
fn finalize_level(
    mapper: &Mapper,
    flush: &FlushCoordinator,
    config: &PyramidConfig,
    k: u32,
    geometry: &LevelGeometry,
) -> PyramidResult<()> {
    tile_builder::retile_all(mapper, k, geometry)?;
    mapper.truncate_scratch(k)?;
    if config.should_flush() {
        if let Some(file) = mapper.file_handle(k) {
            flush.record_level_finished(file, geometry.tiled_file_size());
        }
    }
    Ok(())
}

/// Level 0 is already fully decoded in `pixels`; every coarser level is
/// derived, retiled and truncated before the next is created, finalizing
/// the last level after the loop since it has no successor to trigger it.
///
/// A level whose halved dimensions hit zero is never materialized (per the
/// data model's `is_empty` handling); the loop stops there rather than
/// producing empty files for every further requested level.
fn build_whole_image(
    mapper: &Mapper,
    flush: &FlushCoordinator,
    config: &PyramidConfig,
    pixels: &[u8],
    width: u32,
    height: u32,
) -> PyramidResult<Vec<LevelGeometry>> {
    let g0 = mapper.create_level(0, width, height)?;
    if !g0.is_empty() {
        let mut window = mapper.map_whole(0, MapMode::ReadWrite)?;
        write_tight_pixels(window.as_mut_slice(), &g0, pixels);
    }

    let mut levels = vec![g0];

    for k in 1..config.levels {
        let prev_idx = k - 1;
        let prev = levels[prev_idx as usize];
        if prev.is_empty() {
            break;
        }
        flush.wait_if_throttled();
        let (w, h) = prev.halved();
        let gk = mapper.create_level(k, w, h)?;
        let empty = gk.is_empty();
        if !empty {
            downsample::downsample_level(mapper, prev_idx, &prev, k, &gk, config.downsampler, None)?;
        }
        finalize_level(mapper, flush, config, prev_idx, &prev)?;
        levels.push(gk);
        if empty {
            break;
        }
    }

    let last_idx = levels.len() as u32 - 1;
    let last = levels[last_idx as usize];
    if !last.is_empty() {
        finalize_level(mapper, flush, config, last_idx, &last)?;
    }

    Ok(levels)
}

/// Creates every level's backing file up front, the moment the header is
/// known. Stops at (and still includes) the first degenerate level,
/// mirroring [`build_whole_image`].
fn create_streaming_levels(
    mapper: &Mapper,
    flush: &FlushCoordinator,
    config: &PyramidConfig,
    state: &mut StreamingState,
    width: u32,
    height: u32,
) -> PyramidResult<()> {
    state.width = width;
    state.height = height;

    let g0 = mapper.create_level(0, width, height)?;
    state.levels.push(LevelSlot { geometry: g0, progress: StreamingProgress::new() });
    if g0.is_empty() {
        return Ok(());
    }

    for k in 1..config.levels {
        flush.wait_if_throttled();
        let prev = state.levels[(k - 1) as usize].geometry;
        let (w, h) = prev.halved();
        let gk = mapper.create_level(k, w, h)?;
        let empty = gk.is_empty();
        state.levels.push(LevelSlot { geometry: gk, progress: StreamingProgress::new() });
        if empty {
            break;
        }
    }
    Ok(())
}

/// Pushes `buf` (if any) into the decoder, then pulls and processes every
/// scanline the decoder now has ready, one at a time. Creates the
/// pyramid's levels the moment the header becomes available.
fn drive_streaming(
    mapper: &Arc<Mapper>,
    flush: &FlushCoordinator,
    config: &PyramidConfig,
    header_slot: &Mutex<Option<(u32, u32)>>,
    provider_slot: &Mutex<Option<TileProvider>>,
    state: &mut StreamingState,
    buf: Option<&[u8]>,
) -> PyramidResult<FeedOutcome> {
    if let Some(buf) = buf {
        state.decoder.push_bytes(buf)?;
    }

    if state.phase == StreamPhase::AwaitingHeader {
        match state.decoder.header_ready() {
            Some((width, height, _components)) => {
                create_streaming_levels(mapper, flush, config, state, width, height)?;
                *header_slot.lock() = Some((width, height));
                let geometries = state.levels.iter().map(|l| l.geometry).collect();
                *provider_slot.lock() = Some(TileProvider::new_streaming(Arc::clone(mapper), geometries));
                state.phase = StreamPhase::StreamingScanlines;
            }
            None => return Ok(FeedOutcome::NeedMore),
        }
    }

    if state.levels.first().map(|l| l.geometry.is_empty()).unwrap_or(true) {
        return Ok(FeedOutcome::NeedMore);
    }

    let stride = state.width * BYTES_PER_PIXEL;
    if state.scanline_buf.len() != stride as usize {
        state.scanline_buf = vec![0u8; stride as usize];
    }

    let mut progressed = false;
    loop {
        let n = state.decoder.pull_scanlines(&mut state.scanline_buf, 1, stride)?;
        if n == 0 {
            break;
        }
        consume_scanline(mapper, provider_slot, state)?;
        progressed = true;
    }

    Ok(if progressed { FeedOutcome::Progressed } else { FeedOutcome::NeedMore })
}

/// Processes exactly one decoded level-0 scanline: writes it into level 0,
/// opportunistically downsamples it into every coarser level whose stride
/// still aligns (stopping at the first misaligned one, since strides are
/// powers of two), then retiles any tile row that just completed at any
/// level.
fn consume_scanline(
    mapper: &Mapper,
    provider_slot: &Mutex<Option<TileProvider>>,
    state: &mut StreamingState,
) -> PyramidResult<()> {
    let s = state.rows_written;
    let g0 = state.levels[0].geometry;

    {
        let tight = width_bytes(g0.width);
        let mut window = mapper.map_window(0, g0.scanline_offset(s), g0.padded_bytes_per_row as u64, MapMode::WriteOnly)?;
        window.as_mut_slice()[..tight].copy_from_slice(&state.scanline_buf[..tight]);
    }

    for k in 1..state.levels.len() as u32 {
        if s % (1u32 << k) != 0 {
            break;
        }
        let geometry = state.levels[k as usize].geometry;
        if geometry.is_empty() {
            break;
        }
        let dst_row = s >> k;
        let tight = width_bytes(geometry.width);
        let mut window =
            mapper.map_window(k, geometry.scanline_offset(dst_row), geometry.padded_bytes_per_row as u64, MapMode::WriteOnly)?;
        downsample::decimate_scanline(&state.scanline_buf, k, &mut window.as_mut_slice()[..tight], geometry.width);
    }

    state.rows_written = s + 1;

    for k in 0..state.levels.len() as u32 {
        let geometry = state.levels[k as usize].geometry;
        if geometry.is_empty() {
            continue;
        }
        let local_rows = (s >> k) + 1;
        let advanced = state.levels[k as usize].progress.advance_if_ready(mapper, k, &geometry, local_rows)?;
        if advanced {
            let next_row = state.levels[k as usize].progress.next_row();
            if let Some(provider) = provider_slot.lock().as_mut() {
                provider.set_ready_rows(k, next_row);
            }
        }
    }

    Ok(())
}

/// End-of-stream: forces a final decode attempt, drains any scanlines it
/// produces, then finalizes every level (remaining tile rows, truncate,
/// flush).
fn finish_streaming(
    mapper: &Arc<Mapper>,
    flush: &FlushCoordinator,
    config: &PyramidConfig,
    header_slot: &Mutex<Option<(u32, u32)>>,
    provider_slot: &Mutex<Option<TileProvider>>,
    state: &mut StreamingState,
) -> PyramidResult<()> {
    state.decoder.finish()?;
    drive_streaming(mapper, flush, config, header_slot, provider_slot, state, None)?;

    for k in 0..state.levels.len() as u32 {
        let geometry = state.levels[k as usize].geometry;
        if geometry.is_empty() {
            continue;
        }
        state.levels[k as usize].progress.finish(mapper, k, &geometry)?;
        mapper.truncate_scratch(k)?;
        if config.should_flush() {
            if let Some(file) = mapper.file_handle(k) {
                flush.record_level_finished(file, geometry.tiled_file_size());
            }
        }
        if let Some(provider) = provider_slot.lock().as_mut() {
            provider.set_ready_rows(k, geometry.rows);
        }
    }
    state.phase = StreamPhase::Done;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{encode_synthetic, solid_pixels, SyntheticOneShot};

    #[test]
    fn whole_image_pipeline_produces_exact_tile_file_sizes() {
        let config = PyramidConfig { levels: 3, ..Default::default() };
        let width = 512;
        let height = 512;
        let pixels = solid_pixels(width, height, 255, 0, 0);
        let pyramid = Pyramid::new_from_image(&pixels, width, height, config).unwrap();
        assert_eq!(pyramid.image_size(), Some((512, 512)));

        let tile = pyramid.tile_at(1.0, 0, 0).unwrap();
        assert_eq!(tile.bytes().len(), crate::geometry::TILE_BYTES as usize);
        let tile1 = pyramid.tile_at(0.5, 1, 1).unwrap();
        assert_eq!(tile1.logical_size(), (crate::geometry::TILE, crate::geometry::TILE));
        let tile2 = pyramid.tile_at(0.25, 0, 0).unwrap();
        assert_eq!(tile2.bytes().len(), crate::geometry::TILE_BYTES as usize);
    }

    #[test]
    fn degenerate_one_by_one_image_skips_coarser_levels() {
        // Halving a 1x1 image immediately yields 0x0 geometry for level 1
        // onward, and `is_empty` geometry is never materialized -- so only
        // level 0 is ever produced, regardless of how many levels were
        // requested.
        let config = PyramidConfig { levels: 3, ..Default::default() };
        let pixels = solid_pixels(1, 1, 9, 9, 9);
        let pyramid = Pyramid::new_from_image(&pixels, 1, 1, config).unwrap();
        assert!(pyramid.tile_at(1.0, 0, 0).is_ok());
        assert!(pyramid.tile_at(0.5, 0, 0).is_err());
    }

    #[test]
    fn network_streaming_builds_same_tiles_as_whole_image() {
        let config = PyramidConfig { levels: 2, ..Default::default() };
        let width = 300;
        let height = 200;
        let pixels = solid_pixels(width, height, 40, 50, 60);
        let input = encode_synthetic(width, height, &pixels);

        let whole = {
            let decoder = SyntheticOneShot;
            let stride = width * BYTES_PER_PIXEL;
            let mut buf = vec![0u8; stride as usize * height as usize];
            decoder.decode(&input, &mut buf, stride, width, height).unwrap();
            let mapper = Mapper::new();
            let flush = FlushCoordinator::new();
            let levels = build_whole_image(&mapper, &flush, &config, &buf, width, height).unwrap();
            let provider = TileProvider::new(Arc::new(mapper), levels);
            provider.tile_at(1.0, 0, 0).unwrap().bytes().to_vec()
        };

        // Drive the streaming pipeline directly with the test double's
        // `OneShot` contract, one byte at a time, through the same
        // `StreamingScanlineAdapter` the StreamingScanline decoder kind
        // uses in production.
        let mut state = StreamingState {
            decoder: Box::new(StreamingScanlineAdapter::new(SyntheticOneShot)),
            phase: StreamPhase::AwaitingHeader,
            width: 0,
            height: 0,
            levels: Vec::new(),
            rows_written: 0,
            scanline_buf: Vec::new(),
        };
        let mapper = Arc::new(Mapper::new());
        let flush = FlushCoordinator::new();
        let header = Mutex::new(None);
        let provider_slot = Mutex::new(None);
        for byte in &input {
            drive_streaming(&mapper, &flush, &config, &header, &provider_slot, &mut state, Some(&[*byte])).unwrap();
        }
        finish_streaming(&mapper, &flush, &config, &header, &provider_slot, &mut state).unwrap();

        let provider = provider_slot.into_inner().unwrap();
        let streamed = provider.tile_at(1.0, 0, 0).unwrap().bytes().to_vec();
        assert_eq!(whole, streamed);
    }

    #[test]
    fn failure_is_sticky_and_tile_requests_fail_after() {
        let config = PyramidConfig { levels: 2, ..Default::default() };
        let pyramid = Pyramid::new_for_network(DecoderKind::StreamingScanline, config);
        // Truncated: a valid width/height header but a body far too short.
        let mut truncated = encode_synthetic(4, 4, &[0u8; 4]);
        truncated.truncate(16);
        let result = pyramid.append_bytes(&truncated);
        assert!(result.is_ok(), "short input just buffers, no header parsed yet");
        let finished = pyramid.data_finished();
        assert!(finished.is_err());
        assert!(matches!(pyramid.tile_at(1.0, 0, 0).unwrap_err(), PyramidError::Decoder(_)));
    }

    #[test]
    fn dirty_bytes_bounded_when_memory_constrained() {
        let config = PyramidConfig { levels: 3, memory_constrained: Some(true), ..Default::default() };
        let width = 1024;
        let height = 1024;
        let pixels = solid_pixels(width, height, 1, 2, 3);
        let pyramid = Pyramid::new_from_image(&pixels, width, height, config).unwrap();
        // All finalization happens synchronously on the producer thread
        // before `new_from_image` returns; by then every scheduled flush
        // has either completed or is still outstanding, but either way the
        // dirty total is bounded.
        let level0_bytes = (width as u64) * (height as u64) * 4;
        assert!(pyramid.dirty_bytes() <= level0_bytes + crate::flush::THROTTLE_THRESHOLD_BYTES);
    }

    #[test]
    fn from_path_decodes_real_jpeg_in_one_shot() {
        use crate::test_utils::minimal_valid_jpeg;
        use std::io::Write;

        let jpeg = minimal_valid_jpeg();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&jpeg).unwrap();

        let config = PyramidConfig { levels: 1, ..Default::default() };
        let pyramid = Pyramid::new_from_path(file.path(), DecoderKind::CgStyleOneShot, config).unwrap();
        assert_eq!(pyramid.image_size(), Some((1, 1)));
        assert!(pyramid.tile_at(1.0, 0, 0).is_ok());
    }

    #[test]
    fn level_for_scale_out_of_range_is_non_fatal_not_sticky() {
        let config = PyramidConfig { levels: 2, ..Default::default() };
        let pixels = solid_pixels(64, 64, 1, 1, 1);
        let pyramid = Pyramid::new_from_image(&pixels, 64, 64, config).unwrap();
        assert!(pyramid.tile_at(1.0, 50, 50).is_err());
        // Out-of-range tile requests are non-fatal: a subsequent, in-range
        // request still succeeds.
        assert!(pyramid.tile_at(1.0, 0, 0).is_ok());
    }
}
