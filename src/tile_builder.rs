//! Retiling: rearranges one level's pixels from row-major into tile-major,
//! one tile row at a time, in place inside the level's own backing file.
//!
//! Whole-file mode (full decode already sitting in level memory) and
//! streaming mode (tile rows arrive one at a time) both reduce to the same
//! per-row operation: read the tile row's row-major band, rearrange it into
//! tile order, and write it back `scratch_bytes` earlier in the file. That
//! shift-by-one-band invariant is what lets the scratch band serve as a
//! first-tile-row staging area that truncates away cleanly at the end.

use crate::error::PyramidResult;
use crate::geometry::{LevelGeometry, TILE, TILE_BYTES, TILE_ROW_BYTES};
use crate::mapper::{MapMode, Mapper};

/// Rearranges tile row `row` of level `k` from row-major to tile-major.
///
/// Preconditions (enforced by the caller): row-major scanlines
/// `[row*TILE, (row+1)*TILE)` have already been fully written, and this
/// exact `row` has not been retiled before -- or, if it has, the source
/// bytes are unchanged, so the call is idempotent.
pub fn retile_row(mapper: &Mapper, k: u32, geometry: &LevelGeometry, row: u32) -> PyramidResult<()> {
    let scratch = geometry.scratch_bytes;
    let padded_bytes_per_row = geometry.padded_bytes_per_row as usize;
    let cols = geometry.cols as usize;
    let tile_row_bytes = TILE_ROW_BYTES as usize;
    let tile_bytes = TILE_BYTES as usize;

    let src_offset = (row as u64 + 1) * scratch;
    let mut staging = vec![0u8; scratch as usize];
    {
        let src_window = mapper.map_window(k, src_offset, scratch, MapMode::ReadOnly)?;
        let src = src_window.as_slice();
        for i in 0..TILE as usize {
            for c in 0..cols {
                let src_start = i * padded_bytes_per_row + c * tile_row_bytes;
                let dst_start = c * tile_bytes + i * tile_row_bytes;
                staging[dst_start..dst_start + tile_row_bytes]
                    .copy_from_slice(&src[src_start..src_start + tile_row_bytes]);
            }
        }
    }

    let dst_offset = row as u64 * scratch;
    let mut dst_window = mapper.map_window(k, dst_offset, scratch, MapMode::ReadWrite)?;
    dst_window.as_mut_slice().copy_from_slice(&staging);
    Ok(())
}

/// Retiles every tile row of a level that was fully decoded up front (the
/// whole-image path's `final=true, all-rows` call).
pub fn retile_all(mapper: &Mapper, k: u32, geometry: &LevelGeometry) -> PyramidResult<()> {
    for row in 0..geometry.rows {
        retile_row(mapper, k, geometry, row)?;
    }
    Ok(())
}

/// Tracks the next tile row a level's streaming builder should emit.
/// Owned by the streaming pipeline state machine, one per level.
#[derive(Debug, Default)]
pub struct StreamingProgress {
    next_row: u32,
}

impl StreamingProgress {
    pub fn new() -> Self {
        Self { next_row: 0 }
    }

    pub fn next_row(&self) -> u32 {
        self.next_row
    }

    /// Retiles the next tile row if `scanlines_written` covers it, advancing
    /// `next_row`. No-ops (returns `Ok(false)`) if the row isn't ready yet.
    pub fn advance_if_ready(
        &mut self,
        mapper: &Mapper,
        k: u32,
        geometry: &LevelGeometry,
        scanlines_written: u32,
    ) -> PyramidResult<bool> {
        if self.next_row >= geometry.rows {
            return Ok(false);
        }
        let needed = (self.next_row + 1) * TILE;
        if scanlines_written < needed {
            return Ok(false);
        }
        retile_row(mapper, k, geometry, self.next_row)?;
        self.next_row += 1;
        Ok(true)
    }

    /// Retiles any remaining rows at end-of-stream.
    pub fn finish(
        &mut self,
        mapper: &Mapper,
        k: u32,
        geometry: &LevelGeometry,
    ) -> PyramidResult<()> {
        while self.next_row < geometry.rows {
            retile_row(mapper, k, geometry, self.next_row)?;
            self.next_row += 1;
        }
        Ok(())
    }
}
