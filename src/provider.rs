//! Tile Provider: random-access read-back of one tile's bytes given
//! `(scale_fraction, row, col)`.

use std::sync::Arc;

use crate::error::{PyramidError, PyramidResult};
use crate::geometry::{LevelGeometry, TILE, TILE_BYTES};
use crate::mapper::{MapMode, Mapper, MappedWindow};

/// Maps `scale_fraction` to a discrete pyramid level: `1.0 -> 0`,
/// `0.5 -> 1`, `0.25 -> 2`, ...
pub fn level_for_scale(scale_fraction: f64) -> u32 {
    debug_assert!(scale_fraction > 0.0 && scale_fraction <= 1.0);
    (-(scale_fraction.log2())).round() as u32
}

/// One tile's bytes, read-only, mapped on demand and unmapped when this
/// handle is released (dropped). The mapping is the only heap-allocated
/// state behind a tile request; owning it here means there is nothing left
/// to free once the handle goes away.
pub struct Tile {
    window: MappedWindow,
}

impl Tile {
    pub fn bytes(&self) -> &[u8] {
        self.window.as_slice()
    }

    /// Partial right/bottom tiles still report `TILE x TILE`; padded pixels
    /// carry unspecified alpha.
    pub fn logical_size(&self) -> (u32, u32) {
        (TILE, TILE)
    }
}

/// Random-access tile reader over a pyramid's levels. `ready_rows[k]` bounds
/// how many of level `k`'s tile rows are safe to read right now: a finished
/// pyramid sets it to `geometry.rows` for every level, but the streaming
/// pipeline keeps it in step with each level's [`crate::tile_builder::StreamingProgress`]
/// so a caller can fetch tiles from rows already retiled without waiting for
/// the whole build to finish.
pub struct TileProvider {
    mapper: Arc<Mapper>,
    levels: Vec<LevelGeometry>,
    ready_rows: Vec<u32>,
}

impl TileProvider {
    /// `levels[k]` must be level `k`'s geometry, in order, as produced by
    /// the pipeline that built the pyramid. Used by the whole-image path,
    /// where every level is already fully retiled by the time the provider
    /// is built, so all rows are ready from the start.
    pub fn new(mapper: Arc<Mapper>, levels: Vec<LevelGeometry>) -> Self {
        let ready_rows = levels.iter().map(|g| g.rows).collect();
        Self { mapper, levels, ready_rows }
    }

    /// Same as [`Self::new`], but for a pyramid still under construction by
    /// the streaming pipeline: no tile row of any level is safe to read yet,
    /// so `ready_rows` starts at zero and is raised by [`Self::set_ready_rows`]
    /// as each level's [`crate::tile_builder::StreamingProgress`] retiles rows.
    pub fn new_streaming(mapper: Arc<Mapper>, levels: Vec<LevelGeometry>) -> Self {
        let ready_rows = vec![0; levels.len()];
        Self { mapper, levels, ready_rows }
    }

    /// Publishes that level `k` now has `rows` tile rows safely readable.
    /// A no-op for an out-of-range level.
    pub fn set_ready_rows(&mut self, k: u32, rows: u32) {
        if let Some(slot) = self.ready_rows.get_mut(k as usize) {
            *slot = rows;
        }
    }

    pub fn tile_at(&self, scale_fraction: f64, row: u32, col: u32) -> PyramidResult<Tile> {
        let level = level_for_scale(scale_fraction);
        let geometry = self
            .levels
            .get(level as usize)
            .copied()
            .ok_or(PyramidError::OutOfRange { level, row, col })?;
        let ready = self.ready_rows.get(level as usize).copied().unwrap_or(0);
        if geometry.is_empty() || row >= geometry.rows || col >= geometry.cols || row >= ready {
            return Err(PyramidError::OutOfRange { level, row, col });
        }
        let offset = geometry.tile_offset(row, col);
        let window = self.mapper.map_window(level, offset, TILE_BYTES, MapMode::ReadOnly)?;
        Ok(Tile { window })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::Mapper;
    use crate::test_utils::fill_gradient;
    use crate::tile_builder::retile_all;

    #[test]
    fn level_for_scale_matches_discrete_steps() {
        assert_eq!(level_for_scale(1.0), 0);
        assert_eq!(level_for_scale(0.5), 1);
        assert_eq!(level_for_scale(0.25), 2);
    }

    #[test]
    fn tile_at_maps_scale_to_level_one_tile_offset() {
        let mapper = Arc::new(Mapper::new());
        let g0 = mapper.create_level(0, 1024, 1024).unwrap();
        let g1 = mapper.create_level(1, 512, 512).unwrap();
        {
            let mut window = mapper.map_whole(0, MapMode::ReadWrite).unwrap();
            fill_gradient(window.as_mut_slice(), &g0);
        }
        {
            let mut window = mapper.map_whole(1, MapMode::ReadWrite).unwrap();
            fill_gradient(window.as_mut_slice(), &g1);
        }
        retile_all(&mapper, 0, &g0).unwrap();
        retile_all(&mapper, 1, &g1).unwrap();
        mapper.truncate_scratch(0).unwrap();
        mapper.truncate_scratch(1).unwrap();

        let provider = TileProvider::new(Arc::clone(&mapper), vec![g0, g1]);
        let tile = provider.tile_at(0.5, 1, 1).unwrap();
        assert_eq!(tile.logical_size(), (TILE, TILE));

        // Tile (1,1) at level 1's top-left pixel corresponds to (256, 256)
        // in the level-1 image.
        let expected_offset = g1.tile_offset(1, 1);
        let direct = mapper.map_window(1, expected_offset, TILE_BYTES, MapMode::ReadOnly).unwrap();
        assert_eq!(tile.bytes(), direct.as_slice());
    }

    #[test]
    fn out_of_range_tile_request_is_non_fatal() {
        let mapper = Arc::new(Mapper::new());
        let g0 = mapper.create_level(0, 256, 256).unwrap();
        let provider = TileProvider::new(mapper, vec![g0]);
        let err = provider.tile_at(1.0, 5, 5).unwrap_err();
        assert!(matches!(err, PyramidError::OutOfRange { .. }));
    }

    #[test]
    fn streaming_provider_rejects_not_yet_retiled_rows() {
        let mapper = Arc::new(Mapper::new());
        let g0 = mapper.create_level(0, 512, 512).unwrap();
        {
            let mut window = mapper.map_whole(0, MapMode::ReadWrite).unwrap();
            fill_gradient(window.as_mut_slice(), &g0);
        }
        // Data is already sitting in the row-major region, exactly as it
        // would be mid-stream, but no tile row has been retiled yet.
        let mut provider = TileProvider::new_streaming(Arc::clone(&mapper), vec![g0]);
        assert!(matches!(
            provider.tile_at(1.0, 0, 0).unwrap_err(),
            PyramidError::OutOfRange { .. }
        ));

        retile_all(&mapper, 0, &g0).unwrap();
        provider.set_ready_rows(0, g0.rows);
        assert!(provider.tile_at(1.0, 0, 0).is_ok());
    }
}
