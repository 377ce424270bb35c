//! Derives level `k+1` from level `k`: 2x decimation by default, or an
//! optional external resampler for higher-quality output.

use crate::config::DownsamplerKind;
use crate::error::PyramidResult;
use crate::geometry::{LevelGeometry, BYTES_PER_PIXEL};
use crate::mapper::{AccessHint, MapMode, Mapper};

/// Contract for an external (higher-quality) resampler. Must honor the
/// destination geometry exactly and never read past the declared source
/// extents.
pub trait ExternalResampler: Send + Sync {
    fn resample(
        &self,
        src: &[u8],
        src_stride: u32,
        src_width: u32,
        src_height: u32,
        dst: &mut [u8],
        dst_stride: u32,
        dst_width: u32,
        dst_height: u32,
    );
}

/// Writes `dst[r][c] = src[2r][2c]` over the row-major regions of `src_geom`
/// and `dst_geom`. No filtering.
///
/// Destination rows never overlap and each reads a disjoint source row, so
/// the per-row work fans out over `rayon`'s global pool via the same
/// `par_iter` idiom used elsewhere in this crate for independent per-tile
/// work.
fn decimate(src: &[u8], src_geom: &LevelGeometry, dst: &mut [u8], dst_geom: &LevelGeometry) {
    use rayon::prelude::*;

    let src_stride = src_geom.padded_bytes_per_row as usize;
    let dst_stride = dst_geom.padded_bytes_per_row as usize;
    let bpp = BYTES_PER_PIXEL as usize;
    let dst_width = dst_geom.width as usize;

    dst.par_chunks_mut(dst_stride).enumerate().for_each(|(r, dst_row)| {
        let src_row_start = (2 * r) * src_stride;
        let src_row = &src[src_row_start..src_row_start + src_stride];
        for c in 0..dst_width {
            let src_px = (2 * c) * bpp;
            let dst_px = c * bpp;
            dst_row[dst_px..dst_px + bpp].copy_from_slice(&src_row[src_px..src_px + bpp]);
        }
    });
}

/// Runs the downsample pass from `src_k` into `dst_k`, both already created
/// via [`Mapper::create_level`]. Operates only on the row-major region of
/// each level, before either is retiled.
pub fn downsample_level(
    mapper: &Mapper,
    src_k: u32,
    src_geom: &LevelGeometry,
    dst_k: u32,
    dst_geom: &LevelGeometry,
    kind: DownsamplerKind,
    resampler: Option<&dyn ExternalResampler>,
) -> PyramidResult<()> {
    if dst_geom.is_empty() {
        return Ok(());
    }

    mapper.hint(src_k, AccessHint::Sequential);
    mapper.hint(dst_k, AccessHint::Sequential);

    let src_window = mapper.map_window(
        src_k,
        src_geom.row_major_offset(),
        src_geom.padded_bytes_per_row as u64 * src_geom.height as u64,
        MapMode::ReadOnly,
    )?;
    let mut dst_window = mapper.map_window(
        dst_k,
        dst_geom.row_major_offset(),
        dst_geom.padded_bytes_per_row as u64 * dst_geom.height as u64,
        MapMode::WriteOnly,
    )?;

    match (kind, resampler) {
        (DownsamplerKind::HighQuality, Some(r)) => r.resample(
            src_window.as_slice(),
            src_geom.padded_bytes_per_row,
            src_geom.width,
            src_geom.height,
            dst_window.as_mut_slice(),
            dst_geom.padded_bytes_per_row,
            dst_geom.width,
            dst_geom.height,
        ),
        _ => decimate(src_window.as_slice(), src_geom, dst_window.as_mut_slice(), dst_geom),
    }

    drop(src_window);
    drop(dst_window);
    mapper.hint(src_k, AccessHint::WillNotNeed);
    mapper.hint(dst_k, AccessHint::WillNotNeed);
    Ok(())
}

/// Streaming-path counterpart of [`downsample_level`]: copies every
/// `(1 << shift)`-th pixel of one already-written level-0 scanline into one
/// scanline of level `shift`'s row-major region. Replaces the whole-region
/// decimation pass for levels derived on the fly.
pub fn decimate_scanline(src_scanline: &[u8], shift: u32, dst_scanline: &mut [u8], dst_width: u32) {
    let bpp = BYTES_PER_PIXEL as usize;
    let stride = 1usize << shift;
    for c in 0..dst_width as usize {
        let src_px = (c * stride) * bpp;
        let dst_px = c * bpp;
        dst_scanline[dst_px..dst_px + bpp].copy_from_slice(&src_scanline[src_px..src_px + bpp]);
    }
}
