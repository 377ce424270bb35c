//! Build-time configuration for a pyramid.

/// Selects the downsampling strategy used when deriving level `k+1` from
/// level `k`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownsamplerKind {
    /// 2x decimation: `dst[r][c] = src[2r][2c]`. No filtering. Default.
    Decimate,
    /// Delegates to an external resampler; falls back to `Decimate` if none
    /// is installed.
    HighQuality,
}

impl Default for DownsamplerKind {
    fn default() -> Self {
        DownsamplerKind::Decimate
    }
}

/// Which decoder adapter a path/network constructor should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderKind {
    /// One-shot decode via the in-process codec.
    CgStyleOneShot,
    /// Scanline-at-a-time decode, drives the streaming pipeline directly.
    StreamingScanline,
    /// One-shot decode via an alternate (faster) codec.
    OneShotTurbo,
}

/// Options that control how a pyramid build behaves. Mirrors the
/// configuration table: tile side is a compile-time constant
/// (`geometry::TILE`), everything else is set per build.
#[derive(Debug, Clone, Copy)]
pub struct PyramidConfig {
    /// Number of zoom levels to produce, including level 0.
    pub levels: u32,
    /// If true, always schedule a background fsync per finished level.
    pub flush_disk_cache: bool,
    /// If true, behave as if `flush_disk_cache` were true regardless of its
    /// setting. `None` means "probe total RAM and decide" (see `mem_probe`).
    pub memory_constrained: Option<bool>,
    /// Downsampling strategy.
    pub downsampler: DownsamplerKind,
}

impl Default for PyramidConfig {
    fn default() -> Self {
        Self {
            levels: 3,
            flush_disk_cache: false,
            memory_constrained: None,
            downsampler: DownsamplerKind::Decimate,
        }
    }
}

impl PyramidConfig {
    /// Resolves `memory_constrained`, probing total RAM when the caller
    /// left it unset.
    pub fn resolved_memory_constrained(&self) -> bool {
        self.memory_constrained
            .unwrap_or_else(crate::mem_probe::is_memory_constrained)
    }

    /// Whether a finished level should schedule a background fsync.
    pub fn should_flush(&self) -> bool {
        self.flush_disk_cache || self.resolved_memory_constrained()
    }
}
