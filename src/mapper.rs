//! Owns one backing file per pyramid level and hands out scoped,
//! page-aligned memory-map windows.

use std::collections::HashMap;
use std::fs::File;
use std::os::unix::io::AsRawFd;
use std::sync::Arc;

use memmap2::{Mmap, MmapMut, MmapOptions};
use parking_lot::RwLock;

use crate::error::{PyramidError, PyramidResult};
use crate::geometry::LevelGeometry;

/// Access mode requested for a mapped window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapMode {
    ReadOnly,
    ReadWrite,
    /// memmap2 has no write-only map; this behaves like `ReadWrite` but
    /// documents caller intent not to read the region back.
    WriteOnly,
}

enum Backing {
    Ro(Mmap),
    Rw(MmapMut),
}

/// A scoped memory-map window. Unmaps on drop. Exposes both the raw,
/// page-aligned base and a slice adjusted to the caller's logical offset,
/// per the Mapper's `map_window` contract.
pub struct MappedWindow {
    backing: Backing,
    /// Byte distance from the page-aligned base to the caller's requested
    /// logical offset.
    adjustment: usize,
    logical_len: usize,
}

impl MappedWindow {
    pub fn as_slice(&self) -> &[u8] {
        let full: &[u8] = match &self.backing {
            Backing::Ro(m) => m,
            Backing::Rw(m) => m,
        };
        &full[self.adjustment..self.adjustment + self.logical_len]
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        match &mut self.backing {
            Backing::Rw(m) => &mut m[self.adjustment..self.adjustment + self.logical_len],
            Backing::Ro(_) => panic!("as_mut_slice on a read-only window"),
        }
    }

    pub fn len(&self) -> usize {
        self.logical_len
    }

    pub fn is_empty(&self) -> bool {
        self.logical_len == 0
    }
}

/// Sequential-access hints the downsampler bookends its pass with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessHint {
    Sequential,
    WillNotNeed,
}

struct LevelHandle {
    file: Arc<File>,
    geometry: LevelGeometry,
}

/// Owns one backing file per level, per [`crate::geometry::LevelGeometry`].
/// Interior mutability (`parking_lot::RwLock`) lets a single `Mapper` be
/// shared behind an `Arc` between the producer (streaming or whole-image
/// pipeline) and the tile provider reading back finished levels.
#[derive(Default)]
pub struct Mapper {
    levels: RwLock<HashMap<u32, LevelHandle>>,
}

impl Mapper {
    pub fn new() -> Self {
        Self {
            levels: RwLock::new(HashMap::new()),
        }
    }

    /// Creates and preallocates the backing file for level `k`. The file is
    /// unlinked immediately (via `tempfile`) so abnormal termination cannot
    /// leak it, and read-ahead is disabled since the producer's own access
    /// pattern is scanline/tile granular, not sequential-whole-file.
    pub fn create_level(&self, k: u32, width: u32, height: u32) -> PyramidResult<LevelGeometry> {
        let geometry = LevelGeometry::new(k, width, height);
        if geometry.is_empty() {
            return Ok(geometry);
        }

        let file = tempfile::tempfile().map_err(PyramidError::Io)?;
        preallocate_contiguous(&file, geometry.mapped_size)?;
        file.set_len(geometry.mapped_size).map_err(PyramidError::Io)?;
        disable_readahead(&file);

        self.levels.write().insert(
            k,
            LevelHandle {
                file: Arc::new(file),
                geometry,
            },
        );
        Ok(geometry)
    }

    pub fn geometry(&self, k: u32) -> Option<LevelGeometry> {
        self.levels.read().get(&k).map(|h| h.geometry)
    }

    /// Reference-counted handle to level `k`'s file descriptor. Cloning the
    /// `Arc` keeps the descriptor valid past the mapper's own lifetime --
    /// this is how tiles handed to a viewer keep their backing file alive.
    pub fn file_handle(&self, k: u32) -> Option<Arc<File>> {
        self.levels.read().get(&k).map(|h| Arc::clone(&h.file))
    }

    /// Maps the entire file `[0, mapped_size)`. Used by the whole-image
    /// path, which prefers one big sequential map over scanline windows.
    pub fn map_whole(&self, k: u32, mode: MapMode) -> PyramidResult<MappedWindow> {
        let mapped_size = self.level_info(k)?.1;
        self.map_window(k, 0, mapped_size, mode)
    }

    /// Maps `[byte_offset, byte_offset + byte_len)`, rounding the start down
    /// to the OS page boundary as POSIX mmap requires, and returns a window
    /// whose slice is already adjusted back to the caller's logical range.
    pub fn map_window(
        &self,
        k: u32,
        byte_offset: u64,
        byte_len: u64,
        mode: MapMode,
    ) -> PyramidResult<MappedWindow> {
        let (file, _) = self.level_info(k)?;
        let page_size = page_size() as u64;
        let page_aligned_offset = (byte_offset / page_size) * page_size;
        let adjustment = (byte_offset - page_aligned_offset) as usize;
        let mapped_len = adjustment as u64 + byte_len;

        let backing = match mode {
            MapMode::ReadOnly => {
                let mmap = unsafe {
                    MmapOptions::new()
                        .offset(page_aligned_offset)
                        .len(mapped_len as usize)
                        .map(file.as_ref())
                        .map_err(PyramidError::Io)?
                };
                Backing::Ro(mmap)
            }
            MapMode::ReadWrite | MapMode::WriteOnly => {
                let mmap = unsafe {
                    MmapOptions::new()
                        .offset(page_aligned_offset)
                        .len(mapped_len as usize)
                        .map_mut(file.as_ref())
                        .map_err(PyramidError::Io)?
                };
                Backing::Rw(mmap)
            }
        };

        Ok(MappedWindow {
            backing,
            adjustment,
            logical_len: byte_len as usize,
        })
    }

    /// Shrinks level `k`'s file by exactly `scratch_bytes` from the end: the
    /// post-retiling file carries trailing scratch, not leading.
    pub fn truncate_scratch(&self, k: u32) -> PyramidResult<()> {
        let levels = self.levels.read();
        let handle = levels
            .get(&k)
            .ok_or(PyramidError::OutOfRange { level: k, row: 0, col: 0 })?;
        let new_len = handle.geometry.mapped_size - handle.geometry.scratch_bytes;
        handle.file.set_len(new_len).map_err(PyramidError::Io)?;
        Ok(())
    }

    /// Hints the kernel about the access pattern the downsampler is about
    /// to use (or just finished using) on level `k`'s row-major region.
    pub fn hint(&self, k: u32, hint: AccessHint) {
        if let Some(handle) = self.levels.read().get(&k) {
            let advice = match hint {
                AccessHint::Sequential => libc::POSIX_FADV_SEQUENTIAL,
                AccessHint::WillNotNeed => libc::POSIX_FADV_DONTNEED,
            };
            unsafe {
                libc::posix_fadvise(handle.file.as_raw_fd(), 0, 0, advice);
            }
        }
    }

    fn level_info(&self, k: u32) -> PyramidResult<(Arc<File>, u64)> {
        let levels = self.levels.read();
        let handle = levels
            .get(&k)
            .ok_or(PyramidError::OutOfRange { level: k, row: 0, col: 0 })?;
        Ok((Arc::clone(&handle.file), handle.geometry.mapped_size))
    }
}

fn page_size() -> usize {
    unsafe { libc::sysconf(libc::_SC_PAGESIZE) as usize }
}

#[cfg(target_os = "linux")]
fn preallocate_contiguous(file: &File, size: u64) -> PyramidResult<()> {
    let ret = unsafe { libc::posix_fallocate(file.as_raw_fd(), 0, size as libc::off_t) };
    if ret != 0 {
        // posix_fallocate returns an errno value directly, not -1/errno.
        return Err(PyramidError::Io(std::io::Error::from_raw_os_error(ret)));
    }
    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn preallocate_contiguous(file: &File, size: u64) -> PyramidResult<()> {
    file.set_len(size).map_err(PyramidError::Io)
}

fn disable_readahead(file: &File) {
    unsafe {
        libc::posix_fadvise(file.as_raw_fd(), 0, 0, libc::POSIX_FADV_RANDOM);
    }
}
