//! Python buffer wrapper for a memory-mapped tile.
//!
//! Exposes `provider::Tile` through Python's buffer protocol for zero-copy
//! transfer: the mapping stays alive exactly as long as this wrapper does,
//! and is unmapped (via `Tile`'s `Drop`) once Python releases the object.

use std::ffi::CString;
use std::os::raw::{c_int, c_void};
use std::ptr;

use pyo3::exceptions::PyBufferError;
use pyo3::ffi;
use pyo3::prelude::*;

use crate::provider::Tile;

/// Read-only buffer over one tile's pixel bytes.
#[pyclass]
pub struct TileBuffer {
    tile: Tile,
}

impl TileBuffer {
    pub fn new(tile: Tile) -> Self {
        Self { tile }
    }
}

#[pymethods]
impl TileBuffer {
    fn __len__(&self) -> usize {
        self.tile.bytes().len()
    }

    /// Python buffer protocol: fill `view` with a pointer to our bytes.
    ///
    /// # Safety
    /// CPython calls this with a valid `Py_buffer*` or NULL.
    unsafe fn __getbuffer__(
        slf: Bound<'_, Self>,
        view: *mut ffi::Py_buffer,
        flags: c_int,
    ) -> PyResult<()> {
        if view.is_null() {
            return Err(PyBufferError::new_err("View is null"));
        }

        if (flags & ffi::PyBUF_WRITABLE) == ffi::PyBUF_WRITABLE {
            return Err(PyBufferError::new_err("Object is not writable"));
        }

        let (ptr, len) = {
            let borrowed = slf.borrow();
            let bytes = borrowed.tile.bytes();
            (bytes.as_ptr(), bytes.len())
        };

        // Keep `self` alive for the lifetime of the exported buffer.
        (*view).obj = slf.into_any().into_ptr();

        (*view).buf = ptr as *mut c_void;
        (*view).len = len as isize;
        (*view).readonly = 1;
        (*view).itemsize = 1;

        // Optional PEP 3118 format string.
        (*view).format = if (flags & ffi::PyBUF_FORMAT) == ffi::PyBUF_FORMAT {
            CString::new("B").unwrap().into_raw()
        } else {
            ptr::null_mut()
        };

        (*view).ndim = 1;
        (*view).shape = if (flags & ffi::PyBUF_ND) == ffi::PyBUF_ND {
            &mut (*view).len
        } else {
            ptr::null_mut()
        };

        (*view).strides = if (flags & ffi::PyBUF_STRIDES) == ffi::PyBUF_STRIDES {
            &mut (*view).itemsize
        } else {
            ptr::null_mut()
        };

        (*view).suboffsets = ptr::null_mut();
        (*view).internal = ptr::null_mut();

        Ok(())
    }

    /// Python buffer protocol: release any auxiliary memory.
    ///
    /// # Safety
    /// CPython calls this with a valid `Py_buffer*` used previously for getbuffer.
    unsafe fn __releasebuffer__(&self, view: *mut ffi::Py_buffer) {
        if view.is_null() {
            return;
        }
        // Release memory held by the optional format string (if allocated).
        if !(*view).format.is_null() {
            drop(CString::from_raw((*view).format));
            (*view).format = ptr::null_mut();
        }
    }
}
