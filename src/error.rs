//! Error types for raster_pyramid_core.

use pyo3::exceptions::PyRuntimeError;
use pyo3::PyErr;
use thiserror::Error;

/// Error kinds produced by the pyramid builder and reader.
#[derive(Error, Debug)]
pub enum PyramidError {
    /// Any file create/preallocate/map/truncate/fsync failure. Fatal to the build.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The external decoder reported a non-recoverable error. Fatal.
    #[error("decoder error: {0}")]
    Decoder(String),

    /// Not a real error: the streaming decoder needs more compressed bytes
    /// before it can make progress. The producer suspends and returns.
    #[error("decoder needs more input")]
    DecoderNeedsMore,

    /// A tile request fell outside the pyramid's (level, row, col) bounds.
    /// Non-fatal; surfaces straight to the caller.
    #[error("tile out of range: level={level} row={row} col={col}")]
    OutOfRange { level: u32, row: u32, col: u32 },
}

impl From<PyramidError> for PyErr {
    fn from(err: PyramidError) -> PyErr {
        PyRuntimeError::new_err(err.to_string())
    }
}

/// Result type alias used throughout the crate.
pub type PyramidResult<T> = Result<T, PyramidError>;
