//! Error types for snapshot and catalogue reading.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::models::BlockKey;

/// Which side of a block a record marker sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Leading,
    Trailing,
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Marker::Leading => f.write_str("leading"),
            Marker::Trailing => f.write_str("trailing"),
        }
    }
}

/// All errors that can occur when reading snapshots and catalogues.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from the underlying file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Header record marker is neither 256 nor its byte-swapped value,
    /// or the trailing marker disagrees with the leading one.
    #[error("Header record mismatch in {path:?}: found marker {found}")]
    HeaderMismatch { path: PathBuf, found: u32 },

    /// A block's record marker does not match the size computed from the header.
    #[error("Corrupt block '{block}' in {path:?}: {marker} marker is {found}, expected {expected}")]
    CorruptBlock {
        path: PathBuf,
        block: BlockKey,
        marker: Marker,
        expected: u64,
        found: u64,
    },

    /// The file ended before a declared region could be read.
    #[error("Unexpected end of file in {path:?} while reading {context}")]
    UnexpectedEof { path: PathBuf, context: String },

    /// The block is not present under the current header flags and options.
    #[error("Block absent: {0}")]
    BlockAbsent(BlockKey),

    /// Unrecognised block name.
    #[error("Unknown block: {0}")]
    UnknownBlock(String),

    /// Unrecognised particle type name.
    #[error("Unknown particle type: {0}")]
    UnknownParticleType(String),

    /// A spatial helper was handed a block without x/y/z columns.
    #[error("Block '{0}' has no x/y/z columns")]
    NotSpatial(BlockKey),

    /// A reused sort permutation does not belong to the block being filtered.
    #[error("Sorter covers {found} rows but the block has {expected}")]
    SorterMismatch { expected: usize, found: usize },

    /// Group, subhalo or fragment index past the end of its table.
    #[error("{what} index {index} out of range (len {len})")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },

    /// File contents are inconsistent with themselves.
    #[error("Invalid file structure: {0}")]
    InvalidFileStructure(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Names the file and region being read so I/O failures can be reported
/// against them.
#[derive(Clone)]
pub(crate) struct ReadContext<'a> {
    pub path: &'a std::path::Path,
    pub what: &'a str,
}

impl<'a> ReadContext<'a> {
    pub fn new(path: &'a std::path::Path, what: &'a str) -> Self {
        Self { path, what }
    }

    /// Converts an io error, turning short reads into `UnexpectedEof`.
    pub fn io(&self, err: std::io::Error) -> Error {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            Error::UnexpectedEof {
                path: self.path.to_path_buf(),
                context: self.what.to_string(),
            }
        } else {
            Error::Io(err)
        }
    }

    pub fn eof(&self) -> Error {
        Error::UnexpectedEof {
            path: self.path.to_path_buf(),
            context: self.what.to_string(),
        }
    }
}
