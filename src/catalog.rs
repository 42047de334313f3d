//! Pieces shared by the FOF and Subfind catalogue readers.
//!
//! Catalogue fragments ("tasks") are small files holding a short count
//! header followed by fixed-shape arrays. Each file is memory mapped for
//! the duration of its parse and walked with a bounds-checked cursor; the
//! map is dropped, and the file closed, before the parse returns.

use std::fs::File;
use std::path::{Path, PathBuf};

use memmap2::{Mmap, MmapOptions};

use crate::error::{Error, Result};
use crate::models::{ByteOrder, IdWidth};

/// Bytes skipped at the start of every `*_ids_*` file.
pub const IDS_HEADER_SIZE: usize = 16;

pub(crate) fn map_file(path: &Path) -> Result<Mmap> {
    let file = File::open(path)?;
    let mmap = unsafe { MmapOptions::new().map(&file)? };
    Ok(mmap)
}

pub(crate) fn groups_dir(base: &Path, num: u32) -> PathBuf {
    base.join(format!("groups_{:03}", num))
}

pub(crate) fn postproc_dir(base: &Path, num: u32) -> PathBuf {
    base.join(format!("postproc_{:03}", num))
}

/// Cursor over a byte slice for sequential parsing.
pub(crate) struct ParseCursor<'a> {
    data: &'a [u8],
    pos: usize,
    order: ByteOrder,
    path: &'a Path,
}

impl<'a> ParseCursor<'a> {
    pub fn new(data: &'a [u8], order: ByteOrder, path: &'a Path) -> Self {
        Self {
            data,
            pos: 0,
            order,
            path,
        }
    }

    fn eof(&self, what: &str) -> Error {
        Error::UnexpectedEof {
            path: self.path.to_path_buf(),
            context: what.to_string(),
        }
    }

    pub fn seek(&mut self, pos: usize, what: &str) -> Result<()> {
        if pos > self.data.len() {
            return Err(self.eof(what));
        }
        self.pos = pos;
        Ok(())
    }

    pub fn read_bytes(&mut self, n: usize, what: &str) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(n).ok_or_else(|| self.eof(what))?;
        if end > self.data.len() {
            return Err(self.eof(what));
        }
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn read_array(&mut self, n: usize, width: usize, what: &str) -> Result<&'a [u8]> {
        let len = n.checked_mul(width).ok_or_else(|| self.eof(what))?;
        self.read_bytes(len, what)
    }

    pub fn read_i32(&mut self, what: &str) -> Result<i32> {
        let b = self.read_bytes(4, what)?;
        Ok(self.order.read_i32(b))
    }

    /// Reads an i32 count, rejecting negative values.
    pub fn read_count(&mut self, what: &str) -> Result<usize> {
        let v = self.read_i32(what)?;
        usize::try_from(v).map_err(|_| {
            Error::InvalidFileStructure(format!("{:?}: negative {} ({})", self.path, what, v))
        })
    }

    /// Reads `n` i32 values that must be non-negative.
    pub fn read_counts(&mut self, n: usize, what: &str) -> Result<Vec<u64>> {
        let order = self.order;
        let path = self.path;
        self.read_array(n, 4, what)?
            .chunks_exact(4)
            .map(|c| {
                let v = order.read_i32(c);
                u64::try_from(v).map_err(|_| {
                    Error::InvalidFileStructure(format!("{:?}: negative {} ({})", path, what, v))
                })
            })
            .collect()
    }

    pub fn read_f32s(&mut self, n: usize, what: &str) -> Result<Vec<f32>> {
        let order = self.order;
        Ok(self
            .read_array(n, 4, what)?
            .chunks_exact(4)
            .map(|c| order.read_f32(c))
            .collect())
    }

    pub fn read_f64s(&mut self, n: usize, what: &str) -> Result<Vec<f64>> {
        let order = self.order;
        Ok(self
            .read_array(n, 8, what)?
            .chunks_exact(8)
            .map(|c| order.read_f64(c))
            .collect())
    }

    pub fn read_ids(&mut self, n: usize, width: IdWidth, what: &str) -> Result<Vec<u64>> {
        let order = self.order;
        let bytes = self.read_array(n, width.bytes(), what)?;
        Ok(match width {
            IdWidth::Narrow => bytes
                .chunks_exact(4)
                .map(|c| order.read_u32(c) as u64)
                .collect(),
            IdWidth::Wide => bytes.chunks_exact(8).map(|c| order.read_u64(c)).collect(),
        })
    }
}

/// Leading fields of every `group_tab` / `sub_tab` file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskHeader {
    /// Groups stored in this task file.
    pub groups: usize,
    /// Identifiers in this task's companion ID stream.
    pub ids: usize,
    /// Groups over all tasks.
    pub total_groups: usize,
    pub ntask: usize,
}

impl TaskHeader {
    pub(crate) fn parse(cursor: &mut ParseCursor) -> Result<Self> {
        let groups = cursor.read_count("group count")?;
        let ids = cursor.read_count("id count")?;
        let total_groups = cursor.read_count("total group count")?;
        let ntask = cursor.read_count("task count")?;
        Ok(Self {
            groups,
            ids,
            total_groups,
            ntask,
        })
    }
}

/// Splits `v` into consecutive fixed-size arrays.
pub(crate) fn chunked<T: Copy + Default, const N: usize>(v: &[T]) -> Vec<[T; N]> {
    v.chunks_exact(N)
        .map(|c| {
            let mut out = [T::default(); N];
            out.copy_from_slice(c);
            out
        })
        .collect()
}
