//! Utility functions for byte decoding and file naming.

use std::path::{Path, PathBuf};

use byteorder::{BigEndian, ByteOrder as _, LittleEndian};

use crate::models::ByteOrder;

impl ByteOrder {
    #[inline]
    pub fn read_u32(self, bytes: &[u8]) -> u32 {
        match self {
            ByteOrder::Little => LittleEndian::read_u32(bytes),
            ByteOrder::Big => BigEndian::read_u32(bytes),
        }
    }

    #[inline]
    pub fn read_i32(self, bytes: &[u8]) -> i32 {
        match self {
            ByteOrder::Little => LittleEndian::read_i32(bytes),
            ByteOrder::Big => BigEndian::read_i32(bytes),
        }
    }

    #[inline]
    pub fn read_u64(self, bytes: &[u8]) -> u64 {
        match self {
            ByteOrder::Little => LittleEndian::read_u64(bytes),
            ByteOrder::Big => BigEndian::read_u64(bytes),
        }
    }

    #[inline]
    pub fn read_f32(self, bytes: &[u8]) -> f32 {
        match self {
            ByteOrder::Little => LittleEndian::read_f32(bytes),
            ByteOrder::Big => BigEndian::read_f32(bytes),
        }
    }

    #[inline]
    pub fn read_f64(self, bytes: &[u8]) -> f64 {
        match self {
            ByteOrder::Little => LittleEndian::read_f64(bytes),
            ByteOrder::Big => BigEndian::read_f64(bytes),
        }
    }
}

/// Swaps byte order of multi-byte elements in place.
pub fn swap_endianness_in_place(buffer: &mut [u8], element_size: usize) {
    if element_size <= 1 {
        return;
    }
    for chunk in buffer.chunks_exact_mut(element_size) {
        chunk.reverse();
    }
}

/// Path of fragment `index` of a snapshot stored under `base`.
pub fn fragment_path(base: &Path, index: usize) -> PathBuf {
    let mut name = base.as_os_str().to_owned();
    name.push(format!(".{}", index));
    PathBuf::from(name)
}

/// Path of one task file of a catalogue, e.g. `<dir>/group_tab_005.3`.
pub fn catalog_file(dir: &Path, stem: &str, num: u32, task: usize) -> PathBuf {
    dir.join(format!("{}_{:03}.{}", stem, num, task))
}
