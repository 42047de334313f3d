//! Snapshot header parsing.
//!
//! The header is a single 256-byte record bracketed by 4-byte markers that
//! both hold 256. The leading marker doubles as a byte-order sentinel: if it
//! reads as 256 in native order the file is native, if it reads as the
//! byte-swapped value the whole file is in the opposite order.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use log::trace;

use crate::error::{Error, ReadContext, Result};
use crate::models::{ByteOrder, HEADER_SIZE, HEADER_USED, N_TYPES, SnapshotHeader};

/// Sequential decoder over the header record.
struct FieldReader<'a> {
    buf: &'a [u8],
    pos: usize,
    order: ByteOrder,
}

impl<'a> FieldReader<'a> {
    fn take(&mut self, n: usize) -> &'a [u8] {
        let s = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        s
    }

    fn u32(&mut self) -> u32 {
        self.order.read_u32(self.take(4))
    }

    fn i32(&mut self) -> i32 {
        self.order.read_i32(self.take(4))
    }

    fn f64(&mut self) -> f64 {
        self.order.read_f64(self.take(8))
    }

    fn flag(&mut self) -> bool {
        self.i32() != 0
    }

    fn u32s(&mut self) -> [u32; N_TYPES] {
        let mut out = [0u32; N_TYPES];
        for v in out.iter_mut() {
            *v = self.u32();
        }
        out
    }

    fn f64s(&mut self) -> [f64; N_TYPES] {
        let mut out = [0f64; N_TYPES];
        for v in out.iter_mut() {
            *v = self.f64();
        }
        out
    }
}

/// Decides the byte order from the leading header marker.
pub fn detect_byte_order(marker: [u8; 4]) -> Option<ByteOrder> {
    let native = u32::from_ne_bytes(marker);
    if native == HEADER_SIZE {
        Some(ByteOrder::native())
    } else if native == HEADER_SIZE.swap_bytes() {
        Some(ByteOrder::native().swapped())
    } else {
        None
    }
}

/// Decodes the declared fields of a header record whose order is known.
pub fn decode_header(record: &[u8; HEADER_SIZE as usize], order: ByteOrder) -> SnapshotHeader {
    let mut f = FieldReader {
        buf: record,
        pos: 0,
        order,
    };
    let counts = f.u32s();
    let masses = f.f64s();
    let time = f.f64();
    let redshift = f.f64();
    let flag_sfr = f.flag();
    let flag_feedback = f.flag();
    let total_counts_low = f.u32s();
    let flag_cooling = f.flag();
    let num_files = f.i32();
    let box_size = f.f64();
    let omega_matter = f.f64();
    let omega_lambda = f.f64();
    let hubble_param = f.f64();
    let flag_stellar_age = f.flag();
    let flag_metals = f.flag();
    let total_counts_high = f.u32s();
    let flag_entropy_ics = f.flag();
    debug_assert_eq!(f.pos, HEADER_USED);

    SnapshotHeader {
        counts,
        masses,
        time,
        redshift,
        flag_sfr,
        flag_feedback,
        total_counts_low,
        flag_cooling,
        num_files,
        box_size,
        omega_matter,
        omega_lambda,
        hubble_param,
        flag_stellar_age,
        flag_metals,
        total_counts_high,
        flag_entropy_ics,
        byte_order: order,
    }
}

/// Reads and validates the header record from the start of `reader`.
///
/// `path` only labels errors.
pub fn parse_header<R: Read>(reader: &mut R, path: &Path) -> Result<SnapshotHeader> {
    let ctx = ReadContext::new(path, "header");

    let mut marker = [0u8; 4];
    reader.read_exact(&mut marker).map_err(|e| ctx.io(e))?;
    let order = detect_byte_order(marker).ok_or_else(|| Error::HeaderMismatch {
        path: path.to_path_buf(),
        found: u32::from_ne_bytes(marker),
    })?;

    let mut record = [0u8; HEADER_SIZE as usize];
    reader.read_exact(&mut record).map_err(|e| ctx.io(e))?;

    reader.read_exact(&mut marker).map_err(|e| ctx.io(e))?;
    let trailing = order.read_u32(&marker);
    if trailing != HEADER_SIZE {
        return Err(Error::HeaderMismatch {
            path: path.to_path_buf(),
            found: trailing,
        });
    }

    trace!("header of {:?} is {:?}-endian", path, order);
    Ok(decode_header(&record, order))
}

/// Opens `path` and reads its header. The file is closed before returning.
pub fn read_header(path: impl AsRef<Path>) -> Result<SnapshotHeader> {
    let path = path.as_ref();
    let mut reader = BufReader::new(File::open(path)?);
    parse_header(&mut reader, path)
}
