use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use log::{debug, trace, warn};

use crate::config::SnapshotOptions;
use crate::error::{Error, Marker, ReadContext, Result};
use crate::header::{parse_header, read_header};
use crate::index::filter_by_ids;
use crate::layout::BlockLayout;
use crate::models::{
    BlockDescriptor, BlockKey, ByteOrder, IdWidth, MARKER_SIZE, ParticleBlock, ParticleType,
    SnapshotHeader,
};
use crate::utils::{fragment_path, swap_endianness_in_place};

/// Fixed-width numbers a block payload can be decoded into.
pub trait Scalar: Sized + Copy {
    const SIZE: usize = std::mem::size_of::<Self>();
    fn from_ne_bytes(bytes: &[u8]) -> Self;
}

macro_rules! impl_scalar {
    ($t:ty) => {
        impl Scalar for $t {
            fn from_ne_bytes(bytes: &[u8]) -> Self {
                let mut raw = [0u8; std::mem::size_of::<$t>()];
                raw.copy_from_slice(bytes);
                <$t>::from_ne_bytes(raw)
            }
        }
    };
}

impl_scalar!(f32);
impl_scalar!(u32);
impl_scalar!(u64);

/// Decodes a payload stored in `order` into native scalars.
pub fn decode_scalars<T: Scalar>(mut bytes: Vec<u8>, order: ByteOrder) -> Vec<T> {
    if !order.is_native() {
        swap_endianness_in_place(&mut bytes, T::SIZE);
    }
    bytes.chunks_exact(T::SIZE).map(T::from_ne_bytes).collect()
}

/// Decodes an identifier payload of the given width.
pub fn decode_ids(bytes: Vec<u8>, order: ByteOrder, width: IdWidth) -> Vec<u64> {
    match width {
        IdWidth::Narrow => decode_scalars::<u32>(bytes, order)
            .into_iter()
            .map(u64::from)
            .collect(),
        IdWidth::Wide => decode_scalars::<u64>(bytes, order),
    }
}

/// One open fragment file with its freshly parsed layout. Dropped, and so
/// closed, at the end of each operation.
struct Fragment<R: Read + Seek> {
    path: PathBuf,
    reader: R,
    layout: BlockLayout,
}

impl Fragment<BufReader<File>> {
    fn open(path: PathBuf, options: &SnapshotOptions) -> Result<Self> {
        let file = File::open(&path)?;
        Self::new(path, BufReader::new(file), options)
    }
}

impl<R: Read + Seek> Fragment<R> {
    fn new(path: PathBuf, mut reader: R, options: &SnapshotOptions) -> Result<Self> {
        let header = parse_header(&mut reader, &path)?;
        let layout = BlockLayout::new(&header, options);
        Ok(Self {
            path,
            reader,
            layout,
        })
    }

    fn order(&self) -> ByteOrder {
        self.layout.header().byte_order
    }

    fn check_marker(&mut self, desc: &BlockDescriptor, marker: Marker) -> Result<()> {
        let ctx = ReadContext::new(&self.path, desc.key.as_str());
        let mut buf = [0u8; MARKER_SIZE as usize];
        self.reader.read_exact(&mut buf).map_err(|e| ctx.io(e))?;
        let found = self.layout.header().byte_order.read_u32(&buf) as u64;
        if found != desc.size {
            return Err(Error::CorruptBlock {
                path: self.path.clone(),
                block: desc.key,
                marker,
                expected: desc.size,
                found,
            });
        }
        Ok(())
    }

    /// Reads the payload bytes of one particle type from a present block,
    /// validating the markers on both sides.
    fn read_type_bytes(&mut self, key: BlockKey, particle_type: ParticleType) -> Result<Vec<u8>> {
        let desc = *self.layout.descriptor(key);
        let slice = self.layout.type_slice(key, particle_type)?;
        trace!(
            "{:?}: {} at {} (+{}, {} bytes)",
            self.path, key, desc.offset, slice.offset, slice.len
        );

        self.reader.seek(SeekFrom::Start(desc.offset))?;
        self.check_marker(&desc, Marker::Leading)?;

        self.reader.seek(SeekFrom::Current(slice.offset as i64))?;
        // sized by what the file holds, not by the header counts
        let mut buf = Vec::new();
        let ctx = ReadContext::new(&self.path, key.as_str());
        (&mut self.reader)
            .take(slice.len)
            .read_to_end(&mut buf)
            .map_err(|e| ctx.io(e))?;
        if buf.len() as u64 != slice.len {
            return Err(ctx.eof());
        }
        self.reader.seek(SeekFrom::Current(slice.remainder as i64))?;

        self.check_marker(&desc, Marker::Trailing)?;
        Ok(buf)
    }

    fn read_ids(&mut self, particle_type: ParticleType) -> Result<Vec<u64>> {
        let bytes = self.read_type_bytes(BlockKey::Id, particle_type)?;
        Ok(decode_ids(bytes, self.order(), self.layout.id_width()))
    }

    fn read_block(&mut self, key: BlockKey, particle_type: ParticleType) -> Result<ParticleBlock> {
        if key == BlockKey::Header {
            return Err(Error::UnknownBlock(
                "header is not a data block; use Snapshot::header".to_string(),
            ));
        }
        if !self.layout.is_declared(key) {
            return Err(Error::BlockAbsent(key));
        }
        if self.layout.rows(key, particle_type) == 0 {
            return Ok(ParticleBlock::empty(key, particle_type));
        }

        if key == BlockKey::Id {
            let ids = self.read_ids(particle_type)?;
            return Ok(ParticleBlock {
                block: key,
                particle_type,
                ids,
                values: Vec::new(),
            });
        }

        let bytes = self.read_type_bytes(key, particle_type)?;
        let values: Vec<f32> = decode_scalars(bytes, self.order());
        let ids = self.read_ids(particle_type)?;
        if values.len() != ids.len() * key.dim() {
            return Err(Error::InvalidFileStructure(format!(
                "{:?}: {} rows of '{}' but {} identifiers",
                self.path,
                values.len() / key.dim(),
                key,
                ids.len()
            )));
        }
        Ok(ParticleBlock {
            block: key,
            particle_type,
            ids,
            values,
        })
    }

    /// Walks every present block and checks both of its markers.
    fn verify(&mut self) -> Result<()> {
        let blocks: Vec<BlockDescriptor> = self
            .layout
            .present()
            .filter(|d| d.key != BlockKey::Header)
            .copied()
            .collect();
        for desc in blocks {
            self.reader.seek(SeekFrom::Start(desc.offset))?;
            self.check_marker(&desc, Marker::Leading)?;
            self.reader.seek(SeekFrom::Current(desc.size as i64))?;
            self.check_marker(&desc, Marker::Trailing)?;
        }
        Ok(())
    }
}

/// Handle on a (possibly multi-fragment) snapshot.
///
/// Holds only the path, options and the header of the first fragment.
/// Every read reopens the fragment and re-parses its header, so a file
/// rewritten between reads is picked up; nothing is cached.
#[derive(Debug, Clone)]
pub struct Snapshot {
    base: PathBuf,
    options: SnapshotOptions,
    header: SnapshotHeader,
    layout: BlockLayout,
}

impl Snapshot {
    /// Opens a snapshot. With `multiple_files`, `path` is the stem and the
    /// header is read from `<path>.0`.
    pub fn open(path: impl AsRef<Path>, options: SnapshotOptions) -> Result<Self> {
        let base = path.as_ref().to_path_buf();
        let first = if options.multiple_files {
            fragment_path(&base, 0)
        } else {
            base.clone()
        };
        let header = read_header(&first)?;
        if options.multiple_files && header.num_files <= 0 {
            warn!(
                "{:?} declares {} fragments, reading it as one",
                first, header.num_files
            );
        }
        let layout = BlockLayout::new(&header, &options);
        let snapshot = Self {
            base,
            options,
            header,
            layout,
        };
        debug!(
            "opened {:?}: {:?}-endian, {} fragment(s), counts {:?}",
            first,
            snapshot.header.byte_order,
            snapshot.fragment_count(),
            snapshot.header.counts
        );

        if !snapshot.options.skip_file_check {
            snapshot.verify_structure(0)?;
        }
        Ok(snapshot)
    }

    /// Header of the first fragment as read at open.
    pub fn header(&self) -> &SnapshotHeader {
        &self.header
    }

    /// Layout of the first fragment as read at open.
    pub fn layout(&self) -> &BlockLayout {
        &self.layout
    }

    pub fn options(&self) -> &SnapshotOptions {
        &self.options
    }

    pub fn fragment_count(&self) -> usize {
        if self.options.multiple_files {
            self.header.fragment_count()
        } else {
            1
        }
    }

    pub fn fragment_path(&self, index: usize) -> Result<PathBuf> {
        let len = self.fragment_count();
        if index >= len {
            return Err(Error::IndexOutOfRange {
                what: "fragment",
                index,
                len,
            });
        }
        if self.options.multiple_files {
            Ok(fragment_path(&self.base, index))
        } else {
            Ok(self.base.clone())
        }
    }

    /// Whether a block is present in the first fragment.
    pub fn is_present(&self, key: BlockKey) -> bool {
        self.layout.is_present(key)
    }

    /// Rows the first fragment holds for a block and type. Zero when the
    /// block is absent or the type lies outside its domain.
    pub fn rows(&self, key: BlockKey, particle_type: ParticleType) -> u64 {
        self.layout.rows(key, particle_type)
    }

    /// Reads one block for one particle type from the first (or only) fragment.
    ///
    /// Rows come back in file order, indexed by particle identifier. The
    /// identifier block returns the identifiers themselves.
    pub fn read(&self, key: BlockKey, particle_type: ParticleType) -> Result<ParticleBlock> {
        self.read_fragment(0, key, particle_type)
    }

    /// Reads one block for one particle type from one fragment.
    pub fn read_fragment(
        &self,
        index: usize,
        key: BlockKey,
        particle_type: ParticleType,
    ) -> Result<ParticleBlock> {
        let path = self.fragment_path(index)?;
        let mut fragment = Fragment::open(path, &self.options)?;
        fragment.read_block(key, particle_type)
    }

    /// Lazily reads a block from every fragment in order, one at a time.
    pub fn read_fragments(&self, key: BlockKey, particle_type: ParticleType) -> FragmentBlocks<'_> {
        FragmentBlocks {
            snapshot: self,
            key,
            particle_type,
            next: 0,
            len: self.fragment_count(),
        }
    }

    /// Reads a block from every fragment and concatenates the rows in
    /// fragment order.
    pub fn read_spanning(&self, key: BlockKey, particle_type: ParticleType) -> Result<ParticleBlock> {
        let mut out = ParticleBlock::empty(key, particle_type);
        for block in self.read_fragments(key, particle_type) {
            out.extend(block?)?;
        }
        Ok(out)
    }

    /// Reads a block from the whole snapshot: the single file as is, or
    /// every fragment concatenated.
    pub fn read_all(&self, key: BlockKey, particle_type: ParticleType) -> Result<ParticleBlock> {
        if self.fragment_count() > 1 {
            self.read_spanning(key, particle_type)
        } else {
            self.read(key, particle_type)
        }
    }

    /// Reads a block from every fragment and keeps the rows whose
    /// identifier is in `ids`, in the order of `ids`.
    pub fn filter_by_ids(
        &self,
        key: BlockKey,
        particle_type: ParticleType,
        ids: &[u64],
    ) -> Result<ParticleBlock> {
        let block = self.read_all(key, particle_type)?;
        let (rows, _) = filter_by_ids(&block, ids, None)?;
        Ok(rows)
    }

    /// Checks the leading and trailing marker of every present block of a
    /// fragment against the layout its header implies.
    pub fn verify_structure(&self, index: usize) -> Result<()> {
        let path = self.fragment_path(index)?;
        let mut fragment = Fragment::open(path, &self.options)?;
        fragment.verify()
    }
}

/// Iterator over one block read fragment by fragment.
pub struct FragmentBlocks<'a> {
    snapshot: &'a Snapshot,
    key: BlockKey,
    particle_type: ParticleType,
    next: usize,
    len: usize,
}

impl Iterator for FragmentBlocks<'_> {
    type Item = Result<ParticleBlock>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.len {
            return None;
        }
        let index = self.next;
        self.next += 1;
        trace!("reading {}/{} from fragment {}", self.key, self.particle_type, index);
        Some(
            self.snapshot
                .read_fragment(index, self.key, self.particle_type),
        )
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.len - self.next;
        (n, Some(n))
    }
}

impl ExactSizeIterator for FragmentBlocks<'_> {}
