//! Block layout of a snapshot fragment.
//!
//! Blocks are not self-describing: which ones exist, how large they are
//! and which particle types they hold all follow from the header flags,
//! the per-type counts and mass constants, and the reader options. The
//! layout is evaluated once per header into a table of descriptors.

use log::trace;

use crate::config::SnapshotOptions;
use crate::error::{Error, Result};
use crate::models::{
    BlockDescriptor, BlockKey, Domain, FLOAT_WIDTH, HEADER_SIZE, IdWidth, MARKER_SIZE,
    ParticleType, SnapshotHeader,
};

/// Byte range of one particle type inside a block payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeSlice {
    /// Bytes of preceding types to skip from the payload start.
    pub offset: u64,
    /// Bytes belonging to the requested type.
    pub len: u64,
    /// Bytes of following types up to the payload end.
    pub remainder: u64,
    pub rows: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlockLayout {
    header: SnapshotHeader,
    id_width: IdWidth,
    blocks: Vec<BlockDescriptor>,
}

/// Whether the header and options switch a block on. Absence can still
/// follow from an empty domain.
fn is_declared(key: BlockKey, header: &SnapshotHeader, options: &SnapshotOptions) -> bool {
    match key {
        BlockKey::Ne | BlockKey::Nh => header.flag_cooling,
        BlockKey::Sfr => header.flag_sfr,
        BlockKey::Age => header.flag_stellar_age,
        BlockKey::Metals => header.flag_metals,
        BlockKey::Esn | BlockKey::EsnCold => header.flag_feedback,
        other => options.declares(other),
    }
}

/// Particles of all types in `domain`.
fn domain_rows(domain: Domain, header: &SnapshotHeader) -> u64 {
    ParticleType::ALL
        .iter()
        .filter(|&&t| domain.contains(t, header))
        .map(|&t| header.count(t))
        .sum()
}

impl BlockLayout {
    pub fn new(header: &SnapshotHeader, options: &SnapshotOptions) -> Self {
        let mut blocks = Vec::with_capacity(BlockKey::ALL.len());
        let mut offset = 0u64;

        for key in BlockKey::ALL {
            let domain = key.domain();
            let element_width = match key {
                BlockKey::Header => 1,
                BlockKey::Id => options.id_width.bytes(),
                _ => FLOAT_WIDTH,
            };
            let declared = key == BlockKey::Header || is_declared(key, header, options);
            let (dim, size) = if key == BlockKey::Header {
                (HEADER_SIZE as usize, HEADER_SIZE as u64)
            } else if declared {
                let dim = key.dim();
                (dim, domain_rows(domain, header) * (element_width * dim) as u64)
            } else {
                (key.dim(), 0)
            };

            blocks.push(BlockDescriptor {
                key,
                declared,
                size,
                offset,
                element_width,
                dim,
                domain,
            });
            if size > 0 {
                offset += size + 2 * MARKER_SIZE;
            }
        }

        Self {
            header: header.clone(),
            id_width: options.id_width,
            blocks,
        }
    }

    pub fn header(&self) -> &SnapshotHeader {
        &self.header
    }

    pub fn id_width(&self) -> IdWidth {
        self.id_width
    }

    pub fn descriptor(&self, key: BlockKey) -> &BlockDescriptor {
        &self.blocks[key.index()]
    }

    /// Payload size of a block; zero when absent.
    pub fn size(&self, key: BlockKey) -> u64 {
        self.descriptor(key).size
    }

    pub fn is_present(&self, key: BlockKey) -> bool {
        self.descriptor(key).is_present()
    }

    pub fn is_declared(&self, key: BlockKey) -> bool {
        self.descriptor(key).declared
    }

    /// Present blocks in file order.
    pub fn present(&self) -> impl Iterator<Item = &BlockDescriptor> {
        self.blocks.iter().filter(|b| b.is_present())
    }

    /// Expected length of the fragment file.
    pub fn file_len(&self) -> u64 {
        self.present().map(|b| b.size + 2 * MARKER_SIZE).sum()
    }

    /// Rows a block holds for one particle type; zero when the block is
    /// absent or the type is outside its domain.
    pub fn rows(&self, key: BlockKey, particle_type: ParticleType) -> u64 {
        let desc = self.descriptor(key);
        if desc.is_present() && desc.domain.contains(particle_type, &self.header) {
            self.header.count(particle_type)
        } else {
            0
        }
    }

    /// Locates one particle type inside a present block.
    pub fn type_slice(&self, key: BlockKey, particle_type: ParticleType) -> Result<TypeSlice> {
        let desc = self.descriptor(key);
        if !desc.is_present() || desc.domain == Domain::Header {
            return Err(Error::BlockAbsent(key));
        }

        let row_bytes = desc.row_bytes();
        let mut before = 0u64;
        let mut after = 0u64;
        for t in ParticleType::ALL {
            if !desc.domain.contains(t, &self.header) {
                continue;
            }
            if t < particle_type {
                before += self.header.count(t);
            } else if t > particle_type {
                after += self.header.count(t);
            }
        }
        let rows = self.rows(key, particle_type);

        let slice = TypeSlice {
            offset: before * row_bytes,
            len: rows * row_bytes,
            remainder: after * row_bytes,
            rows,
        };
        trace!("{}/{}: {:?}", key, particle_type, slice);
        debug_assert_eq!(slice.offset + slice.len + slice.remainder, desc.size);
        Ok(slice)
    }
}
