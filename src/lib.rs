//! Random-access reader for GADGET binary snapshots and the FOF / Subfind
//! catalogues written alongside them.
//!
//! ```no_run
//! use gadgetio::{BlockKey, ParticleType, Snapshot, SnapshotOptions};
//!
//! let snap = Snapshot::open("snap_000", SnapshotOptions::default())?;
//! let pos = snap.read(BlockKey::Pos, ParticleType::Stars)?;
//! println!("{} stars, first at {:?}", pos.len(), pos.row(0));
//! # Ok::<(), gadgetio::Error>(())
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod geometry;
pub mod header;
pub mod index;
pub mod layout;
pub mod models;
pub mod reader;
pub mod utils;

#[cfg(feature = "fof")]
pub mod fof_reader;
#[cfg(feature = "subfind")]
pub mod subfind_reader;

pub use catalog::TaskHeader;
pub use config::{CatalogOptions, SnapshotOptions};
pub use error::{Error, Marker, Result};
pub use geometry::{BoundingBox, bounding_box, region};
pub use header::{parse_header, read_header};
pub use index::{Sorter, filter_by_ids};
pub use layout::{BlockLayout, TypeSlice};
pub use models::{
    BlockDescriptor, BlockKey, ByteOrder, Domain, ELEMENT_NAMES, IdWidth, N_TYPES, ParticleBlock,
    ParticleType, SnapshotHeader,
};
pub use reader::{FragmentBlocks, Snapshot};

#[cfg(feature = "fof")]
pub use fof_reader::{FofCatalog, GroupMembers, GroupRecord};
#[cfg(feature = "subfind")]
pub use subfind_reader::{HaloRecord, SubfindCatalog, SubhaloRecord};
