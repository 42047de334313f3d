use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Number of particle types in a snapshot.
pub const N_TYPES: usize = 6;
/// Value of the header record markers.
pub const HEADER_SIZE: u32 = 256;
/// Bytes of the header record that carry declared fields; the rest is padding.
pub const HEADER_USED: usize = 196;
/// Width of one record marker.
pub const MARKER_SIZE: u64 = 4;
/// Width of every floating point block element.
pub const FLOAT_WIDTH: usize = 4;

/// Chemical species tracked in the `metals` block, in column order.
pub const ELEMENT_NAMES: [&str; 12] = [
    "He", "C", "Mg", "O", "Fe", "Si", "H", "N", "Ne", "S", "Ca", "Zi",
];
/// Number of species in the `metals` block.
pub const N_ELEMENTS: usize = ELEMENT_NAMES.len();

const XYZ: &[&str] = &["x", "y", "z"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticleType {
    Gas,
    Halo,
    Disk,
    Bulge,
    Stars,
    #[serde(rename = "bndry")]
    Boundary,
}

impl ParticleType {
    /// All types in on-disk order.
    pub const ALL: [ParticleType; N_TYPES] = [
        ParticleType::Gas,
        ParticleType::Halo,
        ParticleType::Disk,
        ParticleType::Bulge,
        ParticleType::Stars,
        ParticleType::Boundary,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ParticleType::Gas => "gas",
            ParticleType::Halo => "halo",
            ParticleType::Disk => "disk",
            ParticleType::Bulge => "bulge",
            ParticleType::Stars => "stars",
            ParticleType::Boundary => "bndry",
        }
    }
}

impl fmt::Display for ParticleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParticleType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gas" => Ok(ParticleType::Gas),
            "halo" => Ok(ParticleType::Halo),
            "disk" => Ok(ParticleType::Disk),
            "bulge" => Ok(ParticleType::Bulge),
            "stars" => Ok(ParticleType::Stars),
            "bndry" | "boundary" => Ok(ParticleType::Boundary),
            other => Err(Error::UnknownParticleType(other.to_string())),
        }
    }
}

/// The set of particle types a block stores rows for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Domain {
    /// The header record; holds no particles.
    Header,
    All,
    Gas,
    /// Gas followed by stars.
    Baryons,
    Stars,
    /// Types with a non-zero count and a zero mass constant in the header.
    MassTypes,
}

impl Domain {
    pub fn contains(self, particle_type: ParticleType, header: &SnapshotHeader) -> bool {
        match self {
            Domain::Header => false,
            Domain::All => true,
            Domain::Gas => particle_type == ParticleType::Gas,
            Domain::Baryons => {
                matches!(particle_type, ParticleType::Gas | ParticleType::Stars)
            }
            Domain::Stars => particle_type == ParticleType::Stars,
            Domain::MassTypes => header.has_mass_block(particle_type),
        }
    }
}

/// Snapshot blocks in their fixed on-disk order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKey {
    Header,
    Pos,
    Vel,
    Id,
    Mass,
    U,
    Rho,
    Ne,
    Nh,
    Hsml,
    Sfr,
    Age,
    Metals,
    Pot,
    Accel,
    Endt,
    Tstp,
    Esn,
    EsnCold,
}

impl BlockKey {
    pub const ALL: [BlockKey; 19] = [
        BlockKey::Header,
        BlockKey::Pos,
        BlockKey::Vel,
        BlockKey::Id,
        BlockKey::Mass,
        BlockKey::U,
        BlockKey::Rho,
        BlockKey::Ne,
        BlockKey::Nh,
        BlockKey::Hsml,
        BlockKey::Sfr,
        BlockKey::Age,
        BlockKey::Metals,
        BlockKey::Pot,
        BlockKey::Accel,
        BlockKey::Endt,
        BlockKey::Tstp,
        BlockKey::Esn,
        BlockKey::EsnCold,
    ];

    /// Position in the fixed block order.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BlockKey::Header => "header",
            BlockKey::Pos => "pos",
            BlockKey::Vel => "vel",
            BlockKey::Id => "id",
            BlockKey::Mass => "mass",
            BlockKey::U => "u",
            BlockKey::Rho => "rho",
            BlockKey::Ne => "ne",
            BlockKey::Nh => "nh",
            BlockKey::Hsml => "hsml",
            BlockKey::Sfr => "sfr",
            BlockKey::Age => "age",
            BlockKey::Metals => "metals",
            BlockKey::Pot => "pot",
            BlockKey::Accel => "accel",
            BlockKey::Endt => "endt",
            BlockKey::Tstp => "tstp",
            BlockKey::Esn => "esn",
            BlockKey::EsnCold => "esncold",
        }
    }

    pub fn domain(self) -> Domain {
        match self {
            BlockKey::Header => Domain::Header,
            BlockKey::Pos
            | BlockKey::Vel
            | BlockKey::Id
            | BlockKey::Pot
            | BlockKey::Accel
            | BlockKey::Tstp => Domain::All,
            BlockKey::Mass => Domain::MassTypes,
            BlockKey::U
            | BlockKey::Rho
            | BlockKey::Ne
            | BlockKey::Nh
            | BlockKey::Hsml
            | BlockKey::Sfr
            | BlockKey::Endt => Domain::Gas,
            BlockKey::Age => Domain::Stars,
            BlockKey::Metals | BlockKey::Esn | BlockKey::EsnCold => Domain::Baryons,
        }
    }

    /// Names of the value columns a decoded block carries.
    ///
    /// The identifier block has none: its values are the row index itself.
    pub fn columns(self) -> &'static [&'static str] {
        match self {
            BlockKey::Header | BlockKey::Id => &[],
            BlockKey::Pos | BlockKey::Vel | BlockKey::Accel => XYZ,
            BlockKey::Metals => &ELEMENT_NAMES,
            BlockKey::Mass => &["mass"],
            BlockKey::U => &["u"],
            BlockKey::Rho => &["rho"],
            BlockKey::Ne => &["ne"],
            BlockKey::Nh => &["nh"],
            BlockKey::Hsml => &["hsml"],
            BlockKey::Sfr => &["sfr"],
            BlockKey::Age => &["age"],
            BlockKey::Pot => &["pot"],
            BlockKey::Endt => &["endt"],
            BlockKey::Tstp => &["tstp"],
            BlockKey::Esn => &["esn"],
            BlockKey::EsnCold => &["esncold"],
        }
    }

    /// Scalars stored per particle.
    pub fn dim(self) -> usize {
        match self {
            BlockKey::Id => 1,
            other => other.columns().len(),
        }
    }
}

impl fmt::Display for BlockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlockKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BlockKey::ALL
            .iter()
            .copied()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| Error::UnknownBlock(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ByteOrder {
    Little,
    Big,
}

impl ByteOrder {
    pub const fn native() -> Self {
        if cfg!(target_endian = "little") {
            ByteOrder::Little
        } else {
            ByteOrder::Big
        }
    }

    pub fn swapped(self) -> Self {
        match self {
            ByteOrder::Little => ByteOrder::Big,
            ByteOrder::Big => ByteOrder::Little,
        }
    }

    pub fn is_native(self) -> bool {
        self == Self::native()
    }
}

impl Default for ByteOrder {
    fn default() -> Self {
        Self::native()
    }
}

/// Width of particle identifiers on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdWidth {
    #[default]
    Narrow,
    Wide,
}

impl IdWidth {
    pub fn bytes(self) -> usize {
        match self {
            IdWidth::Narrow => 4,
            IdWidth::Wide => 8,
        }
    }
}

/// Fields of the 256-byte snapshot header, in on-disk order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotHeader {
    /// Particles of each type in this fragment.
    pub counts: [u32; N_TYPES],
    /// Mass constant per type; zero means masses are stored in the `mass` block.
    pub masses: [f64; N_TYPES],
    /// Time of output, or expansion factor for cosmological runs.
    pub time: f64,
    pub redshift: f64,
    pub flag_sfr: bool,
    pub flag_feedback: bool,
    /// Low words of the total particle counts over all fragments.
    pub total_counts_low: [u32; N_TYPES],
    pub flag_cooling: bool,
    pub num_files: i32,
    pub box_size: f64,
    pub omega_matter: f64,
    pub omega_lambda: f64,
    pub hubble_param: f64,
    pub flag_stellar_age: bool,
    pub flag_metals: bool,
    /// High words of the total particle counts, non-zero beyond 2^32 particles.
    pub total_counts_high: [u32; N_TYPES],
    pub flag_entropy_ics: bool,
    /// Byte order detected from the leading header marker.
    pub byte_order: ByteOrder,
}

impl SnapshotHeader {
    pub fn count(&self, particle_type: ParticleType) -> u64 {
        self.counts[particle_type.index()] as u64
    }

    /// Particles of all types in this fragment.
    pub fn local_total(&self) -> u64 {
        self.counts.iter().map(|&n| n as u64).sum()
    }

    /// Total particles of one type over all fragments.
    pub fn total_count(&self, particle_type: ParticleType) -> u64 {
        let i = particle_type.index();
        ((self.total_counts_high[i] as u64) << 32) | self.total_counts_low[i] as u64
    }

    pub fn mass(&self, particle_type: ParticleType) -> f64 {
        self.masses[particle_type.index()]
    }

    /// Whether particles of this type have individual entries in the `mass` block.
    pub fn has_mass_block(&self, particle_type: ParticleType) -> bool {
        self.count(particle_type) != 0 && self.mass(particle_type) == 0.0
    }

    /// Number of fragment files; a non-positive value is read as one.
    pub fn fragment_count(&self) -> usize {
        self.num_files.max(1) as usize
    }
}

/// Location and shape of one block within a fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockDescriptor {
    pub key: BlockKey,
    /// Switched on by the header flags or reader options. A declared block
    /// can still be absent when none of its particle types has particles.
    pub declared: bool,
    /// Payload size in bytes; zero when the block is absent.
    pub size: u64,
    /// File offset of the leading record marker. Meaningful only when present.
    pub offset: u64,
    /// Bytes per scalar.
    pub element_width: usize,
    pub dim: usize,
    pub domain: Domain,
}

impl BlockDescriptor {
    pub fn is_present(&self) -> bool {
        self.size > 0
    }

    /// Bytes per particle row.
    pub fn row_bytes(&self) -> u64 {
        (self.element_width * self.dim) as u64
    }

    /// File offset of the first payload byte.
    pub fn payload_offset(&self) -> u64 {
        self.offset + MARKER_SIZE
    }
}

/// Rows of one block for one particle type.
///
/// `ids` is the row index: the identifier of the particle each row belongs
/// to. `values` holds `width()` floats per row in row-major order and is
/// empty for the identifier block.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleBlock {
    pub block: BlockKey,
    pub particle_type: ParticleType,
    pub ids: Vec<u64>,
    pub values: Vec<f32>,
}

impl ParticleBlock {
    pub fn empty(block: BlockKey, particle_type: ParticleType) -> Self {
        Self {
            block,
            particle_type,
            ids: Vec::new(),
            values: Vec::new(),
        }
    }

    pub fn columns(&self) -> &'static [&'static str] {
        self.block.columns()
    }

    pub fn width(&self) -> usize {
        self.columns().len()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn row(&self, i: usize) -> Option<&[f32]> {
        if i >= self.len() {
            return None;
        }
        let w = self.width();
        Some(&self.values[i * w..(i + 1) * w])
    }

    /// Iterates `(id, row)` pairs in row order.
    pub fn rows(&self) -> impl Iterator<Item = (u64, &[f32])> + '_ {
        let w = self.width();
        self.ids
            .iter()
            .enumerate()
            .map(move |(i, &id)| (id, &self.values[i * w..(i + 1) * w]))
    }

    /// Copies out one named column.
    pub fn column(&self, name: &str) -> Option<Vec<f32>> {
        let c = self.columns().iter().position(|&col| col == name)?;
        let w = self.width();
        Some(self.values.iter().skip(c).step_by(w).copied().collect())
    }

    /// Gathers the rows at `positions`, in that order.
    pub fn select(&self, positions: &[usize]) -> Self {
        let w = self.width();
        let mut ids = Vec::with_capacity(positions.len());
        let mut values = Vec::with_capacity(positions.len() * w);
        for &p in positions {
            ids.push(self.ids[p]);
            values.extend_from_slice(&self.values[p * w..(p + 1) * w]);
        }
        Self {
            block: self.block,
            particle_type: self.particle_type,
            ids,
            values,
        }
    }

    /// Appends the rows of `other`, which must hold the same block and type.
    pub fn extend(&mut self, other: ParticleBlock) -> Result<(), Error> {
        if other.block != self.block || other.particle_type != self.particle_type {
            return Err(Error::InvalidFileStructure(format!(
                "cannot append {}/{} rows to {}/{}",
                other.block, other.particle_type, self.block, self.particle_type
            )));
        }
        self.ids.extend(other.ids);
        self.values.extend(other.values);
        Ok(())
    }
}
