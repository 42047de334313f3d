//! Reader options.
//!
//! Neither the snapshot header nor the catalogue files record everything
//! needed to lay them out: identifier width and a handful of optional
//! blocks depend on how the simulation code was compiled.

use serde::{Deserialize, Serialize};

use crate::models::{BlockKey, ByteOrder, IdWidth};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotOptions {
    /// The path is a stem and fragment `i` lives at `<stem>.<i>`.
    pub multiple_files: bool,
    pub id_width: IdWidth,
    /// Gravitational potential block present.
    pub potential: bool,
    /// Acceleration block present.
    pub acceleration: bool,
    /// Rate of change of entropy block present.
    pub entropy_rate: bool,
    /// Timestep block present.
    pub timestep: bool,
    /// Skip validating every block marker of the first fragment on open.
    pub skip_file_check: bool,
}

impl Default for SnapshotOptions {
    fn default() -> Self {
        Self {
            multiple_files: false,
            id_width: IdWidth::Narrow,
            potential: false,
            acceleration: false,
            entropy_rate: false,
            timestep: false,
            skip_file_check: false,
        }
    }
}

impl SnapshotOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_multiple_files(mut self, yes: bool) -> Self {
        self.multiple_files = yes;
        self
    }

    pub fn with_id_width(mut self, width: IdWidth) -> Self {
        self.id_width = width;
        self
    }

    pub fn with_wide_ids(self) -> Self {
        self.with_id_width(IdWidth::Wide)
    }

    pub fn with_potential(mut self, yes: bool) -> Self {
        self.potential = yes;
        self
    }

    pub fn with_acceleration(mut self, yes: bool) -> Self {
        self.acceleration = yes;
        self
    }

    pub fn with_entropy_rate(mut self, yes: bool) -> Self {
        self.entropy_rate = yes;
        self
    }

    pub fn with_timestep(mut self, yes: bool) -> Self {
        self.timestep = yes;
        self
    }

    pub fn with_skip_file_check(mut self, yes: bool) -> Self {
        self.skip_file_check = yes;
        self
    }

    /// Whether an externally declared block is switched on. Blocks whose
    /// presence the header decides always answer `true`.
    pub fn declares(&self, key: BlockKey) -> bool {
        match key {
            BlockKey::Pot => self.potential,
            BlockKey::Accel => self.acceleration,
            BlockKey::Endt => self.entropy_rate,
            BlockKey::Tstp => self.timestep,
            _ => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogOptions {
    /// Catalogue files carry no sentinel to detect this from.
    pub byte_order: ByteOrder,
    /// Width of identifiers in FOF `group_ids` streams.
    pub fof_id_width: IdWidth,
}

impl Default for CatalogOptions {
    fn default() -> Self {
        Self {
            byte_order: ByteOrder::native(),
            fof_id_width: IdWidth::Narrow,
        }
    }
}

impl CatalogOptions {
    pub fn with_byte_order(mut self, order: ByteOrder) -> Self {
        self.byte_order = order;
        self
    }

    pub fn with_fof_id_width(mut self, width: IdWidth) -> Self {
        self.fof_id_width = width;
        self
    }
}
