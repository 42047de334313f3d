//! FOF group catalogue reader.
//!
//! A catalogue numbered `NNN` under a base directory is split over tasks:
//!
//! - `groups_NNN/group_tab_NNN.<task>`: task header, then per-group
//!   length, offset, per-type length, per-type mass, centre of mass and
//!   star formation rate arrays.
//! - `groups_NNN/group_ids_NNN.<task>`: a 16-byte header followed by the
//!   identifiers of the task's groups, group after group and, within a
//!   group, type after type.
//!
//! Requires the `fof` feature.

use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::catalog::{IDS_HEADER_SIZE, ParseCursor, TaskHeader, chunked, groups_dir, map_file};
use crate::config::CatalogOptions;
use crate::error::{Error, Result};
use crate::index::{Sorter, filter_by_ids};
use crate::models::{BlockKey, N_TYPES, ParticleBlock, ParticleType};
use crate::reader::Snapshot;
use crate::utils::catalog_file;

/// One friends-of-friends group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupRecord {
    /// Particles in the group.
    pub len: u64,
    /// Offset of the group's first identifier in the global ID stream.
    pub offset: u64,
    pub len_type: [u64; N_TYPES],
    pub mass_type: [f64; N_TYPES],
    /// Centre of mass.
    pub cm: [f32; 3],
    pub sfr: f32,
}

impl GroupRecord {
    pub fn len_of(&self, particle_type: ParticleType) -> u64 {
        self.len_type[particle_type.index()]
    }
}

/// Identifiers of one group's members, split by particle type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupMembers {
    ids: [Vec<u64>; N_TYPES],
}

impl GroupMembers {
    pub fn get(&self, particle_type: ParticleType) -> &[u64] {
        &self.ids[particle_type.index()]
    }

    pub fn len(&self) -> usize {
        self.ids.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Groups of one task file plus its ID stream length.
struct TaskTable {
    header: TaskHeader,
    groups: Vec<GroupRecord>,
}

fn parse_task_table(path: &Path, options: &CatalogOptions) -> Result<TaskTable> {
    let mmap = map_file(path)?;
    let mut cur = ParseCursor::new(&mmap, options.byte_order, path);
    let header = TaskHeader::parse(&mut cur)?;
    let n = header.groups;
    if n == 0 {
        return Ok(TaskTable {
            header,
            groups: Vec::new(),
        });
    }

    let len = cur.read_counts(n, "GroupLen")?;
    let offset = cur.read_counts(n, "GroupOffset")?;
    let len_type = cur.read_counts(n * N_TYPES, "GroupLenType")?;
    let mass_type = cur.read_f64s(n * N_TYPES, "GroupMassType")?;
    let cm = cur.read_f32s(n * 3, "GroupCM")?;
    let sfr = cur.read_f32s(n, "GroupSfr")?;

    let len_type = chunked::<u64, N_TYPES>(&len_type);
    let mass_type = chunked::<f64, N_TYPES>(&mass_type);
    let cm = chunked::<f32, 3>(&cm);

    let groups = (0..n)
        .map(|i| {
            let by_type: u64 = len_type[i].iter().sum();
            if by_type != len[i] {
                return Err(Error::InvalidFileStructure(format!(
                    "{:?}: group {} has length {} but its type lengths sum to {}",
                    path, i, len[i], by_type
                )));
            }
            Ok(GroupRecord {
                len: len[i],
                offset: offset[i],
                len_type: len_type[i],
                mass_type: mass_type[i],
                cm: cm[i],
                sfr: sfr[i],
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(TaskTable { header, groups })
}

/// Cuts a task's ID stream into per-group, per-type runs.
///
/// The running start position is threaded through the fold, so each run
/// begins exactly where the previous one ended; the runs must use up the
/// stream.
fn slice_members(stream: &[u64], groups: &[GroupRecord], path: &Path) -> Result<Vec<GroupMembers>> {
    let (members, end) = groups.iter().try_fold(
        (Vec::with_capacity(groups.len()), 0usize),
        |(mut acc, start), group| {
            let mut members = GroupMembers::default();
            let mut cursor = start;
            for t in ParticleType::ALL {
                let n = group.len_of(t) as usize;
                let run = stream.get(cursor..cursor + n).ok_or_else(|| {
                    Error::InvalidFileStructure(format!(
                        "{:?}: group lengths run past {} identifiers",
                        path,
                        stream.len()
                    ))
                })?;
                members.ids[t.index()] = run.to_vec();
                cursor += n;
            }
            acc.push(members);
            Ok::<_, Error>((acc, cursor))
        },
    )?;

    if end != stream.len() {
        return Err(Error::InvalidFileStructure(format!(
            "{:?}: groups cover {} of {} identifiers",
            path,
            end,
            stream.len()
        )));
    }
    Ok(members)
}

fn parse_task_ids(path: &Path, nids: usize, options: &CatalogOptions) -> Result<Vec<u64>> {
    let mmap = map_file(path)?;
    let mut cur = ParseCursor::new(&mmap, options.byte_order, path);
    cur.seek(IDS_HEADER_SIZE, "group_ids header")?;
    cur.read_ids(nids, options.fof_id_width, "group ids")
}

/// A FOF catalogue held fully in memory.
#[derive(Debug, Clone)]
pub struct FofCatalog {
    dir: PathBuf,
    num: u32,
    total_groups: usize,
    groups_per_task: Vec<usize>,
    ids_per_task: Vec<usize>,
    groups: Vec<GroupRecord>,
    members: Vec<GroupMembers>,
}

impl FofCatalog {
    /// Loads catalogue `num` from `<base>/groups_<num>/`.
    pub fn open(base: impl AsRef<Path>, num: u32) -> Result<Self> {
        Self::open_with(base, num, &CatalogOptions::default())
    }

    pub fn open_with(base: impl AsRef<Path>, num: u32, options: &CatalogOptions) -> Result<Self> {
        let dir = groups_dir(base.as_ref(), num);

        let first = parse_task_table(&catalog_file(&dir, "group_tab", num, 0), options)?;
        let ntask = first.header.ntask.max(1);
        let total_groups = first.header.total_groups;

        let mut tables = Vec::new();
        tables.push(first);
        for task in 1..ntask {
            tables.push(parse_task_table(
                &catalog_file(&dir, "group_tab", num, task),
                options,
            )?);
        }

        let mut groups = Vec::new();
        let mut members = Vec::new();
        let mut groups_per_task = Vec::new();
        let mut ids_per_task = Vec::new();
        for (task, table) in tables.into_iter().enumerate() {
            let ids_path = catalog_file(&dir, "group_ids", num, task);
            let stream = parse_task_ids(&ids_path, table.header.ids, options)?;
            members.extend(slice_members(&stream, &table.groups, &ids_path)?);
            groups_per_task.push(table.header.groups);
            ids_per_task.push(table.header.ids);
            groups.extend(table.groups);
        }

        if groups.len() != total_groups {
            return Err(Error::InvalidFileStructure(format!(
                "{:?}: header declares {} groups, tasks hold {}",
                dir,
                total_groups,
                groups.len()
            )));
        }

        debug!(
            "loaded FOF catalogue {:?}: {} groups over {} task(s), {} ids",
            dir,
            groups.len(),
            ntask,
            ids_per_task.iter().sum::<usize>()
        );

        Ok(Self {
            dir,
            num,
            total_groups,
            groups_per_task,
            ids_per_task,
            groups,
            members,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn num(&self) -> u32 {
        self.num
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn total_groups(&self) -> usize {
        self.total_groups
    }

    pub fn ntask(&self) -> usize {
        self.groups_per_task.len()
    }

    pub fn groups_per_task(&self) -> &[usize] {
        &self.groups_per_task
    }

    pub fn ids_per_task(&self) -> &[usize] {
        &self.ids_per_task
    }

    /// All groups in file order across tasks.
    pub fn groups(&self) -> &[GroupRecord] {
        &self.groups
    }

    pub fn group(&self, index: usize) -> Result<&GroupRecord> {
        self.groups.get(index).ok_or(Error::IndexOutOfRange {
            what: "group",
            index,
            len: self.groups.len(),
        })
    }

    pub fn members(&self, index: usize) -> Result<&GroupMembers> {
        self.members.get(index).ok_or(Error::IndexOutOfRange {
            what: "group",
            index,
            len: self.members.len(),
        })
    }

    /// Identifiers of one type in one group.
    pub fn ids(&self, group: usize, particle_type: ParticleType) -> Result<&[u64]> {
        Ok(self.members(group)?.get(particle_type))
    }

    /// Keeps the rows of an already read block that belong to `group`.
    pub fn filter_block(
        &self,
        block: &ParticleBlock,
        group: usize,
        sorter: Option<Sorter>,
    ) -> Result<(ParticleBlock, Sorter)> {
        let ids = self.ids(group, block.particle_type)?;
        filter_by_ids(block, ids, sorter)
    }

    /// Reads a block from the snapshot and keeps the rows of `group`.
    pub fn read_block_by_group(
        &self,
        snapshot: &Snapshot,
        key: BlockKey,
        particle_type: ParticleType,
        group: usize,
    ) -> Result<ParticleBlock> {
        let ids = self.ids(group, particle_type)?;
        snapshot.filter_by_ids(key, particle_type, ids)
    }
}
