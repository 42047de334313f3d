//! Subfind subhalo catalogue reader.
//!
//! Catalogue `NNN` lives under `postproc_NNN/` as `sub_tab_NNN.<task>`
//! and `sub_ids_NNN.<task>`. Each table file holds a task header with the
//! subhalo count appended, then per-halo and per-subhalo arrays. The ID
//! files hold 8-byte identifiers after a 16-byte header; subhalo offsets
//! index the concatenation of all tasks' streams.
//!
//! Requires the `subfind` feature.

use std::ops::Range;
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::catalog::{
    IDS_HEADER_SIZE, ParseCursor, TaskHeader, chunked, map_file, postproc_dir,
};
use crate::config::CatalogOptions;
use crate::error::{Error, Result};
use crate::index::{Sorter, filter_by_ids};
use crate::models::{BlockKey, IdWidth, ParticleBlock, ParticleType};
use crate::reader::Snapshot;
use crate::utils::catalog_file;

/// Per-halo fields of the Subfind table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HaloRecord {
    /// Subhalos in this halo.
    pub nsub: u64,
    /// Index of the halo's first subhalo.
    pub first_sub: u64,
    pub m_mean200: f32,
    pub r_mean200: f32,
    pub m_crit200: f32,
    pub r_crit200: f32,
    pub m_tophat200: f32,
    pub r_tophat200: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubhaloRecord {
    pub len: u64,
    /// Offset of the first identifier in the concatenated ID stream.
    pub offset: u64,
    pub parent: u64,
    pub pos: [f32; 3],
    pub vel: [f32; 3],
    pub vel_disp: f32,
    pub vmax: f32,
    pub spin: [f32; 3],
    pub most_bound_id: u64,
    pub half_mass: f32,
}

impl SubhaloRecord {
    fn id_range(&self) -> Range<usize> {
        self.offset as usize..(self.offset + self.len) as usize
    }
}

struct TaskTable {
    header: TaskHeader,
    halos: Vec<HaloRecord>,
    subhalos: Vec<SubhaloRecord>,
}

fn parse_task_table(path: &Path, options: &CatalogOptions) -> Result<TaskTable> {
    let mmap = map_file(path)?;
    let mut cur = ParseCursor::new(&mmap, options.byte_order, path);
    let header = TaskHeader::parse(&mut cur)?;
    let nsubhalos = cur.read_count("subhalo count")?;
    let ng = header.groups;
    let ns = nsubhalos;

    let nsub = cur.read_counts(ng, "Nsubperhalo")?;
    let first_sub = cur.read_counts(ng, "FirstSubOfHalo")?;
    let len = cur.read_counts(ns, "SubLen")?;
    let offset = cur.read_counts(ns, "SubOffset")?;
    let parent = cur.read_counts(ns, "SubParentHalo")?;
    let m_mean200 = cur.read_f32s(ng, "Halo_M_Mean200")?;
    let r_mean200 = cur.read_f32s(ng, "Halo_R_Mean200")?;
    let m_crit200 = cur.read_f32s(ng, "Halo_M_Crit200")?;
    let r_crit200 = cur.read_f32s(ng, "Halo_R_Crit200")?;
    let m_tophat200 = cur.read_f32s(ng, "Halo_M_TopHat200")?;
    let r_tophat200 = cur.read_f32s(ng, "Halo_R_TopHat200")?;
    let pos = chunked::<f32, 3>(&cur.read_f32s(ns * 3, "SubPos")?);
    let vel = chunked::<f32, 3>(&cur.read_f32s(ns * 3, "SubVel")?);
    let vel_disp = cur.read_f32s(ns, "SubVelDisp")?;
    let vmax = cur.read_f32s(ns, "SubVmax")?;
    let spin = chunked::<f32, 3>(&cur.read_f32s(ns * 3, "SubSpin")?);
    let most_bound_id = cur.read_ids(ns, IdWidth::Wide, "SubMostBoundID")?;
    let half_mass = cur.read_f32s(ns, "SubHalfMass")?;

    let halos = (0..ng)
        .map(|i| HaloRecord {
            nsub: nsub[i],
            first_sub: first_sub[i],
            m_mean200: m_mean200[i],
            r_mean200: r_mean200[i],
            m_crit200: m_crit200[i],
            r_crit200: r_crit200[i],
            m_tophat200: m_tophat200[i],
            r_tophat200: r_tophat200[i],
        })
        .collect();
    let subhalos = (0..ns)
        .map(|i| SubhaloRecord {
            len: len[i],
            offset: offset[i],
            parent: parent[i],
            pos: pos[i],
            vel: vel[i],
            vel_disp: vel_disp[i],
            vmax: vmax[i],
            spin: spin[i],
            most_bound_id: most_bound_id[i],
            half_mass: half_mass[i],
        })
        .collect();

    Ok(TaskTable {
        header,
        halos,
        subhalos,
    })
}

fn parse_task_ids(path: &Path, nids: usize, options: &CatalogOptions) -> Result<Vec<u64>> {
    let mmap = map_file(path)?;
    let mut cur = ParseCursor::new(&mmap, options.byte_order, path);
    cur.seek(IDS_HEADER_SIZE, "sub_ids header")?;
    cur.read_ids(nids, IdWidth::Wide, "subhalo ids")
}

/// A Subfind catalogue held fully in memory.
#[derive(Debug, Clone)]
pub struct SubfindCatalog {
    dir: PathBuf,
    num: u32,
    total_groups: usize,
    ntask: usize,
    halos: Vec<HaloRecord>,
    subhalos: Vec<SubhaloRecord>,
    ids: Vec<u64>,
}

impl SubfindCatalog {
    /// Loads catalogue `num` from `<base>/postproc_<num>/`.
    pub fn open(base: impl AsRef<Path>, num: u32) -> Result<Self> {
        Self::open_with(base, num, &CatalogOptions::default())
    }

    pub fn open_with(base: impl AsRef<Path>, num: u32, options: &CatalogOptions) -> Result<Self> {
        let dir = postproc_dir(base.as_ref(), num);

        let first = parse_task_table(&catalog_file(&dir, "sub_tab", num, 0), options)?;
        let ntask = first.header.ntask.max(1);
        let total_groups = first.header.total_groups;

        let mut tables = Vec::new();
        tables.push(first);
        for task in 1..ntask {
            tables.push(parse_task_table(
                &catalog_file(&dir, "sub_tab", num, task),
                options,
            )?);
        }

        let mut halos = Vec::new();
        let mut subhalos = Vec::new();
        let mut ids = Vec::new();
        for (task, table) in tables.into_iter().enumerate() {
            let ids_path = catalog_file(&dir, "sub_ids", num, task);
            ids.extend(parse_task_ids(&ids_path, table.header.ids, options)?);
            halos.extend(table.halos);
            subhalos.extend(table.subhalos);
        }

        if let Some((i, sub)) = subhalos
            .iter()
            .enumerate()
            .find(|(_, s)| s.offset + s.len > ids.len() as u64)
        {
            return Err(Error::InvalidFileStructure(format!(
                "{:?}: subhalo {} spans ids {}..{} of {}",
                dir,
                i,
                sub.offset,
                sub.offset + sub.len,
                ids.len()
            )));
        }

        debug!(
            "loaded Subfind catalogue {:?}: {} halos, {} subhalos over {} task(s), {} ids",
            dir,
            halos.len(),
            subhalos.len(),
            ntask,
            ids.len()
        );

        Ok(Self {
            dir,
            num,
            total_groups,
            ntask,
            halos,
            subhalos,
            ids,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn num(&self) -> u32 {
        self.num
    }

    pub fn total_groups(&self) -> usize {
        self.total_groups
    }

    pub fn ntask(&self) -> usize {
        self.ntask
    }

    pub fn halos(&self) -> &[HaloRecord] {
        &self.halos
    }

    pub fn subhalos(&self) -> &[SubhaloRecord] {
        &self.subhalos
    }

    /// The concatenated ID stream of all tasks.
    pub fn id_stream(&self) -> &[u64] {
        &self.ids
    }

    pub fn subhalo(&self, index: usize) -> Result<&SubhaloRecord> {
        self.subhalos.get(index).ok_or(Error::IndexOutOfRange {
            what: "subhalo",
            index,
            len: self.subhalos.len(),
        })
    }

    pub fn halo(&self, index: usize) -> Result<&HaloRecord> {
        self.halos.get(index).ok_or(Error::IndexOutOfRange {
            what: "halo",
            index,
            len: self.halos.len(),
        })
    }

    /// Identifiers of one subhalo's members, all particle types together.
    pub fn ids(&self, subhalo: usize) -> Result<&[u64]> {
        let range = self.subhalo(subhalo)?.id_range();
        Ok(&self.ids[range])
    }

    /// Indices of the subhalos belonging to a halo.
    pub fn subhalos_of(&self, halo: usize) -> Result<Range<usize>> {
        let h = self.halo(halo)?;
        let start = h.first_sub as usize;
        let end = start + h.nsub as usize;
        if end > self.subhalos.len() {
            return Err(Error::InvalidFileStructure(format!(
                "halo {} lists subhalos {}..{} of {}",
                halo,
                start,
                end,
                self.subhalos.len()
            )));
        }
        Ok(start..end)
    }

    /// Keeps the rows of an already read block that belong to `subhalo`.
    pub fn filter_block(
        &self,
        block: &ParticleBlock,
        subhalo: usize,
        sorter: Option<Sorter>,
    ) -> Result<(ParticleBlock, Sorter)> {
        filter_by_ids(block, self.ids(subhalo)?, sorter)
    }

    /// Reads a block from the snapshot and keeps the rows of `subhalo`.
    ///
    /// A sorter returned by an earlier call on the same block and type can
    /// be passed back in.
    pub fn read_block_by_subhalo(
        &self,
        snapshot: &Snapshot,
        key: BlockKey,
        particle_type: ParticleType,
        subhalo: usize,
        sorter: Option<Sorter>,
    ) -> Result<(ParticleBlock, Sorter)> {
        let ids = self.ids(subhalo)?;
        let block = snapshot.read_all(key, particle_type)?;
        filter_by_ids(&block, ids, sorter)
    }
}
