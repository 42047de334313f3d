use std::fs;
use std::path::Path;

use gadgetio::{ByteOrder, IdWidth, N_TYPES};

use super::put::{put_f32, put_f64, put_i32, put_u32, put_u64};

/// One FOF group: member identifiers per particle type.
#[derive(Debug, Clone, Default)]
pub struct FofGroup {
    pub ids: [Vec<u64>; N_TYPES],
    pub mass_type: [f64; N_TYPES],
    pub cm: [f32; 3],
    pub sfr: f32,
}

impl FofGroup {
    pub fn with_ids(t: usize, ids: Vec<u64>) -> Self {
        let mut group = Self::default();
        group.ids[t] = ids;
        group
    }

    pub fn len(&self) -> usize {
        self.ids.iter().map(Vec::len).sum()
    }
}

fn task_header(buf: &mut Vec<u8>, groups: usize, ids: usize, total: usize, ntask: usize, o: ByteOrder) {
    for v in [groups, ids, total, ntask] {
        put_i32(buf, v as i32, o);
    }
}

/// Writes `<base>/groups_<num>/group_{tab,ids}_<num>.<task>`, one task
/// per entry of `tasks`.
pub fn write_fof(base: &Path, num: u32, tasks: &[Vec<FofGroup>], order: ByteOrder, width: IdWidth) {
    let dir = base.join(format!("groups_{:03}", num));
    fs::create_dir_all(&dir).unwrap();
    let total: usize = tasks.iter().map(Vec::len).sum();
    let mut offset = 0usize;

    for (task, groups) in tasks.iter().enumerate() {
        let nids: usize = groups.iter().map(FofGroup::len).sum();
        let o = order;

        let mut tab = Vec::new();
        task_header(&mut tab, groups.len(), nids, total, tasks.len(), o);
        for g in groups {
            put_i32(&mut tab, g.len() as i32, o);
        }
        for g in groups {
            put_i32(&mut tab, offset as i32, o);
            offset += g.len();
        }
        for g in groups {
            g.ids.iter().for_each(|v| put_i32(&mut tab, v.len() as i32, o));
        }
        for g in groups {
            g.mass_type.iter().for_each(|&m| put_f64(&mut tab, m, o));
        }
        for g in groups {
            g.cm.iter().for_each(|&c| put_f32(&mut tab, c, o));
        }
        for g in groups {
            put_f32(&mut tab, g.sfr, o);
        }
        fs::write(dir.join(format!("group_tab_{:03}.{}", num, task)), tab).unwrap();

        let mut ids = Vec::new();
        task_header(&mut ids, groups.len(), nids, total, tasks.len(), o);
        for g in groups {
            for id in g.ids.iter().flatten() {
                match width {
                    IdWidth::Narrow => put_u32(&mut ids, *id as u32, o),
                    IdWidth::Wide => put_u64(&mut ids, *id, o),
                }
            }
        }
        fs::write(dir.join(format!("group_ids_{:03}.{}", num, task)), ids).unwrap();
    }
}

#[derive(Debug, Clone, Default)]
pub struct SubfindHalo {
    pub nsub: u32,
    pub first_sub: u32,
    /// M_Mean200, R_Mean200, M_Crit200, R_Crit200, M_TopHat200, R_TopHat200.
    pub spherical: [f32; 6],
}

#[derive(Debug, Clone, Default)]
pub struct Subhalo {
    pub ids: Vec<u64>,
    pub parent: u32,
    pub pos: [f32; 3],
    pub vel: [f32; 3],
    pub vel_disp: f32,
    pub vmax: f32,
    pub spin: [f32; 3],
    pub most_bound_id: u64,
    pub half_mass: f32,
}

#[derive(Debug, Clone, Default)]
pub struct SubfindTask {
    pub halos: Vec<SubfindHalo>,
    pub subhalos: Vec<Subhalo>,
}

/// Writes `<base>/postproc_<num>/sub_{tab,ids}_<num>.<task>`. Subhalo
/// offsets count from the start of the first task's ID stream.
pub fn write_subfind(base: &Path, num: u32, tasks: &[SubfindTask], order: ByteOrder) {
    let dir = base.join(format!("postproc_{:03}", num));
    fs::create_dir_all(&dir).unwrap();
    let total: usize = tasks.iter().map(|t| t.halos.len()).sum();
    let o = order;
    let mut offset = 0usize;

    for (task, t) in tasks.iter().enumerate() {
        let nids: usize = t.subhalos.iter().map(|s| s.ids.len()).sum();
        let mut tab = Vec::new();
        task_header(&mut tab, t.halos.len(), nids, total, tasks.len(), o);
        put_i32(&mut tab, t.subhalos.len() as i32, o);

        t.halos.iter().for_each(|h| put_u32(&mut tab, h.nsub, o));
        t.halos.iter().for_each(|h| put_u32(&mut tab, h.first_sub, o));
        t.subhalos.iter().for_each(|s| put_i32(&mut tab, s.ids.len() as i32, o));
        for s in &t.subhalos {
            put_i32(&mut tab, offset as i32, o);
            offset += s.ids.len();
        }
        t.subhalos.iter().for_each(|s| put_u32(&mut tab, s.parent, o));
        for field in 0..6 {
            t.halos.iter().for_each(|h| put_f32(&mut tab, h.spherical[field], o));
        }
        for s in &t.subhalos {
            s.pos.iter().for_each(|&v| put_f32(&mut tab, v, o));
        }
        for s in &t.subhalos {
            s.vel.iter().for_each(|&v| put_f32(&mut tab, v, o));
        }
        t.subhalos.iter().for_each(|s| put_f32(&mut tab, s.vel_disp, o));
        t.subhalos.iter().for_each(|s| put_f32(&mut tab, s.vmax, o));
        for s in &t.subhalos {
            s.spin.iter().for_each(|&v| put_f32(&mut tab, v, o));
        }
        t.subhalos.iter().for_each(|s| put_u64(&mut tab, s.most_bound_id, o));
        t.subhalos.iter().for_each(|s| put_f32(&mut tab, s.half_mass, o));
        fs::write(dir.join(format!("sub_tab_{:03}.{}", num, task)), tab).unwrap();

        let mut ids = Vec::new();
        task_header(&mut ids, t.halos.len(), nids, total, tasks.len(), o);
        for s in &t.subhalos {
            s.ids.iter().for_each(|&id| put_u64(&mut ids, id, o));
        }
        fs::write(dir.join(format!("sub_ids_{:03}.{}", num, task)), ids).unwrap();
    }
}
