use std::io::Write;
use std::path::{Path, PathBuf};

use gadgetio::{BlockKey, ByteOrder, IdWidth, N_TYPES, ParticleBlock, ParticleType};
use tempfile::NamedTempFile;

use super::put::{put_f32, put_f64, put_i32, put_u32, put_u64};

/// Writes GADGET snapshot fragments with predictable contents.
///
/// Particle `k` of type `t` has global index `g = start(t) + k`, where
/// `start` counts the particles of the preceding types. Its identifier is
/// `first_id + start(t) + (count(t) - 1 - k)`, so identifiers run backwards
/// inside each type. Value column `c` of block `key` is `value(key, g, c)`.
#[derive(Debug, Clone)]
pub struct SnapshotBuilder {
    pub counts: [u32; N_TYPES],
    pub masses: [f64; N_TYPES],
    pub time: f64,
    pub redshift: f64,
    pub flag_sfr: bool,
    pub flag_feedback: bool,
    pub flag_cooling: bool,
    pub flag_stellar_age: bool,
    pub flag_metals: bool,
    pub num_files: i32,
    pub box_size: f64,
    pub order: ByteOrder,
    pub id_width: IdWidth,
    pub potential: bool,
    pub acceleration: bool,
    pub entropy_rate: bool,
    pub timestep: bool,
    pub first_id: u64,
}

pub fn value(key: BlockKey, g: u64, c: usize) -> f32 {
    key.index() as f32 * 1000.0 + g as f32 + c as f32 / 16.0
}

impl SnapshotBuilder {
    /// 100 gas, 50 halo and 10 star particles; halo mass constant 0.5;
    /// star formation, cooling, stellar age and metals on.
    pub fn scenario() -> Self {
        Self {
            counts: [100, 50, 0, 0, 10, 0],
            masses: [0.0, 0.5, 0.0, 0.0, 0.0, 0.0],
            time: 0.25,
            redshift: 3.0,
            flag_sfr: true,
            flag_feedback: false,
            flag_cooling: true,
            flag_stellar_age: true,
            flag_metals: true,
            num_files: 1,
            box_size: 20000.0,
            order: ByteOrder::Little,
            id_width: IdWidth::Narrow,
            potential: false,
            acceleration: false,
            entropy_rate: false,
            timestep: false,
            first_id: 1,
        }
    }

    pub fn count(&self, t: ParticleType) -> u64 {
        self.counts[t.index()] as u64
    }

    pub fn start(&self, t: ParticleType) -> u64 {
        ParticleType::ALL
            .iter()
            .take_while(|&&other| other != t)
            .map(|&other| self.count(other))
            .sum()
    }

    pub fn particle_id(&self, t: ParticleType, k: u64) -> u64 {
        self.first_id + self.start(t) + (self.count(t) - 1 - k)
    }

    fn declared(&self, key: BlockKey) -> bool {
        match key {
            BlockKey::Header => false,
            BlockKey::Ne | BlockKey::Nh => self.flag_cooling,
            BlockKey::Sfr => self.flag_sfr,
            BlockKey::Age => self.flag_stellar_age,
            BlockKey::Metals => self.flag_metals,
            BlockKey::Esn | BlockKey::EsnCold => self.flag_feedback,
            BlockKey::Pot => self.potential,
            BlockKey::Accel => self.acceleration,
            BlockKey::Endt => self.entropy_rate,
            BlockKey::Tstp => self.timestep,
            _ => true,
        }
    }

    fn holds(&self, key: BlockKey, t: ParticleType) -> bool {
        use ParticleType::*;
        match key {
            BlockKey::Mass => self.count(t) > 0 && self.masses[t.index()] == 0.0,
            BlockKey::U
            | BlockKey::Rho
            | BlockKey::Ne
            | BlockKey::Nh
            | BlockKey::Hsml
            | BlockKey::Sfr
            | BlockKey::Endt => t == Gas,
            BlockKey::Age => t == Stars,
            BlockKey::Metals | BlockKey::Esn | BlockKey::EsnCold => matches!(t, Gas | Stars),
            _ => true,
        }
    }

    fn dim(key: BlockKey) -> usize {
        match key {
            BlockKey::Pos | BlockKey::Vel | BlockKey::Accel => 3,
            BlockKey::Metals => 12,
            _ => 1,
        }
    }

    /// The rows a reader should return for one block and type.
    pub fn expected(&self, key: BlockKey, t: ParticleType) -> ParticleBlock {
        let mut block = ParticleBlock::empty(key, t);
        if !self.declared(key) || !self.holds(key, t) {
            return block;
        }
        let start = self.start(t);
        for k in 0..self.count(t) {
            block.ids.push(self.particle_id(t, k));
            if key != BlockKey::Id {
                for c in 0..Self::dim(key) {
                    block.values.push(value(key, start + k, c));
                }
            }
        }
        block
    }

    fn header_record(&self) -> Vec<u8> {
        let o = self.order;
        let mut rec = Vec::with_capacity(256);
        self.counts.iter().for_each(|&v| put_u32(&mut rec, v, o));
        self.masses.iter().for_each(|&v| put_f64(&mut rec, v, o));
        put_f64(&mut rec, self.time, o);
        put_f64(&mut rec, self.redshift, o);
        put_i32(&mut rec, self.flag_sfr as i32, o);
        put_i32(&mut rec, self.flag_feedback as i32, o);
        self.counts.iter().for_each(|&v| put_u32(&mut rec, v, o));
        put_i32(&mut rec, self.flag_cooling as i32, o);
        put_i32(&mut rec, self.num_files, o);
        for v in [self.box_size, 0.3, 0.7, 0.7] {
            put_f64(&mut rec, v, o);
        }
        put_i32(&mut rec, self.flag_stellar_age as i32, o);
        put_i32(&mut rec, self.flag_metals as i32, o);
        (0..N_TYPES).for_each(|_| put_u32(&mut rec, 0, o));
        put_i32(&mut rec, 0, o);
        rec.resize(256, 0);
        rec
    }

    fn record(buf: &mut Vec<u8>, payload: &[u8], order: ByteOrder) {
        put_u32(buf, payload.len() as u32, order);
        buf.extend_from_slice(payload);
        put_u32(buf, payload.len() as u32, order);
    }

    pub fn bytes(&self) -> Vec<u8> {
        let o = self.order;
        let mut buf = Vec::new();
        Self::record(&mut buf, &self.header_record(), o);

        for key in BlockKey::ALL.into_iter().skip(1) {
            if !self.declared(key) {
                continue;
            }
            let mut payload = Vec::new();
            for t in ParticleType::ALL {
                if !self.holds(key, t) {
                    continue;
                }
                let start = self.start(t);
                for k in 0..self.count(t) {
                    if key == BlockKey::Id {
                        let id = self.particle_id(t, k);
                        match self.id_width {
                            IdWidth::Narrow => put_u32(&mut payload, id as u32, o),
                            IdWidth::Wide => put_u64(&mut payload, id, o),
                        }
                    } else {
                        for c in 0..Self::dim(key) {
                            put_f32(&mut payload, value(key, start + k, c), o);
                        }
                    }
                }
            }
            if !payload.is_empty() {
                Self::record(&mut buf, &payload, o);
            }
        }
        buf
    }

    pub fn write_to(&self, path: &Path) {
        std::fs::write(path, self.bytes()).unwrap();
    }

    pub fn build(&self) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&self.bytes()).unwrap();
        file.flush().unwrap();
        file
    }
}

/// Writes `<dir>/<stem>.<i>` for each builder, with `num_files` set to
/// the number of fragments. Returns the stem path.
pub fn write_fragments(dir: &Path, stem: &str, fragments: &[SnapshotBuilder]) -> PathBuf {
    for (i, frag) in fragments.iter().enumerate() {
        let mut frag = frag.clone();
        frag.num_files = fragments.len() as i32;
        frag.write_to(&dir.join(format!("{}.{}", stem, i)));
    }
    dir.join(stem)
}
