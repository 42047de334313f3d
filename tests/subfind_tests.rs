#![cfg(feature = "subfind")]

use gadgetio::{
    BlockKey, ByteOrder, CatalogOptions, Error, ParticleType, Snapshot, SnapshotOptions,
    SubfindCatalog,
};
use tempfile::TempDir;

mod common;
use common::catalog_builder::{SubfindHalo, SubfindTask, Subhalo, write_subfind};
use common::snapshot_builder::{SnapshotBuilder, write_fragments};

use ParticleType::{Gas, Halo, Stars};

fn tasks(b: &SnapshotBuilder) -> Vec<SubfindTask> {
    let s0 = Subhalo {
        ids: vec![
            b.particle_id(Gas, 4),
            b.particle_id(Halo, 0),
            b.particle_id(Gas, 1),
        ],
        pos: [10.0, 20.0, 30.0],
        vmax: 210.0,
        most_bound_id: b.particle_id(Halo, 0),
        ..Default::default()
    };
    let s1 = Subhalo {
        ids: (20..24).map(|k| b.particle_id(Halo, k)).collect(),
        parent: 0,
        spin: [0.1, 0.2, 0.3],
        ..Default::default()
    };
    let s2 = Subhalo {
        ids: vec![b.particle_id(Stars, 2), b.particle_id(Gas, 60)],
        vel: [-1.0, 0.0, 1.0],
        vel_disp: 55.0,
        half_mass: 4.5,
        most_bound_id: 1 << 35,
        ..Default::default()
    };

    vec![
        SubfindTask {
            halos: vec![SubfindHalo {
                nsub: 2,
                first_sub: 0,
                spherical: [1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            }],
            subhalos: vec![s0, s1],
        },
        SubfindTask {
            halos: vec![SubfindHalo {
                nsub: 1,
                first_sub: 2,
                spherical: [7.0; 6],
            }],
            subhalos: vec![s2],
        },
    ]
}

fn setup(order: ByteOrder) -> (TempDir, SnapshotBuilder) {
    let dir = TempDir::new().unwrap();
    let b = SnapshotBuilder::scenario();
    b.write_to(&dir.path().join("snap_003"));
    write_subfind(dir.path(), 3, &tasks(&b), order);
    (dir, b)
}

#[test]
fn subfind_tables() {
    let (dir, _) = setup(ByteOrder::native());
    let cat = SubfindCatalog::open(dir.path(), 3).unwrap();

    assert_eq!(cat.dir(), dir.path().join("postproc_003"));
    assert_eq!(cat.ntask(), 2);
    assert_eq!(cat.total_groups(), 2);
    assert_eq!(cat.halos().len(), 2);
    assert_eq!(cat.subhalos().len(), 3);
    assert_eq!(cat.id_stream().len(), 9);

    let h0 = cat.halo(0).unwrap();
    assert_eq!((h0.nsub, h0.first_sub), (2, 0));
    assert_eq!(h0.m_mean200, 1.0);
    assert_eq!(h0.r_crit200, 4.0);
    assert_eq!(h0.r_tophat200, 6.0);

    let s0 = cat.subhalo(0).unwrap();
    assert_eq!((s0.len, s0.offset), (3, 0));
    assert_eq!(s0.pos, [10.0, 20.0, 30.0]);
    assert_eq!(s0.vmax, 210.0);

    assert_eq!(cat.subhalo(1).unwrap().spin, [0.1, 0.2, 0.3]);

    let s2 = cat.subhalo(2).unwrap();
    assert_eq!((s2.len, s2.offset), (2, 7));
    assert_eq!(s2.vel, [-1.0, 0.0, 1.0]);
    assert_eq!(s2.vel_disp, 55.0);
    assert_eq!(s2.half_mass, 4.5);
    assert_eq!(s2.most_bound_id, 1 << 35);
}

#[test]
fn subfind_ids_use_absolute_offsets() {
    let (dir, b) = setup(ByteOrder::native());
    let cat = SubfindCatalog::open(dir.path(), 3).unwrap();

    assert_eq!(
        cat.ids(2).unwrap(),
        &[b.particle_id(Stars, 2), b.particle_id(Gas, 60)]
    );
    assert_eq!(cat.ids(1).unwrap().len(), 4);
    assert_eq!(cat.subhalos_of(0).unwrap(), 0..2);
    assert_eq!(cat.subhalos_of(1).unwrap(), 2..3);
    assert!(matches!(
        cat.subhalo(3),
        Err(Error::IndexOutOfRange { what: "subhalo", .. })
    ));
}

#[test]
fn subfind_block_by_subhalo() {
    let (dir, b) = setup(ByteOrder::native());
    let snap = Snapshot::open(dir.path().join("snap_003"), SnapshotOptions::default()).unwrap();
    let cat = SubfindCatalog::open(dir.path(), 3).unwrap();

    let (u, sorter) = cat
        .read_block_by_subhalo(&snap, BlockKey::U, Gas, 0, None)
        .unwrap();
    assert_eq!(u, b.expected(BlockKey::U, Gas).select(&[4, 1]));

    let (u2, _) = cat
        .read_block_by_subhalo(&snap, BlockKey::U, Gas, 2, Some(sorter))
        .unwrap();
    assert_eq!(u2.ids, vec![b.particle_id(Gas, 60)]);

    let (age, _) = cat
        .read_block_by_subhalo(&snap, BlockKey::Age, Stars, 2, None)
        .unwrap();
    assert_eq!(age, b.expected(BlockKey::Age, Stars).select(&[2]));
}

#[test]
fn subfind_block_by_subhalo_spans_fragments() {
    let dir = TempDir::new().unwrap();
    let first = SnapshotBuilder::scenario();
    let mut second = SnapshotBuilder::scenario();
    second.counts = [20, 5, 0, 0, 3, 0];
    second.first_id = 1000;
    let stem = write_fragments(dir.path(), "snap_003", &[first.clone(), second.clone()]);

    let sub = Subhalo {
        ids: vec![first.particle_id(Stars, 1), second.particle_id(Stars, 2)],
        ..Default::default()
    };
    let task = SubfindTask {
        halos: vec![SubfindHalo {
            nsub: 1,
            first_sub: 0,
            spherical: [0.0; 6],
        }],
        subhalos: vec![sub],
    };
    write_subfind(dir.path(), 3, &[task], ByteOrder::native());

    let snap = Snapshot::open(&stem, SnapshotOptions::new().with_multiple_files(true)).unwrap();
    let cat = SubfindCatalog::open(dir.path(), 3).unwrap();

    let (age, _) = cat
        .read_block_by_subhalo(&snap, BlockKey::Age, Stars, 0, None)
        .unwrap();
    let mut expected = first.expected(BlockKey::Age, Stars).select(&[1]);
    expected
        .extend(second.expected(BlockKey::Age, Stars).select(&[2]))
        .unwrap();
    assert_eq!(age, expected);
}

#[test]
fn subfind_swapped_byte_order() {
    let order = ByteOrder::native().swapped();
    let (dir, b) = setup(order);
    let opts = CatalogOptions::default().with_byte_order(order);
    let cat = SubfindCatalog::open_with(dir.path(), 3, &opts).unwrap();
    assert_eq!(cat.subhalo(2).unwrap().most_bound_id, 1 << 35);
    assert_eq!(cat.ids(0).unwrap()[1], b.particle_id(Halo, 0));
}

#[test]
fn subfind_truncated_ids() {
    let (dir, _) = setup(ByteOrder::native());
    let ids = dir.path().join("postproc_003").join("sub_ids_003.0");
    let bytes = std::fs::read(&ids).unwrap();
    std::fs::write(&ids, &bytes[..bytes.len() - 8]).unwrap();
    assert!(matches!(
        SubfindCatalog::open(dir.path(), 3),
        Err(Error::UnexpectedEof { .. })
    ));
}

#[test]
fn subfind_id_runs_are_disjoint() {
    let (dir, _) = setup(ByteOrder::native());
    let cat = SubfindCatalog::open(dir.path(), 3).unwrap();

    let mut runs: Vec<(u64, u64)> = cat.subhalos().iter().map(|s| (s.offset, s.len)).collect();
    runs.sort();
    for pair in runs.windows(2) {
        assert!(pair[0].0 + pair[0].1 <= pair[1].0);
    }
    for (i, s) in cat.subhalos().iter().enumerate() {
        assert_eq!(cat.ids(i).unwrap().len() as u64, s.len);
    }
}
