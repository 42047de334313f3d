#![no_main]
use libfuzzer_sys::fuzz_target;

use gadgetio::{FofCatalog, ParticleType};

// First byte splits the input between the table and the ID stream.
fuzz_target!(|data: &[u8]| {
    let Some((&split, rest)) = data.split_first() else {
        return;
    };
    let split = (split as usize * rest.len()) / 255;
    let (tab, ids) = rest.split_at(split);

    let Ok(dir) = tempfile::TempDir::new() else {
        return;
    };
    let groups = dir.path().join("groups_000");
    if std::fs::create_dir(&groups).is_err()
        || std::fs::write(groups.join("group_tab_000.0"), tab).is_err()
        || std::fs::write(groups.join("group_ids_000.0"), ids).is_err()
    {
        return;
    }

    let cat = match FofCatalog::open(dir.path(), 0) {
        Ok(c) => c,
        Err(_) => return,
    };
    for g in 0..cat.len() {
        for t in ParticleType::ALL {
            let _ = cat.ids(g, t);
        }
    }
});
