#![no_main]
use libfuzzer_sys::fuzz_target;
use std::io::Write;

use gadgetio::{BlockKey, ParticleType, Snapshot, SnapshotOptions};

fuzz_target!(|data: &[u8]| {
    let mut file = match tempfile::NamedTempFile::new() {
        Ok(f) => f,
        Err(_) => return,
    };
    if file.write_all(data).is_err() {
        return;
    }

    // Skip the open-time check so reads meet the damage themselves.
    let options = SnapshotOptions::new().with_skip_file_check(true);
    let snap = match Snapshot::open(file.path(), options) {
        Ok(s) => s,
        Err(_) => return,
    };
    let _ = snap.verify_structure(0);
    for key in BlockKey::ALL {
        for t in ParticleType::ALL {
            let _ = snap.read(key, t);
        }
    }
});
