#![no_main]
use libfuzzer_sys::fuzz_target;
use std::io::Cursor;
use std::path::Path;

use gadgetio::{BlockLayout, SnapshotOptions, parse_header};

fuzz_target!(|data: &[u8]| {
    let header = match parse_header(&mut Cursor::new(data), Path::new("fuzz")) {
        Ok(h) => h,
        Err(_) => return,
    };

    // Layout arithmetic must hold for any header, including absurd counts.
    for options in [SnapshotOptions::default(), SnapshotOptions::new().with_wide_ids()] {
        let layout = BlockLayout::new(&header, &options);
        let _ = layout.file_len();
        for desc in layout.present() {
            for t in gadgetio::ParticleType::ALL {
                let _ = layout.type_slice(desc.key, t);
            }
        }
    }
});
