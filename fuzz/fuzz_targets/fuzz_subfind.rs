#![no_main]
use libfuzzer_sys::fuzz_target;

use gadgetio::SubfindCatalog;

fuzz_target!(|data: &[u8]| {
    let Some((&split, rest)) = data.split_first() else {
        return;
    };
    let split = (split as usize * rest.len()) / 255;
    let (tab, ids) = rest.split_at(split);

    let Ok(dir) = tempfile::TempDir::new() else {
        return;
    };
    let post = dir.path().join("postproc_000");
    if std::fs::create_dir(&post).is_err()
        || std::fs::write(post.join("sub_tab_000.0"), tab).is_err()
        || std::fs::write(post.join("sub_ids_000.0"), ids).is_err()
    {
        return;
    }

    let cat = match SubfindCatalog::open(dir.path(), 0) {
        Ok(c) => c,
        Err(_) => return,
    };
    for s in 0..cat.subhalos().len() {
        let _ = cat.ids(s);
    }
    for h in 0..cat.halos().len() {
        let _ = cat.subhalos_of(h);
    }
});
