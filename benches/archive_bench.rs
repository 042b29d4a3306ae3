use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::json;
use sigmf_archive::{extract, pack, pack_into, Metadata, Recording};
use std::io::Cursor;
use std::path::Path;

fn sample_recording(dir: &Path, name: &str, len: usize) -> Recording {
    let data_path = dir.join(format!("{name}.bin"));
    std::fs::write(&data_path, vec![42u8; len]).unwrap();

    let metadata = Metadata::from_value(json!({
        "global": { "core:datatype": "cf32_le", "core:version": "1.0.0" },
        "captures": [],
        "annotations": []
    }));
    let mut rec = Recording::new(metadata);
    rec.name = Some(name.to_owned());
    rec.data_file = Some(data_path);
    rec
}

fn bench_pack(c: &mut Criterion) {
    let work = tempfile::tempdir().unwrap();
    let rec = sample_recording(work.path(), "bench", 1024 * 1024);

    c.bench_function("pack_1mb_recording", |b| {
        b.iter(|| {
            let mut sink = Cursor::new(Vec::new());
            pack_into(black_box(std::slice::from_ref(&rec)), &mut sink).unwrap();
            sink
        })
    });
}

fn bench_extract(c: &mut Criterion) {
    let work = tempfile::tempdir().unwrap();
    let rec = sample_recording(work.path(), "bench", 1024 * 1024);
    let archive_path = pack(std::slice::from_ref(&rec), work.path().join("bench")).unwrap();

    c.bench_function("extract_1mb_recording", |b| {
        b.iter(|| {
            let dest = tempfile::tempdir().unwrap();
            extract(black_box(&archive_path), Some(dest.path())).unwrap()
        })
    });
}

criterion_group!(benches, bench_pack, bench_extract);
criterion_main!(benches);
