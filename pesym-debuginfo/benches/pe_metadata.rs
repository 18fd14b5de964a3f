use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use pesym_common::Uuid;
use pesym_debuginfo::{remove_build_id_duplicates, PeFileMetadata};
use pesym_testutils::{DebugRecord, PeBuilder};

pub fn pe_metadata(c: &mut Criterion) {
    let mut group = c.benchmark_group("PE metadata benchmarks");

    let images = [
        ("no debug directory", PeBuilder::new(0x8664).build()),
        (
            "codeview",
            PeBuilder::new(0x8664)
                .debug_record(DebugRecord::raw(13, vec![0; 64]))
                .debug_record(DebugRecord::codeview(
                    Uuid::from_u128(0x3e3a3e3a_1c05_4e67_b9b7_99d781e5fb5c),
                    1,
                    "D:\\a\\_work\\1\\s\\out\\x64\\Release\\sample.pdb",
                ))
                .build(),
        ),
    ];

    for (name, image) in images.iter() {
        group.bench_with_input(BenchmarkId::new("decode", name), image, |b, image| {
            b.iter(|| PeFileMetadata::from_slice("bench.exe", image))
        });
    }

    group.bench_function("deduplicate", |b| {
        b.iter(|| {
            let files = (0..1000u128).map(|i| {
                let image = PeBuilder::new(0x8664)
                    .debug_record(DebugRecord::codeview(Uuid::from_u128(i % 100), 1, "a.pdb"))
                    .build();
                PeFileMetadata::from_slice(format!("{i}.dll"), &image)
            });
            remove_build_id_duplicates(files)
        })
    });

    group.finish();
}

criterion_group!(benches, pe_metadata);
criterion_main!(benches);
