use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use fileop_core::backend::MemFs;
use fileop_core::compression::{compress_bytes, CompressionKind, GzipConcurrency};
use fileop_core::{FileWriter, WriterOptions};

fn sample(len: usize) -> Vec<u8> {
    (0..len as u32).map(|i| (i.wrapping_mul(2654435761) >> 24) as u8 % 64 + b' ').collect()
}

// ---------------------------------------------------------------------------
// Serial vs concurrent gzip
// ---------------------------------------------------------------------------

fn bench_gzip_modes(c: &mut Criterion) {
    let data = sample(8 << 20);
    let mut group = c.benchmark_group("gzip_8mib");
    group.throughput(Throughput::Bytes(data.len() as u64));
    group.sample_size(10);

    group.bench_function("serial", |b| {
        b.iter(|| compress_bytes(black_box(&data), CompressionKind::Gzip, None).unwrap());
    });
    for workers in [2, 4] {
        let cfg = GzipConcurrency::new(1 << 20, workers);
        group.bench_with_input(BenchmarkId::new("concurrent", workers), &cfg, |b, cfg| {
            b.iter(|| compress_bytes(black_box(&data), CompressionKind::Gzip, Some(*cfg)).unwrap());
        });
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// Every codec through a pooled writer
// ---------------------------------------------------------------------------

fn bench_writer_codecs(c: &mut Criterion) {
    let data = sample(1 << 20);
    let fs = MemFs::new();
    let mut group = c.benchmark_group("file_writer_1mib");
    group.throughput(Throughput::Bytes(data.len() as u64));

    for kind in CompressionKind::ALL {
        let opts = WriterOptions::new(0, kind);
        group.bench_with_input(BenchmarkId::from_parameter(kind), &opts, |b, opts| {
            b.iter(|| {
                let mut w = FileWriter::open_with_options(&fs, "bench/out", opts).unwrap();
                std::io::Write::write_all(&mut w, black_box(&data)).unwrap();
                w.close().unwrap();
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_gzip_modes, bench_writer_codecs);
criterion_main!(benches);
