use crawline_core::sink::{Codec, WriterPool};

fn sample_lines() -> Vec<Vec<u8>> {
    (0..5_000)
        .map(|i| {
            format!(
                r#"{{"url": "http://example.com/page/{i}", "text": "sample paragraph text repeated enough to look like a crawled document segment {i}", "lang": ["fin_Latn"], "prob": [0.93]}}"#
            )
            .into_bytes()
        })
        .collect()
}

#[divan::bench(args = [1, 3, 10])]
fn zstd_shard_write(bencher: divan::Bencher, level: i32) {
    let lines = sample_lines();
    bencher.bench_local(|| {
        let dir = tempfile::tempdir().unwrap();
        let mut pool = WriterPool::new(
            dir.path(),
            Codec::Zstd { level, threads: 1 },
            "jsonl",
            8 * 1024 * 1024,
        );
        for line in &lines {
            pool.write("fi_Latn", line).unwrap();
        }
        pool.close_all().unwrap()
    });
}

#[divan::bench]
fn gzip_shard_write(bencher: divan::Bencher) {
    let lines = sample_lines();
    bencher.bench_local(|| {
        let dir = tempfile::tempdir().unwrap();
        let mut pool = WriterPool::new(dir.path(), Codec::Gzip, "jsonl", 8 * 1024 * 1024);
        for line in &lines {
            pool.write("fi_Latn", line).unwrap();
        }
        pool.close_all().unwrap()
    });
}

fn main() {
    divan::main();
}
