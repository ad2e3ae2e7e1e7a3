//! Bucket scan and flat search benchmark suite.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use histoseq_core::config::{MixerConfig, SearchConfig};
use histoseq_core::{FeatureExtractor, FeatureMode};
use histoseq_storage::{FlatStore, IndexBuilder, ShardedSearcher, VectorIndex};

fn corpus() -> Vec<u8> {
    b"Whan that Aprille with his shoures soote the droghte of March hath perced to the roote "
        .iter()
        .cycle()
        .take(4096)
        .copied()
        .collect()
}

fn scan_benchmarks(c: &mut Criterion) {
    let corpus = corpus();
    let extractor = FeatureExtractor::new(FeatureMode::Entropy);
    let flat = FlatStore::build(&corpus, &extractor, &MixerConfig::default());
    let query = flat.entries()[2048].vector;

    c.bench_function("flat_nearest_4096", |b| {
        b.iter(|| flat.nearest(black_box(&query), 64))
    });

    let runtime = tokio::runtime::Runtime::new().expect("runtime");
    let dir = tempfile::TempDir::new().expect("tempdir");
    let path = dir.path().join("bench.idx");
    let centroids = (0..16).map(|b| flat.entries()[b * 256].vector).collect();
    runtime
        .block_on(
            IndexBuilder::new(MixerConfig::default(), extractor, 256, 4).build(&corpus, centroids),
        )
        .expect("build")
        .write(&path)
        .expect("write");
    let index = Arc::new(VectorIndex::load(&path, 16).expect("load"));
    let searcher = ShardedSearcher::open(index, &SearchConfig::default()).expect("open");

    c.bench_function("sharded_search_16_buckets", |b| {
        b.iter(|| runtime.block_on(searcher.search(black_box(&query))))
    });
}

criterion_group!(benches, scan_benchmarks);
criterion_main!(benches);
