use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use headerdex::analysis::tokenizer::FieldTokenizer;
use headerdex::core::config::Config;
use headerdex::core::database::HeaderDatabase;
use headerdex::core::types::{Field, MetadataRecord};
use headerdex::index::inverted::FieldIndex;
use headerdex::query::types::SearchOptions;
use headerdex::storage::memory_backend::MemoryBackend;
use rand::Rng;
use tracing_subscriber::EnvFilter;

const WORDS: [&str; 12] = [
    "search", "engine", "design", "meeting", "notes", "cache", "index", "lock",
    "channel", "agent", "memory", "header",
];
const AUTHORS: [&str; 4] = ["WOLFIE", "CAPTAIN", "ARA", "LILITH"];

fn phrase(rng: &mut impl Rng, words: usize) -> String {
    (0..words)
        .map(|_| WORDS[rng.gen_range(0..WORDS.len())])
        .collect::<Vec<_>>()
        .join(" ")
}

/// Helper to create test records
fn create_records(count: usize) -> Vec<MetadataRecord> {
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|i| {
            let related = format!("R{}", rng.gen_range(0..count.max(1)));
            MetadataRecord::new(&format!("R{}", i), &phrase(&mut rng, 4), AUTHORS[i % AUTHORS.len()])
                .with_field(Field::What, &phrase(&mut rng, 12))
                .with_field(Field::Why, &phrase(&mut rng, 8))
                .with_field(Field::Key, &phrase(&mut rng, 3))
                .with_related(&[related.as_str()])
        })
        .collect()
}

fn database(count: usize) -> HeaderDatabase {
    // Quiet by default; RUST_LOG=headerdex=debug shows rebuilds
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .try_init();

    let backend = MemoryBackend::with_records(create_records(count));
    HeaderDatabase::with_backend(Box::new(backend), Config::default()).unwrap()
}

/// Benchmark index rebuild at different store sizes
fn bench_index_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("index_build");
    let tokenizer = FieldTokenizer::default();

    for size in [100, 1_000, 5_000] {
        let records = create_records(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &records, |b, records| {
            b.iter(|| black_box(FieldIndex::build(records, &tokenizer)));
        });
    }
    group.finish();
}

/// Benchmark uncached search (cache cleared every iteration)
fn bench_search_uncached(c: &mut Criterion) {
    let mut group = c.benchmark_group("search_uncached");

    for size in [100, 1_000, 5_000] {
        let db = database(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &db, |b, db| {
            b.iter(|| {
                db.clear_caches();
                black_box(db.search_default("search engine").unwrap())
            });
        });
    }
    group.finish();
}

/// Benchmark cached search
fn bench_search_cached(c: &mut Criterion) {
    let db = database(1_000);
    let options = SearchOptions::default();
    db.search("cache index", &options).unwrap();

    c.bench_function("search_cached_1000", |b| {
        b.iter(|| black_box(db.search("cache index", &options).unwrap()));
    });
}

/// Benchmark a write, which includes the rebuild and cache clear
fn bench_add_with_rebuild(c: &mut Criterion) {
    let db = database(1_000);
    let mut id = 0u64;

    c.bench_function("add_with_rebuild_1000", |b| {
        b.iter(|| {
            id += 1;
            db.add(MetadataRecord::new(&format!("N{}", id), "bench record", "WOLFIE")).unwrap()
        });
    });
}

criterion_group!(
    benches,
    bench_index_build,
    bench_search_uncached,
    bench_search_cached,
    bench_add_with_rebuild
);
criterion_main!(benches);
