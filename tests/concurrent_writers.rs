use std::sync::Arc;
use std::thread;
use std::time::Duration;
use headerdex::core::config::Config;
use headerdex::core::database::HeaderDatabase;
use headerdex::core::types::MetadataRecord;
use headerdex::storage::backend::PersistenceBackend;
use headerdex::storage::csv_backend::CsvBackend;

const WRITERS: usize = 4;
const RECORDS_PER_WRITER: usize = 15;

fn config(dir: &tempfile::TempDir) -> Config {
    let mut config = Config::default().with_store_path(dir.path().join("headers.csv"));
    config.lock_retry_ms = 5;
    config
}

#[test]
fn independent_handles_do_not_lose_writes() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(&dir);

    // One database per thread, all on the same file, like separate processes
    let outcomes: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..WRITERS)
            .map(|writer| {
                let config = config.clone();
                scope.spawn(move || {
                    let db = HeaderDatabase::open(config).unwrap();
                    (0..RECORDS_PER_WRITER)
                        .map(|i| {
                            let id = format!("W{}_{}", writer, i);
                            db.add(MetadataRecord::new(&id, &format!("Writer {} note {}", writer, i), "WOLFIE"))
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles.into_iter().flat_map(|h| h.join().unwrap()).collect()
    });

    let mut committed = 0;
    for outcome in &outcomes {
        match outcome {
            Ok(_) => committed += 1,
            Err(e) => assert!(e.is_retryable(), "unexpected failure: {}", e),
        }
    }

    let backend = CsvBackend::open(dir.path().join("headers.csv"), Duration::from_secs(5), Duration::from_millis(5)).unwrap();
    let report = backend.load().unwrap();
    assert_eq!(report.skipped_rows, 0);
    assert_eq!(report.records.len(), committed);
    assert_eq!(committed, WRITERS * RECORDS_PER_WRITER);
}

#[test]
fn shared_handle_serializes_writers() {
    let dir = tempfile::tempdir().unwrap();
    let db = Arc::new(HeaderDatabase::open(config(&dir)).unwrap());

    thread::scope(|scope| {
        for writer in 0..WRITERS {
            let db = Arc::clone(&db);
            scope.spawn(move || {
                for i in 0..RECORDS_PER_WRITER {
                    let id = format!("S{}_{}", writer, i);
                    db.add(MetadataRecord::new(&id, "Shared writer note", "WOLFIE")).unwrap();
                    // Readers never see a partially built index
                    assert!(db.search_default("shared").unwrap().total_hits >= 1);
                }
            });
        }
    });

    assert_eq!(db.all().len(), WRITERS * RECORDS_PER_WRITER);
    let results = db.search_default("shared").unwrap();
    assert_eq!(results.total_hits, WRITERS * RECORDS_PER_WRITER);
}

#[test]
fn refresh_picks_up_other_handle_writes() {
    let dir = tempfile::tempdir().unwrap();
    let first = HeaderDatabase::open(config(&dir)).unwrap();
    let second = HeaderDatabase::open(config(&dir)).unwrap();

    first.add(MetadataRecord::new("A1", "Search Engine Design", "WOLFIE")).unwrap();
    assert!(second.search_default("engine").unwrap().hits.is_empty());

    assert_eq!(second.refresh().unwrap(), 1);
    assert_eq!(second.search_default("engine").unwrap().ids(), vec!["A1"]);

    // A write through the stale handle still keeps the other handle's record
    second.add(MetadataRecord::new("A2", "Meeting Notes", "WOLFIE")).unwrap();
    first.refresh().unwrap();
    assert_eq!(first.all().len(), 2);
}
