/// headerdex API demo
///
/// Walks through the main operations:
/// - add / update / delete header records
/// - relevance search, scoped search, content search
/// - suggestions, relationships, statistics
///
/// Run with `RUST_LOG=headerdex=debug` to see cache and rebuild events.

use headerdex::core::config::Config;
use headerdex::core::database::HeaderDatabase;
use headerdex::core::types::{Field, MetadataRecord, RecordPatch};
use headerdex::query::types::{FieldScope, SearchOptions, SortBy};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let workspace = tempfile::tempdir()?;
    let docs = workspace.path().join("docs");
    std::fs::create_dir_all(&docs)?;
    std::fs::write(docs.join("design.md"), "# Search engine\nThe search engine ranks header records.")?;
    std::fs::write(docs.join("notes.txt"), "Meeting notes: nothing about ranking here.")?;

    let mut config = Config::default().with_store_path(workspace.path().join("data").join("headers.csv"));
    config.history_path = Some(workspace.path().join("data").join("history.json"));
    config.content.root = Some(docs);

    println!("Opening database...");
    let db = HeaderDatabase::open(config)?;

    // Step 1: INSERT
    db.add(
        MetadataRecord::new("A1", "Search Engine Design", "WOLFIE")
            .with_field(Field::What, "inverted field index and ranking")
            .with_field(Field::Key, "search, ranking")
            .with_related(&["A2", "A9"]),
    )?;
    db.add(MetadataRecord::new("A2", "Meeting Notes", "WOLFIE").with_related(&["A3"]))?;
    db.add(MetadataRecord::new("A3", "Cache Layer", "CAPTAIN").with_field(Field::How, "LRU result cache"))?;
    println!("  Inserted {} records\n", db.all().len());

    // Step 2: SEARCH
    for query in ["search", "wolfie", "ngine desi", "cache"] {
        let results = db.search_default(query)?;
        println!("  '{}': {:?} (total {})", query, results.ids(), results.total_hits);
    }

    let scoped = SearchOptions::default().with_scope(FieldScope::One(Field::Who));
    println!("  who:'wolfie': {:?}", db.search("wolfie", &scoped)?.ids());

    let with_content = SearchOptions::default().with_content(true).with_sort(SortBy::Relevance);
    for hit in db.search("search engine", &with_content)?.hits {
        println!("    {:>6.1}  {}  {}", hit.score, hit.title, hit.snippet.unwrap_or_default());
    }
    println!();

    // Step 3: UPDATE / DELETE
    let changed = db.update("A3", &RecordPatch::new().set(Field::Title, "Result Cache Layer"))?;
    println!("  Updated A3: {}", changed);
    db.delete("A2")?;
    println!("  Deleted A2; 'meeting' now returns {} hits\n", db.search_default("meeting")?.total_hits);

    // Step 4: SUGGEST + RELATIONSHIPS
    println!("  Suggestions for 'sea': {:?}", db.suggest("sea", 5));
    println!("  A1 neighbors: {:?}", db.neighbors("A1"));
    println!("  A1 related (existing): {:?}", db.related("A1").iter().map(|r| &r.id).collect::<Vec<_>>());

    // Step 5: STATS
    let stats = db.stats();
    println!("\n  Records:        {}", stats.record_count);
    println!("  Index keys:     {}", stats.index_size);
    println!("  Index builds:   {}", stats.index_builds);
    println!("  Searches:       {}", stats.search_count);
    println!("  Cache hit rate: {:.2}", stats.cache_stats.hit_rate());
    println!("{}", serde_json::to_string_pretty(&stats)?);

    Ok(())
}
