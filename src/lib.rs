pub mod core;
pub mod storage;
pub mod analysis;
pub mod index;
pub mod scoring;
pub mod search;
pub mod query;
pub mod mvcc;

/*
┌──────────────────────────────────────────────────────────────────────────────┐
│                        HEADERDEX STRUCT ARCHITECTURE                          │
└──────────────────────────────────────────────────────────────────────────────┘

┌───────────────────────────────── CORE LAYER ─────────────────────────────────┐
│  ┌────────────────────────────────────────────────────────────────────────┐  │
│  │                         struct HeaderDatabase                          │  │
│  │ config: Config                       // TOML / Default                 │  │
│  │ store: RecordStore                   // authoritative records          │  │
│  │ mvcc: Arc<SnapshotController>        // published snapshot             │  │
│  │ engine: QueryEngine                  // tokenize, score, cache, scan   │  │
│  │ history: SearchHistory               // suggestions                    │  │
│  │ write_lock: Mutex<()>                // mutate + rebuild + publish     │  │
│  └────────────────────────────────────────────────────────────────────────┘  │
│  ┌──────────────────┐  ┌──────────────────────┐  ┌────────────────────────┐  │
│  │ MetadataRecord   │  │ enum Field (9)       │  │ DatabaseStats          │  │
│  │ • id, title, who │  │ • Title .. Key       │  │ • record_count         │  │
│  │ • what .. key    │  │ RecordPatch          │  │ • index_size/builds    │  │
│  │ • related_ids    │  │ • Option per field   │  │ • cache_stats          │  │
│  └──────────────────┘  └──────────────────────┘  └────────────────────────┘  │
└──────────────────────────────────────────────────────────────────────────────┘

┌──────────────────────────────── STORAGE LAYER ───────────────────────────────┐
│  RecordStore ──► trait PersistenceBackend ──┬──► CsvBackend  (+ FileLock)     │
│  • writer: Mutex (bounded wait)             └──► MemoryBackend                │
│  • lock → load → apply → save → publish                                       │
│  • trait WriteGate (AllowAll)                                                 │
└──────────────────────────────────────────────────────────────────────────────┘

┌────────────────────────── ANALYSIS / INDEX / MVCC ───────────────────────────┐
│  FieldTokenizer ──► FieldIndex  (Field, token) → RoaringBitmap               │
│                     RelationshipGraph  id → [related ids]                    │
│  Snapshot { version, records, index, graph }  swapped whole by               │
│  SnapshotController::publish                                                 │
└──────────────────────────────────────────────────────────────────────────────┘

┌──────────────────────────────── QUERY LAYER ─────────────────────────────────┐
│  search(query, SearchOptions)                                                 │
│    │                                                                         │
│    ├─► ResultCache (LRU, keyed by snapshot version)  ── hit ──► results      │
│    ├─► FieldIndex candidates ∪ phrase substring candidates                   │
│    ├─► WeightedFieldScorer (field weights + phrase bonus)                    │
│    ├─► ContentScanner (walkdir + rayon, snippets)   [include_content]        │
│    └─► sort_hits (relevance | title | date | size) → truncate → cache put    │
└──────────────────────────────────────────────────────────────────────────────┘
*/
