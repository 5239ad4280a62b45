pub mod core;
pub mod storage;
pub mod schema;
pub mod index;
pub mod wire;
pub mod maintenance;

pub use crate::core::config::Config;
pub use crate::core::error::{Error, ErrorKind, Result};
pub use crate::core::types::{CollectionId, DocId, DocValue, HashTableId, IndexPath};
pub use crate::maintenance::coordinator::Coordinator;
pub use crate::maintenance::scrub::ScrubStep;
pub use crate::wire::local::LocalCluster;

/*
┌──────────────────────────────────────────────────────────────────────────────┐
│                         SHARDKEEP MAINTENANCE FLOW                            │
└──────────────────────────────────────────────────────────────────────────────┘

  caller ──► Coordinator ── maintenance lock (one structural op at a time)
                 │
                 ├─► for_all_shards_do:  open 0 ─ act ─ close, open 1 ─ ... N-1
                 │        (stops at the first failing shard, no rollback)
                 │
                 ├─► WireClient::reload_schema ──► SchemaCache (Arc swap)
                 │
                 ├─► index:  build on all shards ─ reload ─ hash-table id
                 │           ─ page through docs ─ get_in ─ index_key
                 │           ─ route = key % N ─ HtPut to owning shard
                 │
                 └─► scrub:  copy index list ─ create temp + indexes
                             ─ reload ─ tolerant pages ─ insert_recovery
                             ─ drop original + rename temp ─ reload

  Workspace on disk:
    <root>/shards                 shard count, fixed at creation
    <root>/<i>/.lock              flock held while a shard is open
    <root>/<i>/<collection>/      meta.bin, docs.dat, ht_<crc32>.dat
*/
