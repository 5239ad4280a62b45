#![allow(dead_code)]

use std::path::Path;
use std::sync::{Arc, Once};
use serde_json::Value;
use shardkeep::storage::shard::ShardStore;
use shardkeep::wire::client::DocScanner;
use shardkeep::{Config, Coordinator, DocId, LocalCluster};

static INIT: Once = Once::new();

pub struct TestEnv {
    pub coordinator: Coordinator,
    pub cluster: Arc<LocalCluster>,
    pub tmp_dir: tempfile::TempDir,
}

pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("warn")
            .with_test_writer()
            .try_init();
    });
}

pub fn init_test_env(shards: usize) -> TestEnv {
    init_tracing();
    let tmp_dir = tempfile::tempdir().expect("create temp dir");
    let config = Config::default()
        .with_workspace(tmp_dir.path().join("ws"))
        .with_shard_count(shards);
    let (coordinator, cluster) = Coordinator::open_local(config).expect("open workspace");
    TestEnv { coordinator, cluster, tmp_dir }
}

impl TestEnv {
    pub fn shard_dir(&self, shard: usize) -> std::path::PathBuf {
        self.cluster.layout().shard_dir(shard)
    }

    /// Create a collection and make it visible in the schema cache.
    pub fn create_visible(&self, name: &str) {
        self.coordinator.create(name).expect("create collection");
        self.coordinator.reload_schema().expect("reload schema");
    }

    pub fn insert(&self, collection: &str, id: u64, doc: Value) {
        let col_id = self
            .coordinator
            .schema()
            .collection_id(collection)
            .expect("collection in schema");
        self.cluster
            .insert_recovery(col_id, DocId(id), doc)
            .expect("insert document");
    }

    /// All documents of a collection, read strictly.
    pub fn docs(&self, collection: &str) -> std::collections::BTreeMap<u64, Value> {
        self.cluster
            .get_doc_page(collection, 0, 1, false)
            .expect("read documents")
            .into_iter()
            .map(|(id, doc)| (id.0, doc))
            .collect()
    }
}

pub fn shard_doc_ids(dir: &Path, collection: &str) -> Vec<u64> {
    let store = ShardStore::open(dir).expect("open shard");
    let ids: Vec<u64> = store
        .use_collection(collection)
        .expect("collection on shard")
        .read_docs(true)
        .expect("read shard documents")
        .keys()
        .map(|id| id.0)
        .collect();
    store.close().expect("close shard");
    ids
}
