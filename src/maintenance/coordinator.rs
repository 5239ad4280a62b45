use std::path::Path;
use std::sync::Arc;
use parking_lot::Mutex;
use tracing::{debug, info, warn};
use crate::core::config::Config;
use crate::core::error::{Error, Result};
use crate::core::types::{DocId, DocValue, IndexPath};
use crate::schema::cache::SchemaCache;
use crate::schema::schema::Schema;
use crate::storage::layout::WorkspaceLayout;
use crate::storage::shard::ShardStore;
use crate::wire::client::{DocScanner, WireClient};
use crate::wire::local::LocalCluster;

/// Applies structural operations to every shard of a workspace.
///
/// At most one structural operation runs at a time (the maintenance lock).
/// The schema cache has its own lock, so read accessors only wait for the
/// snapshot swap at the end of a reload, never for shard I/O.
pub struct Coordinator {
    pub(crate) config: Config,
    pub(crate) layout: WorkspaceLayout,
    pub(crate) schema: SchemaCache,
    maint_lock: Mutex<()>,
    pub(crate) wire: Arc<dyn WireClient>,
    pub(crate) scanner: Arc<dyn DocScanner>,
}

impl Coordinator {
    pub fn open(
        config: Config,
        wire: Arc<dyn WireClient>,
        scanner: Arc<dyn DocScanner>,
    ) -> Result<Self> {
        let layout = WorkspaceLayout::open(&config.workspace)?;
        let coordinator = Coordinator {
            config,
            layout,
            schema: SchemaCache::default(),
            maint_lock: Mutex::new(()),
            wire,
            scanner,
        };
        coordinator.reload_schema()?;
        Ok(coordinator)
    }

    /// Create (or reuse) the workspace and serve it with an in-process cluster.
    pub fn open_local(config: Config) -> Result<(Self, Arc<LocalCluster>)> {
        let layout = WorkspaceLayout::create_or_open(&config.workspace, config.shard_count)?;
        let cluster = Arc::new(LocalCluster::open(layout)?);
        let coordinator = Coordinator::open(config, cluster.clone(), cluster.clone())?;
        Ok((coordinator, cluster))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn shard_count(&self) -> usize {
        self.layout.shard_count
    }

    pub fn schema(&self) -> Arc<Schema> {
        self.schema.snapshot()
    }

    /// Fetch the authoritative schema and swap it into the cache.
    pub fn reload_schema(&self) -> Result<()> {
        let schema = self.wire.reload_schema()?;
        debug!(client = self.config.client_id, version = schema.version, "schema cache replaced");
        self.schema.replace(schema);
        Ok(())
    }

    /// Run one structural operation under the maintenance lock.
    pub(crate) fn with_maintenance<T>(&self, op: &str, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let _guard = self.maint_lock.lock();
        info!(client = self.config.client_id, op, "maintenance started");

        let result = f();
        match &result {
            Ok(_) => info!(client = self.config.client_id, op, "maintenance finished"),
            Err(e) => warn!(client = self.config.client_id, op, error = %e, "maintenance failed"),
        }
        result
    }

    /// Open, apply, close: shard 0 first, then 1, 2 ... in order.
    ///
    /// Stops at the first error and tags it with the shard index. Shards
    /// before that one keep the change, later ones were never touched.
    /// Opening waits for in-flight server requests on the shard.
    pub(crate) fn for_all_shards_do(
        &self,
        mut f: impl FnMut(usize, &mut ShardStore) -> Result<()>,
    ) -> Result<()> {
        for shard in self.layout.shards() {
            let mut store = ShardStore::open_waiting(self.layout.shard_dir(shard), true)
                .map_err(|e| e.on_shard(shard))?;
            f(shard, &mut store).map_err(|e| e.on_shard(shard))?;
            store.close().map_err(|e| e.on_shard(shard))?;
        }
        Ok(())
    }

    pub fn create(&self, name: &str) -> Result<()> {
        self.with_maintenance("create", || {
            self.for_all_shards_do(|_, store| store.create(name))
        })
    }

    pub fn rename(&self, old: &str, new: &str) -> Result<()> {
        self.with_maintenance("rename", || {
            self.for_all_shards_do(|_, store| store.rename(old, new))
        })
    }

    pub fn truncate(&self, name: &str) -> Result<()> {
        self.with_maintenance("truncate", || {
            self.for_all_shards_do(|_, store| store.truncate(name))
        })
    }

    pub fn drop(&self, name: &str) -> Result<()> {
        self.with_maintenance("drop", || {
            self.for_all_shards_do(|_, store| store.drop(name))
        })
    }

    /// Copy every shard into `dest/<shard>` for backup.
    pub fn dump_db(&self, dest: &Path) -> Result<()> {
        self.with_maintenance("dump", || {
            for shard in self.layout.shards() {
                let dest = dest.join(shard.to_string());
                create_private_dir(&dest).map_err(|e| e.on_shard(shard))?;
                let store = ShardStore::open_waiting(self.layout.shard_dir(shard), true)
                    .map_err(|e| e.on_shard(shard))?;
                store.dump(&dest).map_err(|e| e.on_shard(shard))?;
                store.close().map_err(|e| e.on_shard(shard))?;
            }
            Ok(())
        })
    }

    fn ping_or_warn(&self, what: &str) {
        if let Err(e) = self.wire.ping() {
            warn!(client = self.config.client_id, error = %e, "failed to ping before returning {}", what);
        }
    }

    /// All collection names, sorted.
    pub fn all_cols(&self) -> Vec<String> {
        self.ping_or_warn("collection names");
        let schema = self.schema.snapshot();
        let mut names: Vec<String> = schema.col_name_lookup.keys().cloned().collect();
        names.sort();
        names
    }

    /// Index paths of a collection, ordered by their joined form.
    pub fn all_indexes(&self, collection: &str) -> Result<Vec<IndexPath>> {
        Ok(self
            .all_indexes_joint_paths(collection)?
            .iter()
            .map(|joined| IndexPath::split(joined))
            .collect())
    }

    /// Joined index paths of a collection, sorted.
    pub fn all_indexes_joint_paths(&self, collection: &str) -> Result<Vec<String>> {
        self.ping_or_warn("index paths");
        let schema = self.schema.snapshot();
        let col_id = schema
            .collection_id(collection)
            .ok_or_else(|| Error::not_found(format!("collection {} does not exist", collection)))?;

        // BTreeSet iterates in sorted order
        Ok(schema
            .index_paths_joint
            .get(&col_id)
            .map(|paths| paths.iter().cloned().collect())
            .unwrap_or_default())
    }

    /// Walk every document of `collection` in pages, tolerating damage.
    /// Returns the number of pages visited.
    pub(crate) fn for_each_doc_page(
        &self,
        collection: &str,
        mut visit: impl FnMut(DocId, DocValue) -> Result<()>,
    ) -> Result<u64> {
        let doc_count = self.scanner.approx_doc_count(collection)?;
        let total = doc_count / self.config.page_size.max(1) + 1;

        for page in 0..total {
            let docs = self.scanner.get_doc_page(collection, page, total, true)?;
            debug!(collection, page, total, docs = docs.len(), "scanning page");
            for (id, doc) in docs {
                visit(id, doc)?;
            }
        }
        Ok(total)
    }
}

fn create_private_dir(dir: &Path) -> Result<()> {
    let mut builder = std::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder.create(dir)?;
    Ok(())
}
