use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use bytes::Bytes;
use parking_lot::RwLock;
use tracing::{debug, info};
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{CollectionId, DocId, DocValue, HashTableId, IndexPath};
use crate::schema::schema::Schema;
use crate::storage::layout::WorkspaceLayout;
use crate::storage::shard::{Collection, ShardStore};
use crate::wire::client::{DocScanner, WireClient};
use crate::wire::protocol::{buint64, read_int32, read_uint64, Command, Opcode};

/// In-process server group for a workspace.
///
/// Every request opens the shard it needs and closes it again, so it never
/// holds a shard across a maintenance operation. Opens wait for the shard
/// lock: reads share it, writes and maintenance take it alone. Commands
/// still go through the binary codec.
pub struct LocalCluster {
    layout: WorkspaceLayout,
    schema: RwLock<Arc<Schema>>,
    reloads: AtomicU64,
}

impl LocalCluster {
    pub fn open(layout: WorkspaceLayout) -> Result<Self> {
        let cluster = LocalCluster {
            layout,
            schema: RwLock::new(Arc::new(Schema::default())),
            reloads: AtomicU64::new(0),
        };
        cluster.reload_schema()?;
        Ok(cluster)
    }

    pub fn layout(&self) -> &WorkspaceLayout {
        &self.layout
    }

    fn with_shard<T>(
        &self,
        shard: usize,
        write: bool,
        f: impl FnOnce(&ShardStore) -> Result<T>,
    ) -> Result<T> {
        let store = ShardStore::open_waiting(self.layout.shard_dir(shard), write)
            .map_err(|e| e.on_shard(shard))?;
        let out = f(&store).map_err(|e| e.on_shard(shard))?;
        store.close().map_err(|e| e.on_shard(shard))?;
        Ok(out)
    }

    fn with_collection<T>(
        &self,
        shard: usize,
        name: &str,
        write: bool,
        f: impl FnOnce(&Collection) -> Result<T>,
    ) -> Result<T> {
        self.with_shard(shard, write, |store| {
            let col = store
                .use_collection(name)
                .ok_or_else(|| Error::not_found(format!("collection {} does not exist", name)))?;
            f(col)
        })
    }

    fn resolve_ht(&self, param: &[u8]) -> Result<(String, IndexPath)> {
        let ht = HashTableId(read_int32(param)?);
        let schema = self.schema.read().clone();
        schema
            .hash_table(ht)
            .map(|(name, path)| (name.to_string(), path.clone()))
            .ok_or_else(|| Error::not_found(format!("hash table {} is not in the schema", ht.0)))
    }

    fn serve(&self, shard: usize, cmd: Command) -> Result<Vec<Bytes>> {
        match cmd.opcode {
            Opcode::HtPut => {
                cmd.expect_params(3)?;
                let (name, path) = self.resolve_ht(&cmd.params[0])?;
                let key = read_uint64(&cmd.params[1])?;
                let doc = DocId(read_uint64(&cmd.params[2])?);
                self.with_collection(shard, &name, true, |col| col.ht_put(&path, key, doc))?;
                Ok(Vec::new())
            }
            Opcode::HtGet => {
                cmd.expect_params(2)?;
                let (name, path) = self.resolve_ht(&cmd.params[0])?;
                let key = read_uint64(&cmd.params[1])?;
                let ids = self.with_collection(shard, &name, false, |col| col.ht_get(&path, key))?;
                Ok(ids.into_iter().map(|id| buint64(id.0)).collect())
            }
        }
    }
}

impl WireClient for LocalCluster {
    fn ping(&self) -> Result<()> {
        if self.layout.root.is_dir() {
            Ok(())
        } else {
            Err(Error::new(
                ErrorKind::Transport,
                format!("workspace {} is gone", self.layout.root.display()),
            ))
        }
    }

    fn reload_schema(&self) -> Result<Schema> {
        let version = self.reloads.fetch_add(1, Ordering::SeqCst) + 1;
        let schema = self.with_shard(0, false, |store| Ok(Schema::from_shard(store, version)))?;
        *self.schema.write() = Arc::new(schema.clone());
        info!(version, collections = schema.col_name_lookup.len(), "schema reloaded");
        Ok(schema)
    }

    fn send_to_shard(&self, shard: usize, cmd: &Command) -> Result<Vec<Bytes>> {
        if shard >= self.layout.shard_count {
            return Err(Error::new(
                ErrorKind::Transport,
                format!("no server for shard {} of {}", shard, self.layout.shard_count),
            ));
        }
        // round-trip through the codec like a real connection would
        let cmd = Command::decode(cmd.encode())?;
        self.serve(shard, cmd)
    }
}

impl DocScanner for LocalCluster {
    fn approx_doc_count(&self, collection: &str) -> Result<u64> {
        let mut total = 0;
        for shard in self.layout.shards() {
            total += self.with_collection(shard, collection, false, Collection::approx_doc_count)?;
        }
        Ok(total)
    }

    fn get_doc_page(
        &self,
        collection: &str,
        page: u64,
        total_pages: u64,
        tolerant: bool,
    ) -> Result<HashMap<DocId, DocValue>> {
        if total_pages == 0 || page >= total_pages {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                format!("page {} out of {}", page, total_pages),
            ));
        }

        let mut docs = HashMap::new();
        for shard in self.layout.shards() {
            let shard_docs = self.with_collection(shard, collection, false, |col| col.read_docs(tolerant))?;
            docs.extend(shard_docs.into_iter().filter(|(id, _)| id.0 % total_pages == page));
        }
        debug!(collection, page, total_pages, docs = docs.len(), "served document page");
        Ok(docs)
    }

    fn insert_recovery(&self, collection: CollectionId, id: DocId, doc: DocValue) -> Result<()> {
        let name = self
            .schema
            .read()
            .collection_name(collection)
            .map(str::to_string)
            .ok_or_else(|| Error::not_found(format!("collection id {} is not in the schema", collection.0)))?;
        let shard = id.home_shard(self.layout.shard_count);
        self.with_collection(shard, &name, true, |col| col.insert(id, &doc))
    }
}
