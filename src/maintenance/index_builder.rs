use tracing::info;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{DocId, DocValue, HashTableId, IndexPath};
use crate::index::hash::{index_key, route};
use crate::index::path::get_in;
use crate::maintenance::coordinator::Coordinator;
use crate::wire::protocol::{read_uint64, Command};

impl Coordinator {
    /// Build an index on every shard, then route the indexed values of all
    /// existing documents to the shards owning their hash buckets.
    ///
    /// A failure part way leaves a partially populated index behind; drop it
    /// and index again rather than resuming.
    pub fn index(&self, collection: &str, path: &IndexPath) -> Result<()> {
        self.with_maintenance("index", || {
            self.for_all_shards_do(|_, store| {
                if store.use_collection(collection).is_none() {
                    return Err(Error::not_found(format!("collection {} does not exist", collection)));
                }
                store.build_index(collection, path)
            })?;

            self.reload_schema()?;
            let ht = self.schema.snapshot().ht_id_by_path(collection, path).ok_or_else(|| {
                Error::new(
                    ErrorKind::Consistency,
                    format!("new hash table is missing for {} in {}", path, collection),
                )
            })?;

            let mut docs = 0u64;
            let pages = self.for_each_doc_page(collection, |id, doc| {
                docs += 1;
                self.put_index_entries(ht, path, id, &doc)
            })?;
            info!(collection, path = %path, ht = ht.0, pages, docs, "reindexed collection");
            Ok(())
        })
    }

    /// Remove an index. Shards lacking the collection are skipped, and the
    /// schema cache is left as is; call `reload_schema` to refresh it.
    pub fn unindex(&self, collection: &str, path: &IndexPath) -> Result<()> {
        self.with_maintenance("unindex", || {
            self.for_all_shards_do(|shard, store| {
                if store.use_collection(collection).is_none() {
                    info!(collection, shard, "collection absent on shard, skipping");
                    return Ok(());
                }
                store.remove_index(collection, path)
            })
        })
    }

    /// Send one hash-table put per non-null value found at `path`.
    pub(crate) fn put_index_entries(
        &self,
        ht: HashTableId,
        path: &IndexPath,
        id: DocId,
        doc: &DocValue,
    ) -> Result<()> {
        for value in get_in(doc, path) {
            let Some(key) = index_key(value) else {
                continue;
            };
            let shard = route(key, self.layout.shard_count);
            self.wire
                .send_to_shard(shard, &Command::ht_put(ht, key, id))
                .map_err(|e| transport_error(shard, "hash table put", e))?;
        }
        Ok(())
    }

    /// Ids of documents whose value at `path` hashes like `value`.
    /// Hash collisions are not filtered out.
    pub fn lookup(&self, collection: &str, path: &IndexPath, value: &DocValue) -> Result<Vec<DocId>> {
        let ht = self
            .schema
            .snapshot()
            .ht_id_by_path(collection, path)
            .ok_or_else(|| Error::not_found(format!("{} is not indexed in {}", path, collection)))?;
        let Some(key) = index_key(value) else {
            return Ok(Vec::new());
        };

        let shard = route(key, self.layout.shard_count);
        let params = self
            .wire
            .send_to_shard(shard, &Command::ht_get(ht, key))
            .map_err(|e| transport_error(shard, "hash table get", e))?;

        let mut ids = params
            .iter()
            .map(|p| read_uint64(p).map(DocId))
            .collect::<Result<Vec<_>>>()?;
        ids.sort();
        Ok(ids)
    }
}

fn transport_error(shard: usize, what: &str, e: Error) -> Error {
    Error::new(ErrorKind::Transport, format!("{} failed: {}", what, e)).on_shard(shard)
}
