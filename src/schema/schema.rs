use std::collections::{BTreeSet, HashMap};
use crate::core::types::{CollectionId, HashTableId, IndexPath};
use crate::storage::shard::ShardStore;

/// Immutable view of collections and their indexes.
///
/// Built wholesale from one shard and never edited once published; a reload
/// produces a new `Schema` with a higher version.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    pub version: u64,
    pub col_name_lookup: HashMap<String, CollectionId>,
    pub col_names: HashMap<CollectionId, String>,
    pub index_paths: HashMap<CollectionId, Vec<IndexPath>>,
    pub index_paths_joint: HashMap<CollectionId, BTreeSet<String>>,
    pub ht_lookup: HashMap<HashTableId, (CollectionId, IndexPath)>,
    ht_by_path: HashMap<(CollectionId, String), HashTableId>,
}

impl Schema {
    /// Collections get ids in name order, hash tables are numbered across
    /// the whole schema in that same order.
    pub fn from_shard(shard: &ShardStore, version: u64) -> Self {
        let mut schema = Schema {
            version,
            ..Default::default()
        };

        for name in shard.collection_names() {
            let paths = shard
                .use_collection(name)
                .map(|c| c.indexes().to_vec())
                .unwrap_or_default();
            schema.add_collection(name, paths);
        }
        schema
    }

    /// Register a collection with the next free ids.
    pub fn add_collection(&mut self, name: &str, paths: Vec<IndexPath>) -> CollectionId {
        let col_id = CollectionId(self.col_name_lookup.len() as i32);
        for path in &paths {
            let ht_id = HashTableId(self.ht_lookup.len() as i32);
            self.ht_lookup.insert(ht_id, (col_id, path.clone()));
            self.ht_by_path.insert((col_id, path.joined()), ht_id);
        }

        self.index_paths_joint.insert(col_id, paths.iter().map(IndexPath::joined).collect());
        self.index_paths.insert(col_id, paths);
        self.col_name_lookup.insert(name.to_string(), col_id);
        self.col_names.insert(col_id, name.to_string());
        col_id
    }

    pub fn collection_id(&self, name: &str) -> Option<CollectionId> {
        self.col_name_lookup.get(name).copied()
    }

    pub fn collection_name(&self, id: CollectionId) -> Option<&str> {
        self.col_names.get(&id).map(String::as_str)
    }

    pub fn indexes_of(&self, id: CollectionId) -> &[IndexPath] {
        self.index_paths.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Routing identity of the index on `path`, if the collection has one.
    pub fn ht_id_by_path(&self, collection: &str, path: &IndexPath) -> Option<HashTableId> {
        let col_id = self.collection_id(collection)?;
        self.ht_by_path.get(&(col_id, path.joined())).copied()
    }

    /// Collection name and path behind a routing identity.
    pub fn hash_table(&self, id: HashTableId) -> Option<(&str, &IndexPath)> {
        let (col_id, path) = self.ht_lookup.get(&id)?;
        Some((self.collection_name(*col_id)?, path))
    }
}
