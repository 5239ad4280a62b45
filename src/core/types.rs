use serde::{Serialize, Deserialize};
use std::fmt;

/// Separator used when an index path is flattened into one string.
pub const INDEX_PATH_SEP: &str = "!";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocId(pub u64);

impl DocId {
    pub fn new(id: u64) -> Self {
        DocId(id)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    /// Shard that stores the document itself.
    pub fn home_shard(&self, shard_count: usize) -> usize {
        (self.0 % shard_count as u64) as usize
    }
}

impl From<u64> for DocId {
    fn from(id: u64) -> Self {
        DocId(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CollectionId(pub i32);

/// Routing identity of an index on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HashTableId(pub i32);

/// Ordered field-name segments addressing a value inside a document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IndexPath(pub Vec<String>);

impl IndexPath {
    pub fn new<S: Into<String>>(segments: impl IntoIterator<Item = S>) -> Self {
        IndexPath(segments.into_iter().map(Into::into).collect())
    }

    pub fn split(joined: &str) -> Self {
        IndexPath::new(joined.split(INDEX_PATH_SEP))
    }

    pub fn joined(&self) -> String {
        self.0.join(INDEX_PATH_SEP)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for IndexPath {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.joined())
    }
}

/// Documents are nested key/value structures.
pub type DocValue = serde_json::Value;
