use std::sync::Arc;
use parking_lot::RwLock;
use crate::schema::schema::Schema;

/// Client-side copy of the schema.
///
/// Readers clone the current `Arc` under the read lock; a reload swaps in
/// a whole new snapshot under the write lock, so nobody sees a mix.
pub struct SchemaCache {
    current: RwLock<Arc<Schema>>,
}

impl SchemaCache {
    pub fn new(schema: Schema) -> Self {
        SchemaCache {
            current: RwLock::new(Arc::new(schema)),
        }
    }

    pub fn snapshot(&self) -> Arc<Schema> {
        self.current.read().clone()
    }

    pub fn replace(&self, schema: Schema) {
        *self.current.write() = Arc::new(schema);
    }

    pub fn version(&self) -> u64 {
        self.current.read().version
    }
}

impl Default for SchemaCache {
    fn default() -> Self {
        SchemaCache::new(Schema::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn old_snapshot_is_unaffected_by_replace() {
        let cache = SchemaCache::default();
        let before = cache.snapshot();

        let mut next = Schema::default();
        next.version = 9;
        next.col_name_lookup.insert("c".to_string(), crate::core::types::CollectionId(0));
        cache.replace(next);

        assert_eq!(before.version, 0);
        assert!(before.col_name_lookup.is_empty());
        assert_eq!(cache.version(), 9);
        assert!(cache.snapshot().collection_id("c").is_some());
    }
}
