use std::collections::HashMap;
use bytes::Bytes;
use crate::core::error::Result;
use crate::core::types::{CollectionId, DocId, DocValue};
use crate::schema::schema::Schema;
use crate::wire::protocol::Command;

/// Connection to the servers owning the shards.
pub trait WireClient: Send + Sync {
    /// Liveness only.
    fn ping(&self) -> Result<()>;

    /// Make the servers reload, and return the authoritative schema.
    fn reload_schema(&self) -> Result<Schema>;

    /// Send `cmd` to the server owning `shard` and return the response params.
    fn send_to_shard(&self, shard: usize, cmd: &Command) -> Result<Vec<Bytes>>;
}

/// Paginated document access across all shards.
pub trait DocScanner: Send + Sync {
    fn approx_doc_count(&self, collection: &str) -> Result<u64>;

    /// Documents of page `page` out of `total_pages`. With `tolerant` set,
    /// damaged records are left out instead of failing the page.
    fn get_doc_page(
        &self,
        collection: &str,
        page: u64,
        total_pages: u64,
        tolerant: bool,
    ) -> Result<HashMap<DocId, DocValue>>;

    /// Store `doc` under its existing id, skipping validation and indexing.
    fn insert_recovery(&self, collection: CollectionId, id: DocId, doc: DocValue) -> Result<()>;
}
