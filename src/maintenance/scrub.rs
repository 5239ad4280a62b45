use std::fmt;
use chrono::Utc;
use tracing::info;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{CollectionId, HashTableId, IndexPath};
use crate::maintenance::coordinator::Coordinator;

/// Steps of a scrub, in the order they run.
///
/// Nothing is rolled back on failure. Everything before `Swap` only touches
/// the temporary collection, so a failed scrub can be started over (it picks
/// a fresh temporary name; the old one is left to drop by hand). `Swap`
/// itself is not safe to re-run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrubStep {
    Resolve,
    CreateTemp,
    ReloadTemp,
    Migrate,
    Swap,
    ReloadFinal,
}

impl ScrubStep {
    pub fn rerunnable(self) -> bool {
        !matches!(self, ScrubStep::Swap)
    }
}

impl fmt::Display for ScrubStep {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            ScrubStep::Resolve => "resolve",
            ScrubStep::CreateTemp => "create-temp",
            ScrubStep::ReloadTemp => "reload-temp",
            ScrubStep::Migrate => "migrate",
            ScrubStep::Swap => "swap",
            ScrubStep::ReloadFinal => "reload-final",
        };
        f.write_str(name)
    }
}

fn at_step(collection: &str, step: ScrubStep, e: Error) -> Error {
    Error {
        kind: e.kind,
        context: format!("scrub of {} failed at {}: {}", collection, step, e.context),
        shard: e.shard,
    }
}

pub fn temp_collection_name(collection: &str) -> String {
    format!("scrub-{}-{}", collection, Utc::now().timestamp_nanos_opt().unwrap_or_default())
}

impl Coordinator {
    /// Rebuild a collection without its damaged documents.
    ///
    /// Documents are copied through the tolerant scan into a temporary
    /// collection carrying the same indexes, which then replaces the
    /// original on every shard.
    pub fn scrub(&self, collection: &str) -> Result<()> {
        self.with_maintenance("scrub", || {
            let fail = |step: ScrubStep| move |e: Error| at_step(collection, step, e);

            let indexes = self.scrub_indexes(collection).map_err(fail(ScrubStep::Resolve))?;
            let tmp = temp_collection_name(collection);

            info!(collection, tmp = %tmp, step = %ScrubStep::CreateTemp, "scrub step");
            self.create_temp(&tmp, &indexes).map_err(fail(ScrubStep::CreateTemp))?;

            info!(collection, step = %ScrubStep::ReloadTemp, "scrub step");
            let (tmp_id, targets) = self.resolve_temp(&tmp, &indexes).map_err(fail(ScrubStep::ReloadTemp))?;

            info!(collection, step = %ScrubStep::Migrate, "scrub step");
            let mut migrated = 0u64;
            self.for_each_doc_page(collection, |id, doc| {
                for (ht, path) in &targets {
                    self.put_index_entries(*ht, path, id, &doc)?;
                }
                self.scanner.insert_recovery(tmp_id, id, doc)?;
                migrated += 1;
                Ok(())
            })
            .map_err(fail(ScrubStep::Migrate))?;

            info!(collection, step = %ScrubStep::Swap, "scrub step");
            self.for_all_shards_do(|_, store| {
                store.drop(collection)?;
                store.rename(&tmp, collection)
            })
            .map_err(fail(ScrubStep::Swap))?;

            self.reload_schema().map_err(fail(ScrubStep::ReloadFinal))?;
            info!(collection, migrated, "scrub complete");
            Ok(())
        })
    }

    // Copy, not a reference: later reloads must not change the set
    fn scrub_indexes(&self, collection: &str) -> Result<Vec<IndexPath>> {
        let schema = self.schema.snapshot();
        let col_id = schema
            .collection_id(collection)
            .ok_or_else(|| Error::not_found(format!("collection {} does not exist", collection)))?;
        Ok(schema.indexes_of(col_id).to_vec())
    }

    fn create_temp(&self, tmp: &str, indexes: &[IndexPath]) -> Result<()> {
        self.for_all_shards_do(|_, store| store.create(tmp))?;
        for path in indexes {
            self.for_all_shards_do(|_, store| store.build_index(tmp, path))?;
        }
        Ok(())
    }

    fn resolve_temp(
        &self,
        tmp: &str,
        indexes: &[IndexPath],
    ) -> Result<(CollectionId, Vec<(HashTableId, IndexPath)>)> {
        self.reload_schema()?;
        let schema = self.schema.snapshot();
        let tmp_id = schema.collection_id(tmp).ok_or_else(|| {
            Error::new(ErrorKind::Consistency, format!("temp collection {} went missing", tmp))
        })?;

        let mut targets = Vec::with_capacity(indexes.len());
        for path in indexes {
            let ht = schema.ht_id_by_path(tmp, path).ok_or_else(|| {
                Error::new(ErrorKind::Consistency, format!("hash table for {} in {} went missing", path, tmp))
            })?;
            targets.push((ht, path.clone()));
        }
        Ok((tmp_id, targets))
    }
}
