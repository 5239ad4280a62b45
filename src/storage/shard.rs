use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use serde::{Serialize, Deserialize};
use tracing::debug;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{DocId, DocValue, IndexPath};
use crate::storage::file_lock::FileLock;
use crate::storage::record;

const META_FILE: &str = "meta.bin";
const DOCS_FILE: &str = "docs.dat";
const HT_ENTRY: usize = 16;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectionMeta {
    pub indexes: Vec<IndexPath>,
}

/// One collection inside one shard
#[derive(Debug, Clone)]
pub struct Collection {
    pub name: String,
    pub dir: PathBuf,
    pub meta: CollectionMeta,
}

impl Collection {
    fn load(name: String, dir: PathBuf) -> Result<Self> {
        let meta = bincode::deserialize(&fs::read(dir.join(META_FILE))?)?;
        Ok(Collection { name, dir, meta })
    }

    fn save_meta(&self) -> Result<()> {
        fs::write(self.dir.join(META_FILE), bincode::serialize(&self.meta)?)?;
        Ok(())
    }

    pub fn indexes(&self) -> &[IndexPath] {
        &self.meta.indexes
    }

    /// Paths are compared by their joined form, which also names the
    /// hash table file.
    pub fn is_indexed(&self, path: &IndexPath) -> bool {
        let joined = path.joined();
        self.meta.indexes.iter().any(|p| p.joined() == joined)
    }

    fn docs_path(&self) -> PathBuf {
        self.dir.join(DOCS_FILE)
    }

    pub fn hash_table_path(&self, path: &IndexPath) -> PathBuf {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(path.joined().as_bytes());
        self.dir.join(format!("ht_{:08x}.dat", hasher.finalize()))
    }

    /// Append a document, keeping its id. No validation, no index upkeep.
    pub fn insert(&self, id: DocId, doc: &DocValue) -> Result<()> {
        let frame = record::encode_doc(id, doc)?;
        let mut file = OpenOptions::new().create(true).append(true).open(self.docs_path())?;
        file.write_all(&frame)?;
        Ok(())
    }

    pub fn read_docs(&self, tolerant: bool) -> Result<BTreeMap<DocId, DocValue>> {
        let data = read_or_empty(&self.docs_path())?;
        record::decode_docs(&data, tolerant)
            .map_err(|e| Error::new(e.kind, format!("collection {}: {}", self.name, e.context)))
    }

    pub fn approx_doc_count(&self) -> Result<u64> {
        Ok(record::count_frames(&read_or_empty(&self.docs_path())?))
    }

    pub fn ht_put(&self, path: &IndexPath, key: u64, id: DocId) -> Result<()> {
        if !self.is_indexed(path) {
            return Err(Error::not_found(format!("{} is not indexed in {}", path, self.name)));
        }
        let mut entry = [0u8; HT_ENTRY];
        entry[..8].copy_from_slice(&key.to_le_bytes());
        entry[8..].copy_from_slice(&id.0.to_le_bytes());

        let mut file = OpenOptions::new().create(true).append(true).open(self.hash_table_path(path))?;
        file.write_all(&entry)?;
        Ok(())
    }

    pub fn ht_get(&self, path: &IndexPath, key: u64) -> Result<BTreeSet<DocId>> {
        if !self.is_indexed(path) {
            return Err(Error::not_found(format!("{} is not indexed in {}", path, self.name)));
        }
        let data = read_or_empty(&self.hash_table_path(path))?;
        let mut ids = BTreeSet::new();
        for entry in data.chunks_exact(HT_ENTRY) {
            let mut word = [0u8; 8];
            word.copy_from_slice(&entry[..8]);
            if u64::from_le_bytes(word) == key {
                word.copy_from_slice(&entry[8..]);
                ids.insert(DocId(u64::from_le_bytes(word)));
            }
        }
        Ok(ids)
    }
}

/// On-disk collection store for a single shard.
pub struct ShardStore {
    pub dir: PathBuf,
    collections: BTreeMap<String, Collection>,
    _lock: FileLock,
}

impl ShardStore {
    /// Open for exclusive use, failing if anyone else holds the shard.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        Self::open_with(dir.into(), true, false)
    }

    /// Open once the shard is free. A shared open only waits for exclusive
    /// holders and must not change anything.
    pub fn open_waiting(dir: impl Into<PathBuf>, exclusive: bool) -> Result<Self> {
        Self::open_with(dir.into(), exclusive, true)
    }

    fn open_with(dir: PathBuf, exclusive: bool, wait: bool) -> Result<Self> {
        fs::create_dir_all(&dir)?;
        let lock = FileLock::acquire(&dir, exclusive, wait)?;

        let mut collections = BTreeMap::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_dir() || !path.join(META_FILE).exists() {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|s| s.to_str()) {
                let col = Collection::load(name.to_string(), path.clone())?;
                collections.insert(name.to_string(), col);
            }
        }

        debug!(dir = %dir.display(), collections = collections.len(), "shard opened");
        Ok(ShardStore { dir, collections, _lock: lock })
    }

    pub fn close(self) -> Result<()> {
        debug!(dir = %self.dir.display(), "shard closed");
        Ok(())
    }

    pub fn use_collection(&self, name: &str) -> Option<&Collection> {
        self.collections.get(name)
    }

    pub fn collection_names(&self) -> impl Iterator<Item = &str> {
        self.collections.keys().map(String::as_str)
    }

    fn existing(&self, name: &str) -> Result<&Collection> {
        self.collections
            .get(name)
            .ok_or_else(|| Error::not_found(format!("collection {} does not exist", name)))
    }

    fn existing_mut(&mut self, name: &str) -> Result<&mut Collection> {
        self.collections
            .get_mut(name)
            .ok_or_else(|| Error::not_found(format!("collection {} does not exist", name)))
    }

    pub fn create(&mut self, name: &str) -> Result<()> {
        check_name(name)?;
        if self.collections.contains_key(name) {
            return Err(Error::new(ErrorKind::AlreadyExists, format!("collection {} already exists", name)));
        }
        let dir = self.dir.join(name);
        fs::create_dir_all(&dir)?;
        let col = Collection {
            name: name.to_string(),
            dir,
            meta: CollectionMeta::default(),
        };
        col.save_meta()?;
        self.collections.insert(name.to_string(), col);
        Ok(())
    }

    pub fn rename(&mut self, old: &str, new: &str) -> Result<()> {
        check_name(new)?;
        self.existing(old)?;
        if self.collections.contains_key(new) {
            return Err(Error::new(ErrorKind::AlreadyExists, format!("collection {} already exists", new)));
        }
        let dir = self.dir.join(new);
        fs::rename(self.dir.join(old), &dir)?;

        if let Some(mut col) = self.collections.remove(old) {
            col.name = new.to_string();
            col.dir = dir;
            self.collections.insert(new.to_string(), col);
        }
        Ok(())
    }

    /// Remove every document and index entry, keeping the indexes themselves.
    pub fn truncate(&mut self, name: &str) -> Result<()> {
        let col = self.existing(name)?;
        remove_if_exists(&col.docs_path())?;
        for path in col.indexes() {
            fs::write(col.hash_table_path(path), b"")?;
        }
        Ok(())
    }

    pub fn drop(&mut self, name: &str) -> Result<()> {
        let col = self.existing(name)?;
        fs::remove_dir_all(&col.dir)?;
        self.collections.remove(name);
        Ok(())
    }

    pub fn build_index(&mut self, name: &str, path: &IndexPath) -> Result<()> {
        if path.is_empty() {
            return Err(Error::new(ErrorKind::InvalidArgument, "index path is empty".to_string()));
        }
        let col = self.existing_mut(name)?;
        if col.is_indexed(path) {
            return Err(Error::new(
                ErrorKind::AlreadyExists,
                format!("{} is already indexed in {}", path, name),
            ));
        }
        fs::write(col.hash_table_path(path), b"")?;
        col.meta.indexes.push(path.clone());
        col.save_meta()
    }

    pub fn remove_index(&mut self, name: &str, path: &IndexPath) -> Result<()> {
        let col = self.existing_mut(name)?;
        let pos = col
            .meta
            .indexes
            .iter()
            .position(|p| p.joined() == path.joined())
            .ok_or_else(|| Error::not_found(format!("{} is not indexed in {}", path, name)))?;
        col.meta.indexes.remove(pos);
        col.save_meta()?;
        remove_if_exists(&col.hash_table_path(path))
    }

    /// Copy every collection of this shard into `dest`.
    pub fn dump(&self, dest: &Path) -> Result<()> {
        fs::create_dir_all(dest)?;
        for col in self.collections.values() {
            copy_dir(&col.dir, &dest.join(&col.name))?;
        }
        Ok(())
    }
}

fn check_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(Error::new(ErrorKind::InvalidArgument, format!("invalid collection name {:?}", name)));
    }
    Ok(())
}

fn read_or_empty(path: &Path) -> Result<Vec<u8>> {
    match fs::read(path) {
        Ok(data) => Ok(data),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e.into()),
    }
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn copy_dir(src: &Path, dest: &Path) -> Result<()> {
    fs::create_dir_all(dest)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let target = dest.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), target)?;
        }
    }
    Ok(())
}
