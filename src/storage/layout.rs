use std::path::{Path, PathBuf};
use std::fs;
use tracing::warn;
use crate::core::error::{Error, ErrorKind, Result};

const SHARD_COUNT_FILE: &str = "shards";

/// Directory structure of a sharded workspace
#[derive(Debug, Clone)]
pub struct WorkspaceLayout {
    pub root: PathBuf,         // Workspace root
    pub shard_count: usize,    // Fixed when the workspace is created
}

impl WorkspaceLayout {
    /// Open an existing workspace, or create one with `shard_count` shards.
    pub fn create_or_open(root: impl Into<PathBuf>, shard_count: usize) -> Result<Self> {
        let root = root.into();
        if root.join(SHARD_COUNT_FILE).exists() {
            let layout = Self::open(root)?;
            if layout.shard_count != shard_count {
                warn!(
                    recorded = layout.shard_count,
                    requested = shard_count,
                    "workspace already exists, keeping its recorded shard count"
                );
            }
            return Ok(layout);
        }

        if shard_count == 0 {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                "a workspace needs at least one shard".to_string(),
            ));
        }

        fs::create_dir_all(&root)?;
        let layout = WorkspaceLayout { root, shard_count };
        for shard in 0..shard_count {
            fs::create_dir_all(layout.shard_dir(shard))?;
        }
        fs::write(layout.root.join(SHARD_COUNT_FILE), shard_count.to_string())?;

        Ok(layout)
    }

    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let count_path = root.join(SHARD_COUNT_FILE);
        if !count_path.exists() {
            return Err(Error::not_found(format!(
                "{} is not a workspace (missing {})",
                root.display(),
                SHARD_COUNT_FILE
            )));
        }

        let shard_count = fs::read_to_string(&count_path)?
            .trim()
            .parse::<usize>()
            .map_err(|e| Error::new(ErrorKind::Parse, format!("bad shard count: {}", e)))?;
        if shard_count == 0 {
            return Err(Error::new(ErrorKind::Corrupted, "workspace records zero shards".to_string()));
        }

        Ok(WorkspaceLayout { root, shard_count })
    }

    pub fn shard_dir(&self, shard: usize) -> PathBuf {
        self.root.join(shard.to_string())
    }

    pub fn shards(&self) -> std::ops::Range<usize> {
        0..self.shard_count
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorded_shard_count_wins_on_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let created = WorkspaceLayout::create_or_open(dir.path(), 3).unwrap();
        assert!(created.shard_dir(2).is_dir());

        let reopened = WorkspaceLayout::create_or_open(dir.path(), 8).unwrap();
        assert_eq!(reopened.shard_count, 3);
        assert!(!reopened.shard_dir(3).exists());
    }

    #[test]
    fn open_rejects_plain_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = WorkspaceLayout::open(dir.path()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }
}
