use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use snafu::ResultExt;
use tracker_core::{LocationStorage, Result, error::error::StorageSnafu};

use crate::STORAGE_KEY;

/// Stores the location snapshot as `<directory>/yacht_locations.json`.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(directory: impl AsRef<Path>) -> Self {
        Self {
            path: directory.as_ref().join(format!("{STORAGE_KEY}.json")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn path_context(&self) -> StorageSnafu<String> {
        StorageSnafu {
            path: self.path.display().to_string(),
        }
    }
}

#[async_trait]
impl LocationStorage for FileStorage {
    async fn read(&self) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(&self.path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).context(self.path_context()),
        }
    }

    async fn write(&self, data: Vec<u8>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context(self.path_context())?;
        }

        // Replace atomically so a crash mid-write never leaves a truncated snapshot.
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, data)
            .await
            .context(self.path_context())?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .context(self.path_context())
    }

    async fn remove(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).context(self.path_context()),
        }
    }
}
