use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use snafu::ResultExt;
use tracker_core::{LocationStorage, Position, Result, error::error::StorageSnafu};

/// In-memory storage that records how often it was written.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<Mutex<MemoryInner>>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    data: Option<Vec<u8>>,
    write_attempts: usize,
    writes: usize,
    fail_writes: bool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contents(data: impl Into<Vec<u8>>) -> Self {
        let storage = Self::default();
        storage.inner.lock().unwrap().data = Some(data.into());
        storage
    }

    pub fn contents(&self) -> Option<Vec<u8>> {
        self.inner.lock().unwrap().data.clone()
    }

    pub fn stored_positions(&self) -> Vec<Position> {
        self.contents()
            .map(|d| serde_json::from_slice(&d).unwrap())
            .unwrap_or_default()
    }

    /// Number of successful writes.
    pub fn write_count(&self) -> usize {
        self.inner.lock().unwrap().writes
    }

    pub fn write_attempts(&self) -> usize {
        self.inner.lock().unwrap().write_attempts
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.lock().unwrap().fail_writes = fail;
    }
}

#[async_trait]
impl LocationStorage for MemoryStorage {
    async fn read(&self) -> Result<Option<Vec<u8>>> {
        Ok(self.contents())
    }

    async fn write(&self, data: Vec<u8>) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.write_attempts += 1;
        if inner.fail_writes {
            return Err(std::io::Error::other("simulated write failure")).context(StorageSnafu {
                path: "memory",
            });
        }
        inner.writes += 1;
        inner.data = Some(data);
        Ok(())
    }

    async fn remove(&self) -> Result<()> {
        self.inner.lock().unwrap().data = None;
        Ok(())
    }
}
