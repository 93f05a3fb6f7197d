use async_trait::async_trait;

use crate::{PositionBatch, error::Result};

/// Durable key-value slot holding the serialized location collection.
#[async_trait]
pub trait LocationStorage: Send + Sync + 'static {
    /// Returns `None` when nothing has been persisted yet.
    async fn read(&self) -> Result<Option<Vec<u8>>>;
    async fn write(&self, data: Vec<u8>) -> Result<()>;
    async fn remove(&self) -> Result<()>;
}

/// Receives coalesced position updates, must not block.
pub trait LocationUpdateSink: Send + Sync + 'static {
    fn on_location_update(&self, batch: &PositionBatch);
}

impl LocationUpdateSink for tokio::sync::mpsc::UnboundedSender<PositionBatch> {
    fn on_location_update(&self, batch: &PositionBatch) {
        // A dropped receiver only means nobody is listening anymore.
        let _ = self.send(batch.clone());
    }
}
