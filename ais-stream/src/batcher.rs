use std::{sync::Arc, time::Duration};

use tokio::sync::mpsc;
use tracing::{debug, instrument};
use tracker_core::{LocationUpdateSink, Mmsi, Position, PositionBatch, Timer};

pub const DEFAULT_BATCH_WINDOW: Duration = Duration::from_millis(100);

/// Coalesces position updates per vessel and delivers them to every sink
/// at most one window after the first pending update arrived.
pub struct UpdateBatcher {
    window: Duration,
    pending: PositionBatch,
    flush: Timer,
    updates: mpsc::UnboundedReceiver<(Mmsi, Position)>,
    sinks: Vec<Arc<dyn LocationUpdateSink>>,
}

#[derive(Debug, Clone)]
pub struct BatcherHandle {
    updates: mpsc::UnboundedSender<(Mmsi, Position)>,
}

impl BatcherHandle {
    /// Returns false if the batcher has stopped.
    pub fn push(&self, mmsi: Mmsi, position: Position) -> bool {
        self.updates.send((mmsi, position)).is_ok()
    }
}

impl UpdateBatcher {
    pub fn new(
        window: Duration,
        sinks: Vec<Arc<dyn LocationUpdateSink>>,
    ) -> (UpdateBatcher, BatcherHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            UpdateBatcher {
                window,
                pending: PositionBatch::new(),
                flush: Timer::new(),
                updates: rx,
                sinks,
            },
            BatcherHandle { updates: tx },
        )
    }

    /// Runs until every handle is dropped, flushing what is still pending.
    #[instrument(skip_all)]
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                update = self.updates.recv() => match update {
                    Some((mmsi, position)) => self.enqueue(mmsi, position),
                    None => break,
                },
                _ = self.flush.fired() => self.flush_pending(),
            }
        }
        self.flush_pending();
        debug!("update batcher stopped");
    }

    fn enqueue(&mut self, mmsi: Mmsi, position: Position) {
        self.pending.insert(mmsi, position);
        self.flush.schedule_if_idle(self.window);
    }

    fn flush_pending(&mut self) {
        self.flush.cancel();
        if self.pending.is_empty() {
            return;
        }

        let batch = std::mem::take(&mut self.pending);
        debug!(num_positions = batch.len(), "flushing position batch");
        for sink in &self.sinks {
            sink.on_location_update(&batch);
        }
    }
}
