use std::{collections::HashMap, time::Duration};

use snafu::ResultExt;
use tokio::{
    sync::{mpsc, oneshot, watch},
    task::JoinHandle,
};
use tracing::{debug, error, info, instrument, warn};
use tracker_core::{LocationStorage, LocationUpdateSink, Mmsi, Position, PositionBatch, Timer};

use crate::error::{
    Result,
    error::{InvalidPositionSnafu, StoreClosedSnafu},
};

pub const STORAGE_KEY: &str = "yacht_locations";
pub const DEFAULT_WRITE_DEBOUNCE: Duration = Duration::from_millis(1500);

enum Command {
    Upsert(Position),
    Seed(Vec<Position>),
    Get {
        mmsi: Mmsi,
        reply: oneshot::Sender<Option<Position>>,
    },
    Snapshot(oneshot::Sender<HashMap<Mmsi, Position>>),
    Flush(oneshot::Sender<()>),
    Reset(oneshot::Sender<()>),
}

/// Handle to the location store worker, cheap to clone.
#[derive(Debug, Clone)]
pub struct LocationStore {
    commands: mpsc::UnboundedSender<Command>,
    initialized: watch::Receiver<bool>,
}

struct StoreWorker<S> {
    storage: S,
    locations: HashMap<Mmsi, Position>,
    pending_write: Timer,
    write_debounce: Duration,
    commands: mpsc::UnboundedReceiver<Command>,
    initialized: watch::Sender<bool>,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Upsert(p) => write!(f, "Upsert({})", p.mmsi),
            Command::Seed(p) => write!(f, "Seed({})", p.len()),
            Command::Get { mmsi, .. } => write!(f, "Get({mmsi})"),
            Command::Snapshot(_) => f.write_str("Snapshot"),
            Command::Flush(_) => f.write_str("Flush"),
            Command::Reset(_) => f.write_str("Reset"),
        }
    }
}

impl LocationStore {
    /// Spawns the worker, which loads the persisted snapshot before serving
    /// any command. The worker exits once every handle is dropped, persisting
    /// a pending write first.
    pub fn spawn<S: LocationStorage>(
        storage: S,
        write_debounce: Duration,
    ) -> (LocationStore, JoinHandle<()>) {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (initialized_tx, initialized_rx) = watch::channel(false);

        let worker = StoreWorker {
            storage,
            locations: HashMap::new(),
            pending_write: Timer::new(),
            write_debounce,
            commands: commands_rx,
            initialized: initialized_tx,
        };

        let handle = tokio::spawn(worker.run());

        (
            LocationStore {
                commands: commands_tx,
                initialized: initialized_rx,
            },
            handle,
        )
    }

    /// Rejects positions with invalid coordinates without touching the store.
    pub fn upsert(&self, mmsi: Mmsi, mut position: Position) -> Result<()> {
        position.validate().context(InvalidPositionSnafu {
            mmsi: mmsi.as_str(),
        })?;
        position.mmsi = mmsi;
        self.send(Command::Upsert(position))
    }

    /// Stores each position only when the vessel is unknown or its stored
    /// position is older.
    pub fn seed(&self, positions: Vec<Position>) -> Result<()> {
        if positions.is_empty() {
            return Ok(());
        }
        self.send(Command::Seed(positions))
    }

    pub async fn get_locations(&self) -> Result<HashMap<Mmsi, Position>> {
        self.request(Command::Snapshot).await
    }

    pub async fn get_location(&self, mmsi: &Mmsi) -> Result<Option<Position>> {
        self.request(|reply| Command::Get {
            mmsi: mmsi.clone(),
            reply,
        })
        .await
    }

    /// Persists a pending snapshot immediately.
    pub async fn flush(&self) -> Result<()> {
        self.request(Command::Flush).await
    }

    /// Clears both memory and durable storage.
    pub async fn reset(&self) -> Result<()> {
        self.request(Command::Reset).await
    }

    pub fn is_initialized(&self) -> bool {
        *self.initialized.borrow()
    }

    pub async fn wait_for_initialization(&self) -> Result<()> {
        let mut initialized = self.initialized.clone();
        if initialized.wait_for(|done| *done).await.is_err() {
            return StoreClosedSnafu.fail();
        }
        Ok(())
    }

    fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| StoreClosedSnafu.build())
    }

    async fn request<T>(&self, command: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.send(command(tx))?;
        rx.await.map_err(|_| StoreClosedSnafu.build())
    }
}

impl LocationUpdateSink for LocationStore {
    fn on_location_update(&self, batch: &PositionBatch) {
        for (mmsi, position) in batch {
            if let Err(e) = self.upsert(mmsi.clone(), position.clone()) {
                warn!("failed to store location update: {e:?}");
            }
        }
    }
}

impl<S: LocationStorage> StoreWorker<S> {
    #[instrument(skip_all)]
    async fn run(mut self) {
        self.locations = load_all(&self.storage).await;
        info!(num_locations = self.locations.len(), "loaded stored locations");
        self.initialized.send_replace(true);

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.handle(command).await,
                    None => break,
                },
                _ = self.pending_write.fired() => self.persist().await,
            }
        }

        if self.pending_write.cancel() {
            self.persist().await;
        }
        debug!("location store worker stopped");
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::Upsert(position) => {
                self.locations.insert(position.mmsi.clone(), position);
                self.schedule_write();
            }
            Command::Seed(positions) => {
                let num_seeded = positions
                    .into_iter()
                    .filter(|p| self.seed_one(p))
                    .count();
                if num_seeded > 0 {
                    debug!(num_seeded, "seeded locations");
                    self.schedule_write();
                }
            }
            Command::Get { mmsi, reply } => {
                let _ = reply.send(self.locations.get(&mmsi).cloned());
            }
            Command::Snapshot(reply) => {
                let _ = reply.send(self.locations.clone());
            }
            Command::Flush(reply) => {
                if self.pending_write.cancel() {
                    self.persist().await;
                }
                let _ = reply.send(());
            }
            Command::Reset(reply) => {
                self.locations.clear();
                self.pending_write.cancel();
                if let Err(e) = self.storage.remove().await {
                    error!("failed to remove stored locations: {e:?}");
                }
                info!("location store reset");
                let _ = reply.send(());
            }
        }
    }

    fn seed_one(&mut self, position: &Position) -> bool {
        if let Err(e) = position.validate() {
            warn!(mmsi = %position.mmsi, "skipping seed position: {e}");
            return false;
        }
        match self.locations.get(&position.mmsi) {
            Some(existing) if existing.timestamp >= position.timestamp => false,
            _ => {
                self.locations
                    .insert(position.mmsi.clone(), position.clone());
                true
            }
        }
    }

    fn schedule_write(&mut self) {
        self.pending_write.schedule_if_idle(self.write_debounce);
    }

    async fn persist(&mut self) {
        let records: Vec<&Position> = self.locations.values().collect();
        let data = match serde_json::to_vec(&records) {
            Ok(data) => data,
            Err(e) => {
                error!("failed to serialize locations: {e:?}");
                return;
            }
        };

        match self.storage.write(data).await {
            Ok(()) => debug!(num_locations = records.len(), "persisted locations"),
            Err(e) => error!("failed to persist locations: {e:?}"),
        }
    }
}

/// Reads the persisted collection, tolerating a missing or corrupt snapshot.
pub async fn load_all<S: LocationStorage + ?Sized>(storage: &S) -> HashMap<Mmsi, Position> {
    match storage.read().await {
        Ok(Some(data)) => parse_locations(&data),
        Ok(None) => HashMap::new(),
        Err(e) => {
            error!("failed to read stored locations: {e:?}");
            HashMap::new()
        }
    }
}

/// Malformed records and records with invalid coordinates are skipped,
/// later duplicates overwrite earlier ones.
pub fn parse_locations(data: &[u8]) -> HashMap<Mmsi, Position> {
    let records: Vec<serde_json::Value> = match serde_json::from_slice(data) {
        Ok(records) => records,
        Err(e) => {
            warn!("stored locations are corrupt, starting empty: {e}");
            return HashMap::new();
        }
    };

    let mut locations = HashMap::with_capacity(records.len());
    for record in records {
        match serde_json::from_value::<Position>(record) {
            Ok(position) => match position.validate() {
                Ok(()) => {
                    locations.insert(position.mmsi.clone(), position);
                }
                Err(e) => warn!(mmsi = %position.mmsi, "skipping stored location: {e}"),
            },
            Err(e) => warn!("skipping malformed stored location: {e}"),
        }
    }
    locations
}
