use std::{future::Future, sync::Arc, time::Duration};

use location_store::{FileStorage, LocationStore};
use tokio::sync::{mpsc, watch};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{error, info, instrument};
use tracker_core::{LocationStorage, LocationUpdateSink};

use crate::{
    batcher::UpdateBatcher,
    catalog::{CatalogVessel, catalog_positions, read_catalog},
    connection::{AisStreamTransport, ConnectionHandle, ConnectionManager, FeedTransport},
    error::Result,
    lifecycle::{AppState, LifecycleWatcher},
    settings::Settings,
    subscription::SubscriptionSet,
    vessel_log::VesselLog,
};

pub struct App<T = AisStreamTransport> {
    connection: ConnectionManager<T>,
    connection_handle: ConnectionHandle,
    batcher: UpdateBatcher,
    store: LocationStore,
    vessel_log: Arc<VesselLog>,
    status_interval: Duration,
    lifecycle: mpsc::UnboundedSender<AppState>,
    lifecycle_events: mpsc::UnboundedReceiver<AppState>,
}

impl App<AisStreamTransport> {
    pub async fn build(settings: &Settings) -> Result<App<AisStreamTransport>> {
        let transport = AisStreamTransport::new(&settings.stream.url)?;
        let storage = FileStorage::new(&settings.location_store.directory);

        let catalog = match &settings.catalog_path {
            Some(path) => read_catalog(path)?,
            None => vec![],
        };
        info!(num_vessels = catalog.len(), "read vessel catalog");

        Ok(App::with_parts(settings, transport, storage, &catalog, vec![]))
    }
}

impl<T: FeedTransport> App<T> {
    /// Wires the pipeline. The vessel log is always the first sink and the
    /// store the last, with `sinks` delivered to in between.
    pub fn with_parts<S: LocationStorage>(
        settings: &Settings,
        transport: T,
        storage: S,
        catalog: &[CatalogVessel],
        mut sinks: Vec<Arc<dyn LocationUpdateSink>>,
    ) -> App<T> {
        // The worker exits on its own once every store handle is dropped.
        let (store, _worker) = LocationStore::spawn(storage, settings.location_store.write_debounce);
        if let Err(e) = store.seed(catalog_positions(catalog)) {
            error!("failed to seed catalog locations: {e:?}");
        }
        let (vessels, vessels_rx) = watch::channel(SubscriptionSet::from_catalog(catalog));
        let vessel_log = Arc::new(VesselLog::new(vessels_rx));
        sinks.insert(0, vessel_log.clone());
        sinks.push(Arc::new(store.clone()));

        let (batcher, batcher_handle) = UpdateBatcher::new(settings.batch_window, sinks);
        let (connection, connection_handle) = ConnectionManager::new(
            transport,
            settings.connection.clone(),
            settings.stream.clone(),
            vessels,
            batcher_handle,
        );
        let (lifecycle, lifecycle_events) = mpsc::unbounded_channel();

        App {
            connection,
            connection_handle,
            batcher,
            store,
            vessel_log,
            status_interval: settings.status_interval,
            lifecycle,
            lifecycle_events,
        }
    }

    pub fn connection(&self) -> ConnectionHandle {
        self.connection_handle.clone()
    }

    pub fn store(&self) -> LocationStore {
        self.store.clone()
    }

    pub fn vessel_log(&self) -> Arc<VesselLog> {
        self.vessel_log.clone()
    }

    /// Host app state changes, a resume forces a reconnect.
    pub fn lifecycle(&self) -> mpsc::UnboundedSender<AppState> {
        self.lifecycle.clone()
    }

    /// Runs the pipeline until `shutdown` resolves, then closes the connection,
    /// drains the batcher and flushes the store.
    #[instrument(skip_all)]
    pub async fn run(self, shutdown: impl Future<Output = ()>) {
        let App {
            connection,
            connection_handle,
            batcher,
            store,
            vessel_log,
            status_interval,
            lifecycle,
            lifecycle_events,
        } = self;
        drop(lifecycle);

        if let Err(e) = store.wait_for_initialization().await {
            error!("location store failed to initialize: {e:?}");
        }

        let batcher_task = tokio::spawn(batcher.run());
        let status_task = tokio::spawn(vessel_log.report_status(status_interval));
        let lifecycle_task = tokio::spawn(LifecycleWatcher::new(AppState::Active).run(
            UnboundedReceiverStream::new(lifecycle_events),
            connection_handle.clone(),
        ));

        connection_handle.connect();
        let connection_task = tokio::spawn(connection.run());

        shutdown.await;
        info!("shutting down");

        connection_handle.cleanup();
        if let Err(e) = connection_task.await {
            error!("connection manager exited abnormally: {e:?}");
        }
        lifecycle_task.abort();
        status_task.abort();

        // The batcher stops once the connection manager drops its handle.
        if let Err(e) = batcher_task.await {
            error!("update batcher exited abnormally: {e:?}");
        }
        if let Err(e) = store.flush().await {
            error!("failed to flush locations: {e:?}");
        }
    }
}
