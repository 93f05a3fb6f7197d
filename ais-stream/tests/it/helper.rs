use std::{future::Future, path::PathBuf, sync::Arc};

use ais_stream::{
    batcher::DEFAULT_BATCH_WINDOW,
    catalog::CatalogVessel,
    connection::{ConnectionHandle, ConnectionSettings, FakeTransport},
    lifecycle::AppState,
    models::GLOBAL_BOUNDING_BOX,
    settings::{DEFAULT_STREAM_URL, LocationStoreSettings, Settings, StreamSettings},
    startup::App,
    vessel_log::{DEFAULT_STATUS_INTERVAL, VesselLog},
};
use location_store::{DEFAULT_WRITE_DEBOUNCE, LocationStore, MemoryStorage};
use tokio::sync::{mpsc, oneshot};
use tracker_core::{Environment, LocationUpdateSink, LogLevel, Mmsi, PositionBatch};

pub const TEST_API_KEY: &str = "test-key";

pub struct TestHelper {
    pub transport: FakeTransport,
    pub storage: MemoryStorage,
    pub connection: ConnectionHandle,
    pub store: LocationStore,
    pub updates: mpsc::UnboundedReceiver<PositionBatch>,
    pub vessel_log: Arc<VesselLog>,
    pub lifecycle: mpsc::UnboundedSender<AppState>,
}

pub fn test_settings() -> Settings {
    Settings {
        log_level: LogLevel::Debug,
        environment: Environment::Test,
        stream: StreamSettings {
            url: DEFAULT_STREAM_URL.to_owned(),
            api_key: TEST_API_KEY.to_owned(),
            bounding_boxes: vec![GLOBAL_BOUNDING_BOX],
            subscription_batch_size: 50,
        },
        connection: ConnectionSettings::default(),
        batch_window: DEFAULT_BATCH_WINDOW,
        status_interval: DEFAULT_STATUS_INTERVAL,
        location_store: LocationStoreSettings {
            directory: PathBuf::from("unused"),
            write_debounce: DEFAULT_WRITE_DEBOUNCE,
        },
        catalog_path: None,
    }
}

pub fn vessel(mmsi: &str, name: &str, location: Option<&str>, delivered: Option<&str>) -> CatalogVessel {
    CatalogVessel {
        mmsi: mmsi.to_owned(),
        name: name.to_owned(),
        location: location.map(String::from),
        delivered: delivered.map(String::from),
    }
}

pub fn test_catalog() -> Vec<CatalogVessel> {
    vec![
        vessel("123456789", "Sea Breeze", Some("40.0,-70.0"), Some("2020")),
        vessel("259000420", "Nordlys", None, Some("2018")),
        vessel("TBA", "Project 1010", None, None),
    ]
}

pub fn mmsi(value: &str) -> Mmsi {
    value.parse().unwrap()
}

pub async fn test<T, Fut>(test_closure: T)
where
    T: FnOnce(TestHelper) -> Fut,
    Fut: Future<Output = ()>,
{
    test_with(FakeTransport::new(), test_catalog(), test_closure).await
}

pub async fn test_with<T, Fut>(transport: FakeTransport, catalog: Vec<CatalogVessel>, test_closure: T)
where
    T: FnOnce(TestHelper) -> Fut,
    Fut: Future<Output = ()>,
{
    let storage = MemoryStorage::new();
    let (updates_tx, updates) = mpsc::unbounded_channel::<PositionBatch>();

    let sinks: Vec<Arc<dyn LocationUpdateSink>> = vec![Arc::new(updates_tx)];
    let app = App::with_parts(
        &test_settings(),
        transport.clone(),
        storage.clone(),
        &catalog,
        sinks,
    );

    let helper = TestHelper {
        transport,
        storage,
        connection: app.connection(),
        store: app.store(),
        updates,
        vessel_log: app.vessel_log(),
        lifecycle: app.lifecycle(),
    };

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let app = tokio::spawn(app.run(async move {
        let _ = shutdown_rx.await;
    }));

    test_closure(helper).await;

    let _ = shutdown_tx.send(());
    app.await.unwrap();
}
