use std::{sync::Arc, time::Duration};

use ais_stream::{
    connection::{ConnectionState, FakeTransport},
    models::PositionReport,
    startup::App,
    subscription::SubscriptionSet,
};
use chrono::{TimeZone, Utc};
use location_store::MemoryStorage;
use serde_json::json;
use tokio::{sync::mpsc, time::sleep};
use tracker_core::{LocationUpdateSink, NavigationStatus, PositionBatch, PositionSource};

use crate::helper::{mmsi, test, test_catalog, test_settings, vessel};

#[tokio::test(start_paused = true)]
async fn test_feed_positions_reach_sinks_and_store() {
    test(|mut helper| async move {
        assert!(helper.connection.wait_for_state(ConnectionState::Open).await);

        let report = PositionReport::test_new(40.5, -70.5);
        helper
            .transport
            .push_json(&report.to_feed_json("123456789", "2024-01-01 00:00:00.318353 +0000 UTC"));

        let batch = helper.updates.recv().await.unwrap();
        assert_eq!(batch.len(), 1);
        let position = &batch[&mmsi("123456789")];
        assert_eq!(position.lat, 40.5);
        assert_eq!(position.lon, -70.5);
        assert_eq!(position.speed, 12.5);
        assert_eq!(position.course, 10.0);
        assert_eq!(position.status, Some(NavigationStatus::UnderWayUsingEngine));
        assert_eq!(
            position.timestamp,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(position.source, PositionSource::Ais);

        sleep(Duration::from_secs(2)).await;

        assert_eq!(helper.storage.write_count(), 1);
        let stored = helper.store.get_location(&mmsi("123456789")).await.unwrap();
        assert_eq!(stored.as_ref(), Some(position));
        assert!(
            helper
                .storage
                .stored_positions()
                .iter()
                .any(|p| p == position)
        );
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn test_burst_for_one_vessel_is_delivered_once() {
    test(|mut helper| async move {
        assert!(helper.connection.wait_for_state(ConnectionState::Open).await);

        for i in 0..20 {
            let report = PositionReport::test_new(10.0 + i as f64, 20.0);
            helper
                .transport
                .push_json(&report.to_feed_json("259000420", "2024-01-01 00:00:00 +0000 UTC"));
        }

        let batch = helper.updates.recv().await.unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[&mmsi("259000420")].lat, 29.0);

        sleep(Duration::from_millis(500)).await;
        assert!(helper.updates.try_recv().is_err());
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn test_invalid_and_malformed_messages_are_dropped() {
    test(|mut helper| async move {
        assert!(helper.connection.wait_for_state(ConnectionState::Open).await);

        let invalid = PositionReport::test_new(91.0, 0.0);
        helper
            .transport
            .push_json(&invalid.to_feed_json("123456789", "2024-01-01 00:00:00 +0000 UTC"));
        helper.transport.push_text("this is not json");
        helper.transport.push_binary(vec![0xff, 0x00, 0xfe]);
        helper
            .transport
            .push_json(&json!({ "error": "Api Key Is Not Valid" }));

        let valid = PositionReport::test_new(59.9, 10.7);
        helper.transport.push_binary(
            valid
                .to_feed_json("259000420", "2024-01-01 00:00:00 +0000 UTC")
                .to_string()
                .into_bytes(),
        );

        let batch = helper.updates.recv().await.unwrap();
        assert_eq!(batch.len(), 1);
        assert!(batch.contains_key(&mmsi("259000420")));
        assert_eq!(helper.connection.state(), ConnectionState::Open);
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn test_positions_for_untracked_vessels_are_dropped() {
    test(|mut helper| async move {
        assert!(helper.connection.wait_for_state(ConnectionState::Open).await);

        let report = PositionReport::test_new(55.0, 12.0);
        helper
            .transport
            .push_json(&report.to_feed_json("999999999", "2024-01-01 00:00:00 +0000 UTC"));
        helper
            .transport
            .push_json(&report.to_feed_json("259000420", "2024-01-01 00:00:00 +0000 UTC"));

        let batch = helper.updates.recv().await.unwrap();
        assert_eq!(batch.len(), 1);
        assert!(batch.contains_key(&mmsi("259000420")));

        sleep(Duration::from_secs(2)).await;
        assert!(helper.updates.try_recv().is_err());
        assert!(
            helper
                .store
                .get_location(&mmsi("999999999"))
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            helper
                .storage
                .stored_positions()
                .iter()
                .all(|p| p.mmsi != mmsi("999999999"))
        );
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn test_vessel_set_update_changes_accepted_vessels() {
    test(|mut helper| async move {
        assert!(helper.connection.wait_for_state(ConnectionState::Open).await);

        let vessels = SubscriptionSet::from_catalog(&[vessel("999999999", "Aurora", None, None)]);
        assert!(helper.connection.update_vessels(vessels));
        sleep(Duration::from_millis(10)).await;

        let report = PositionReport::test_new(55.0, 12.0);
        helper
            .transport
            .push_json(&report.to_feed_json("259000420", "2024-01-01 00:00:00 +0000 UTC"));
        helper
            .transport
            .push_json(&report.to_feed_json("999999999", "2024-01-01 00:00:00 +0000 UTC"));

        let batch = helper.updates.recv().await.unwrap();
        assert_eq!(batch.len(), 1);
        assert!(batch.contains_key(&mmsi("999999999")));
        assert!(helper.connection.vessels().contains(&mmsi("999999999")));

        let status = helper.vessel_log.status();
        assert_eq!(status.len(), 1);
        assert_eq!(status[0].name, "Aurora");
        assert_eq!(status[0].stats.updates, 1);
        assert_eq!(helper.vessel_log.stats(&mmsi("259000420")).updates, 0);
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn test_tracking_status_is_reported_while_running() {
    test(|helper| async move {
        assert!(helper.connection.wait_for_state(ConnectionState::Open).await);
        assert_eq!(helper.vessel_log.status_reports(), 0);

        sleep(Duration::from_secs(61)).await;
        assert_eq!(helper.vessel_log.status_reports(), 1);

        let status = helper.vessel_log.status();
        assert_eq!(status.len(), 2);
        assert!(status.iter().all(|s| s.stats.last_update.is_none()));
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn test_catalog_locations_seed_the_store() {
    test(|helper| async move {
        helper.store.wait_for_initialization().await.unwrap();

        let seeded = helper
            .store
            .get_location(&mmsi("123456789"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(seeded.lat, 40.0);
        assert_eq!(seeded.lon, -70.0);
        assert_eq!(seeded.status, Some(NavigationStatus::Moored));
        assert_eq!(seeded.source, PositionSource::Manual);
        assert_eq!(
            seeded.timestamp,
            Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()
        );

        assert!(
            helper
                .store
                .get_location(&mmsi("259000420"))
                .await
                .unwrap()
                .is_none()
        );
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_flushes_pending_state() {
    let transport = FakeTransport::new();
    let storage = MemoryStorage::new();
    let (updates_tx, mut updates) = mpsc::unbounded_channel::<PositionBatch>();

    let sinks: Vec<Arc<dyn LocationUpdateSink>> = vec![Arc::new(updates_tx)];
    let app = App::with_parts(
        &test_settings(),
        transport.clone(),
        storage.clone(),
        &test_catalog(),
        sinks,
    );
    let connection = app.connection();
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let app = tokio::spawn(app.run(async move {
        let _ = shutdown_rx.await;
    }));

    assert!(connection.wait_for_state(ConnectionState::Open).await);
    let report = PositionReport::test_new(1.0, 2.0);
    transport.push_json(&report.to_feed_json("259000420", "2024-01-01 00:00:00 +0000 UTC"));
    updates.recv().await.unwrap();
    assert_eq!(storage.write_count(), 0);

    shutdown_tx.send(()).unwrap();
    app.await.unwrap();

    assert_eq!(storage.write_count(), 1);
    assert_eq!(storage.stored_positions().len(), 2);
    assert_eq!(transport.close_codes(), vec![1000]);
    assert_eq!(connection.state(), ConnectionState::Idle);
}
