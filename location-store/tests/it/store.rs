use std::time::Duration;

use location_store::{FileStorage, LocationStore, MemoryStorage, load_all};
use tracker_core::{LocationStorage, LocationUpdateSink, Position, PositionBatch};

use crate::helper::{mmsi, position_at, test, test_with_storage};

#[tokio::test(start_paused = true)]
async fn test_mutations_within_window_result_in_one_write_of_final_state() {
    test(|helper| async move {
        for i in 0..10 {
            let position = Position::test_new("259000420", 60.0 + i as f64 * 0.01, 5.0);
            helper.store.upsert(mmsi("259000420"), position).unwrap();
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert_eq!(helper.storage.write_count(), 0);

        helper.wait_for_write().await;

        assert_eq!(helper.storage.write_count(), 1);
        let stored = helper.storage.stored_positions();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].lat, 60.0 + 9.0 * 0.01);
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn test_window_is_measured_from_first_mutation() {
    test(|helper| async move {
        helper
            .store
            .upsert(mmsi("1"), Position::test_new("1", 1.0, 1.0))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(1000)).await;
        helper
            .store
            .upsert(mmsi("2"), Position::test_new("2", 2.0, 2.0))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(600)).await;

        assert_eq!(helper.storage.write_count(), 1);
        assert_eq!(helper.storage.stored_positions().len(), 2);
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn test_invalid_coordinates_are_rejected_without_write() {
    test(|helper| async move {
        let invalid = Position::test_new("259000420", 91.0, 5.0);
        assert!(helper.store.upsert(mmsi("259000420"), invalid).is_err());

        let invalid = Position::test_new("259000420", 60.0, 180.5);
        assert!(helper.store.upsert(mmsi("259000420"), invalid).is_err());

        helper.wait_for_write().await;

        assert_eq!(helper.storage.write_attempts(), 0);
        assert!(helper.store.get_locations().await.unwrap().is_empty());
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn test_load_after_debounced_write_equals_memory_state() {
    test(|helper| async move {
        for (i, id) in ["111", "222", "333"].into_iter().enumerate() {
            let position = Position::test_new(id, 10.0 * i as f64, -20.0 * i as f64);
            helper.store.upsert(mmsi(id), position).unwrap();
        }
        helper.wait_for_write().await;

        let in_memory = helper.store.get_locations().await.unwrap();
        let loaded = load_all(&helper.storage).await;

        assert_eq!(in_memory.len(), 3);
        assert_eq!(in_memory, loaded);
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn test_empty_storage_loads_as_empty() {
    test(|helper| async move {
        assert!(helper.store.is_initialized());
        assert!(helper.store.get_locations().await.unwrap().is_empty());
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn test_corrupt_storage_loads_as_empty() {
    let storage = MemoryStorage::with_contents("[{\"mmsi\": 12, \"lat\": ");
    test_with_storage(storage, |helper| async move {
        assert!(helper.store.get_locations().await.unwrap().is_empty());
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn test_previously_stored_locations_are_served_on_startup() {
    let storage = MemoryStorage::new();
    let position = position_at("259000420", 60.0, 5.0, 2024);
    storage
        .write(serde_json::to_vec(&vec![position.clone()]).unwrap())
        .await
        .unwrap();

    test_with_storage(storage, |helper| async move {
        let stored = helper.store.get_location(&mmsi("259000420")).await.unwrap();
        assert_eq!(stored, Some(position));
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn test_seed_only_replaces_missing_or_older_entries() {
    test(|helper| async move {
        helper
            .store
            .upsert(mmsi("111"), position_at("111", 1.0, 1.0, 2024))
            .unwrap();
        helper
            .store
            .upsert(mmsi("222"), position_at("222", 2.0, 2.0, 2020))
            .unwrap();

        helper
            .store
            .seed(vec![
                position_at("111", 10.0, 10.0, 2022),
                position_at("222", 20.0, 20.0, 2022),
                position_at("333", 30.0, 30.0, 2022),
            ])
            .unwrap();

        let locations = helper.store.get_locations().await.unwrap();
        assert_eq!(locations[&mmsi("111")].lat, 1.0);
        assert_eq!(locations[&mmsi("222")].lat, 20.0);
        assert_eq!(locations[&mmsi("333")].lat, 30.0);
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn test_reset_clears_memory_and_storage() {
    test(|helper| async move {
        helper
            .store
            .upsert(mmsi("111"), Position::test_new("111", 1.0, 1.0))
            .unwrap();
        helper.wait_for_write().await;
        assert!(helper.storage.contents().is_some());

        helper.store.reset().await.unwrap();

        assert!(helper.storage.contents().is_none());
        assert!(helper.store.get_locations().await.unwrap().is_empty());
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn test_flush_writes_pending_snapshot_immediately() {
    test(|helper| async move {
        helper
            .store
            .upsert(mmsi("111"), Position::test_new("111", 1.0, 1.0))
            .unwrap();
        helper.store.flush().await.unwrap();

        assert_eq!(helper.storage.write_count(), 1);

        helper.wait_for_write().await;
        assert_eq!(helper.storage.write_count(), 1);
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn test_failed_write_is_rearmed_by_next_mutation() {
    test(|helper| async move {
        helper.storage.set_fail_writes(true);
        helper
            .store
            .upsert(mmsi("111"), Position::test_new("111", 1.0, 1.0))
            .unwrap();
        helper.wait_for_write().await;

        assert_eq!(helper.storage.write_attempts(), 1);
        assert_eq!(helper.storage.write_count(), 0);

        helper.storage.set_fail_writes(false);
        helper
            .store
            .upsert(mmsi("222"), Position::test_new("222", 2.0, 2.0))
            .unwrap();
        helper.wait_for_write().await;

        assert_eq!(helper.storage.write_count(), 1);
        assert_eq!(helper.storage.stored_positions().len(), 2);
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn test_pending_write_is_persisted_when_last_handle_drops() {
    test(|helper| async move {
        helper
            .store
            .upsert(mmsi("111"), Position::test_new("111", 1.0, 1.0))
            .unwrap();

        let storage = helper.shutdown().await;
        assert_eq!(storage.write_count(), 1);
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn test_store_accepts_batches_as_update_sink() {
    test(|helper| async move {
        let mut batch = PositionBatch::new();
        batch.insert(mmsi("111"), Position::test_new("111", 1.0, 1.0));
        batch.insert(mmsi("222"), Position::test_new("222", 100.0, 1.0));

        helper.store.on_location_update(&batch);

        let locations = helper.store.get_locations().await.unwrap();
        assert_eq!(locations.len(), 1);
        assert!(locations.contains_key(&mmsi("111")));
    })
    .await;
}

#[tokio::test]
async fn test_file_storage_round_trip() {
    let directory = std::env::temp_dir().join(format!("location-store-{}", rand::random::<u64>()));
    let storage = FileStorage::new(&directory);
    assert_eq!(storage.read().await.unwrap(), None);

    let (store, worker) = LocationStore::spawn(storage.clone(), Duration::from_millis(10));
    store.wait_for_initialization().await.unwrap();
    store
        .upsert(mmsi("259000420"), position_at("259000420", 60.0, 5.0, 2024))
        .unwrap();
    store.flush().await.unwrap();
    let in_memory = store.get_locations().await.unwrap();
    drop(store);
    worker.await.unwrap();

    assert!(storage.path().ends_with("yacht_locations.json"));
    assert_eq!(load_all(&storage).await, in_memory);

    storage.remove().await.unwrap();
    assert_eq!(storage.read().await.unwrap(), None);
    let _ = std::fs::remove_dir_all(&directory);
}
