//! Device identity tests

use signage_agent::filesys::dir::Dir;
use signage_agent::identity::serial::resolve_device_serial;
use signage_agent::storage::artifacts::{ArtifactStore, FsArtifactStore};

use crate::fakes::{FixedHardwareId, MemoryStore};

#[tokio::test]
async fn test_serial_is_derived_and_persisted() {
    let store = MemoryStore::new();
    let serial = resolve_device_serial(&store, &FixedHardwareId(Some("abc")))
        .await
        .unwrap();

    assert_eq!(serial, "ABC0-0000-0000-0000");
    assert_eq!(store.get_string("serialNumber.txt").as_deref(), Some("ABC0-0000-0000-0000"));
}

#[tokio::test]
async fn test_existing_serial_is_returned_verbatim() {
    let store = MemoryStore::new().with("serialNumber.txt", "legacy serial\n");
    let serial = resolve_device_serial(&store, &FixedHardwareId(Some("0123456789abcdef")))
        .await
        .unwrap();

    assert_eq!(serial, "legacy serial\n");
    assert_eq!(store.write_count(), 0);
}

#[tokio::test]
async fn test_missing_hardware_id_falls_back_to_timestamp() {
    let store = MemoryStore::new();
    let serial = resolve_device_serial(&store, &FixedHardwareId(None))
        .await
        .unwrap();

    assert!(serial.parse::<i64>().unwrap() > 1_600_000_000_000);
    assert_eq!(store.get_string("serialNumber.txt"), Some(serial));
}

#[tokio::test]
async fn test_write_failure_is_a_storage_error() {
    let store = MemoryStore::new();
    store.fail_writes(true);

    let result = resolve_device_serial(&store, &FixedHardwareId(Some("abc"))).await;
    assert!(matches!(
        result,
        Err(signage_agent::errors::AgentError::StorageError(_))
    ));
}

#[tokio::test]
async fn test_serial_survives_restart_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let root = Dir::new(dir.path().join("kiosk"));

    let first = {
        let store = FsArtifactStore::new(root.clone());
        resolve_device_serial(&store, &FixedHardwareId(Some("fedcba9876543210ffff")))
            .await
            .unwrap()
    };
    assert_eq!(first, "FEDC-BA98-7654-3210");

    let store = FsArtifactStore::new(root);
    let second = resolve_device_serial(&store, &FixedHardwareId(Some("different")))
        .await
        .unwrap();
    assert_eq!(second, first);
    assert!(store.exists("serialNumber.txt").await);
}
