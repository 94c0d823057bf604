use claims_portal::reminders::{
    FileStore, KeyValueStore, ReminderKind, ReminderStore, newest_first,
};
use std::fs;
use tempfile::tempdir;

#[test]
fn reminders_survive_a_new_store_instance() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("data").join("reminders.json");

    let first_id = {
        let storage = FileStore::new(&path);
        let follow_ups = ReminderStore::new(&storage, ReminderKind::FollowUps);
        let first = follow_ups.add("  Call Jane about the supplement  ").unwrap();
        follow_ups.add("Send John the contract").unwrap();
        ReminderStore::new(&storage, ReminderKind::Updates)
            .add("Roof crew starts Monday")
            .unwrap();
        first.id
    };

    assert!(path.exists());

    let storage = FileStore::new(&path);
    let follow_ups = ReminderStore::new(&storage, ReminderKind::FollowUps);
    let items = follow_ups.load();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].description, "Call Jane about the supplement");
    assert_eq!(
        ReminderStore::new(&storage, ReminderKind::Updates).load().len(),
        1
    );

    assert!(follow_ups.remove(&first_id).unwrap());
    assert!(!follow_ups.remove(&first_id).unwrap());
    let left = newest_first(follow_ups.load());
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].description, "Send John the contract");
}

#[test]
fn lists_use_namespaced_keys() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("reminders.json");
    let storage = FileStore::new(&path);

    ReminderStore::new(&storage, ReminderKind::Updates)
        .add("Adjuster confirmed")
        .unwrap();

    let raw = storage.get(ReminderKind::Updates.storage_key()).unwrap();
    assert!(raw.contains("\"createdAt\""));
    assert!(storage.get(ReminderKind::FollowUps.storage_key()).is_none());

    let on_disk = fs::read_to_string(&path).unwrap();
    assert!(on_disk.contains("claims_portal.updates"));
}

#[test]
fn corrupt_file_reads_as_empty_and_is_replaced() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("reminders.json");
    fs::write(&path, "{ not json").unwrap();

    let storage = FileStore::new(&path);
    let store = ReminderStore::new(&storage, ReminderKind::FollowUps);
    assert!(store.load().is_empty());

    store.add("Start over").unwrap();
    let reopened = FileStore::new(&path);
    let items = ReminderStore::new(&reopened, ReminderKind::FollowUps).load();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].description, "Start over");
}

#[test]
fn malformed_list_value_reads_as_empty() {
    let dir = tempdir().unwrap();
    let storage = FileStore::new(dir.path().join("reminders.json"));
    storage
        .set(ReminderKind::FollowUps.storage_key(), "[{\"id\": 5}]")
        .unwrap();

    let store = ReminderStore::new(&storage, ReminderKind::FollowUps);
    assert!(store.load().is_empty());
}

#[test]
fn concurrent_adds_all_persist() {
    let dir = tempdir().unwrap();
    let storage = FileStore::new(dir.path().join("reminders.json"));

    std::thread::scope(|scope| {
        for worker in 0..8 {
            let storage = &storage;
            scope.spawn(move || {
                let store = ReminderStore::new(storage, ReminderKind::FollowUps);
                for n in 0..25 {
                    store.add(&format!("worker {} note {}", worker, n)).unwrap();
                }
            });
        }
    });

    let items = ReminderStore::new(&storage, ReminderKind::FollowUps).load();
    assert_eq!(items.len(), 200);
}
