use chrono::NaiveDate;
use ticklist_core::{
    storage::{KeyValueStore, StoreError},
    store::TaskStore,
    tasks::{PersistenceError, Priority, TaskDraft, TaskPersistence},
    view::Filter,
};
use ticklist_storage::{
    encrypted_store::EncryptedFileStore, file_store::FileStore, key_provider::InMemoryKeyProvider,
};
use ticklist_task::{KvTaskRepo, BACKUP_KEY, TASKS_KEY};

fn populate<P: TaskPersistence>(store: &mut TaskStore<P>) {
    store
        .create(
            TaskDraft::new("Write report")
                .priority(Priority::High)
                .due_date(NaiveDate::from_ymd_opt(2026, 10, 20))
                .category("work"),
        )
        .expect("create");
    let bills = store
        .create(TaskDraft::new("Pay bills"))
        .expect("create")
        .into_value();
    store.create(TaskDraft::new("Water plants").category("home")).expect("create");
    store.toggle(bills.id()).expect("toggle");
}

#[test]
fn collection_survives_reopen_with_same_order_and_fields() {
    let dir = tempfile::tempdir().expect("tempdir");

    let mut first = TaskStore::open(KvTaskRepo::new(FileStore::new(dir.path())));
    populate(&mut first);
    let expected = first.tasks().to_vec();

    let reopened = TaskStore::open(KvTaskRepo::new(FileStore::new(dir.path())));
    assert!(reopened.load_warning().is_none());
    assert_eq!(reopened.tasks(), expected.as_slice());
    assert_eq!(reopened.stats(), first.stats());
}

#[test]
fn saving_a_loaded_collection_is_stable() {
    let dir = tempfile::tempdir().expect("tempdir");
    let repo = KvTaskRepo::new(FileStore::new(dir.path()));
    let mut store = TaskStore::open(KvTaskRepo::new(FileStore::new(dir.path())));
    populate(&mut store);

    let loaded = repo.load().expect("load");
    repo.save(&loaded).expect("save");
    assert_eq!(repo.load().expect("reload"), loaded);
}

#[test]
fn filters_and_search_are_not_persisted() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut store = TaskStore::open(KvTaskRepo::new(FileStore::new(dir.path())));
    populate(&mut store);
    store.set_filter(Filter::Completed);
    store.set_search("bills");
    assert_eq!(store.visible().len(), 1);

    let reopened = TaskStore::open(KvTaskRepo::new(FileStore::new(dir.path())));
    assert_eq!(reopened.filter(), Filter::All);
    assert_eq!(reopened.query(), "");
    assert_eq!(reopened.visible().len(), 3);
}

#[test]
fn browser_data_is_readable_and_rewritten_in_place() {
    let dir = tempfile::tempdir().expect("tempdir");
    let files = FileStore::new(dir.path());
    files
        .put(
            TASKS_KEY,
            br#"[{"id":1718000000000,"text":"Buy milk","completed":false,"priority":"low","dueDate":"","category":"","createdAt":"2024-06-10T06:13:20.000Z"}]"#,
        )
        .expect("seed");

    let mut store = TaskStore::open(KvTaskRepo::new(files));
    let id = store.resolve_id("1718000000000").expect("legacy id");
    store.toggle(&id).expect("toggle");

    let raw = std::fs::read_to_string(dir.path().join("tasks.json")).expect("read");
    assert!(raw.contains(r#""id":"1718000000000""#));
    assert!(raw.contains(r#""completed":true"#));
}

#[test]
fn malformed_file_starts_empty_and_keeps_backup() {
    let dir = tempfile::tempdir().expect("tempdir");
    let files = FileStore::new(dir.path());
    files.put(TASKS_KEY, b"{\"oops\": true}").expect("seed");

    let mut store = TaskStore::open(KvTaskRepo::new(FileStore::new(dir.path())));
    assert!(store.tasks().is_empty());
    assert!(matches!(
        store.load_warning(),
        Some(PersistenceError::Malformed { .. })
    ));

    store.create(TaskDraft::new("Start over")).expect("create");
    assert_eq!(files.get(BACKUP_KEY).expect("backup"), b"{\"oops\": true}");
    assert_eq!(TaskStore::open(KvTaskRepo::new(files)).stats().total, 1);
}

#[test]
fn encrypted_store_round_trips_tasks() {
    let dir = tempfile::tempdir().expect("tempdir");
    let keys = InMemoryKeyProvider::default();

    let mut store = TaskStore::open(KvTaskRepo::new(EncryptedFileStore::new(
        dir.path(),
        keys.clone(),
    )));
    populate(&mut store);

    let reopened = TaskStore::open(KvTaskRepo::new(EncryptedFileStore::new(dir.path(), keys)));
    assert_eq!(reopened.tasks(), store.tasks());

    let raw = std::fs::read_to_string(dir.path().join("tasks.enc")).expect("read");
    assert!(!raw.contains("Write report"));
}

#[test]
fn wrong_key_never_overwrites_encrypted_tasks() {
    let dir = tempfile::tempdir().expect("tempdir");
    let owner_key = InMemoryKeyProvider::default();

    let mut original = TaskStore::open(KvTaskRepo::new(EncryptedFileStore::new(
        dir.path(),
        owner_key.clone(),
    )));
    populate(&mut original);
    let expected = original.tasks().to_vec();

    let other_key = InMemoryKeyProvider::default();
    let mut intruder = TaskStore::open(KvTaskRepo::new(EncryptedFileStore::new(
        dir.path(),
        other_key,
    )));
    assert!(matches!(
        intruder.load_warning(),
        Some(PersistenceError::Read { .. })
    ));
    assert!(!intruder.can_persist());

    let applied = intruder.create(TaskDraft::new("Scratch")).expect("create");
    assert!(matches!(
        applied.persist_error,
        Some(PersistenceError::Write { .. })
    ));
    assert!(intruder.persist().is_err());

    let reopened = TaskStore::open(KvTaskRepo::new(EncryptedFileStore::new(dir.path(), owner_key)));
    assert!(reopened.load_warning().is_none());
    assert_eq!(reopened.tasks(), expected.as_slice());
}

struct ReadOnlyStore;

impl KeyValueStore for ReadOnlyStore {
    fn put(&self, _key: &str, _value: &[u8]) -> Result<(), StoreError> {
        Err(StoreError::Storage {
            reason: "read-only filesystem".into(),
        })
    }

    fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        Err(StoreError::NotFound { key: key.into() })
    }

    fn delete(&self, _key: &str) -> Result<(), StoreError> {
        Ok(())
    }
}

#[test]
fn write_failures_are_reported_but_not_rolled_back() {
    let mut store = TaskStore::open(KvTaskRepo::new(ReadOnlyStore));

    let applied = store.create(TaskDraft::new("Still here")).expect("create");

    assert!(matches!(
        applied.persist_error,
        Some(PersistenceError::Write { .. })
    ));
    assert_eq!(store.stats().total, 1);
    assert_eq!(store.visible()[0].text(), "Still here");
}
