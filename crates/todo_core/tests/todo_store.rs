use chrono::{Duration, Utc};
use std::sync::{Arc, Mutex};
use todo_core::{
    FilterPatch, ImportError, KeyValueStore, MemoryKeyValueStore, NewTodo, Priority, RepoError,
    RepoResult, SqliteKeyValueStore, StatusFilter, StoreConfig, StoreError, Todo, TodoId,
    TodoPatch, TodoStore,
};

fn memory_store() -> TodoStore<MemoryKeyValueStore> {
    TodoStore::open(MemoryKeyValueStore::new(), StoreConfig::default())
}

fn titles(todos: &[Todo]) -> Vec<&str> {
    todos.iter().map(|todo| todo.title.as_str()).collect()
}

fn assert_sorted(todos: &[Todo]) {
    for pair in todos.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        assert!(
            (a.completed, a.order) <= (b.completed, b.order),
            "list not sorted: {:?} before {:?}",
            (a.completed, a.order),
            (b.completed, b.order)
        );
    }
}

/// Storage whose writes always fail.
#[derive(Default)]
struct BrokenStorage {
    attempts: usize,
}

impl KeyValueStore for BrokenStorage {
    fn get(&self, _key: &str) -> RepoResult<Option<String>> {
        Ok(None)
    }

    fn set(&mut self, key: &str, _value: &str) -> RepoResult<()> {
        self.attempts += 1;
        Err(RepoError::InvalidKey(key.to_string()))
    }

    fn remove(&mut self, _key: &str) -> RepoResult<bool> {
        Ok(false)
    }
}

#[test]
fn add_assigns_increasing_order_and_keeps_todos_open() {
    let mut store = memory_store();

    let a = store.add_todo(NewTodo::new("A")).unwrap();
    let b = store.add_todo(NewTodo::new("B")).unwrap();

    assert_eq!(titles(store.todos()), vec!["A", "B"]);
    assert_eq!(a.order, 0);
    assert_eq!(b.order, 1);
    assert!(!a.completed && !b.completed);
    assert_eq!(store.get_todo(&a.id), Some(a));
}

#[test]
fn add_rejects_blank_title_and_duplicate_id() {
    let mut store = memory_store();
    let err = store.add_todo(NewTodo::new("  ")).unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));

    let id = TodoId::parse("fixed").unwrap();
    store
        .add_todo(NewTodo::new("first").with_id(id.clone()))
        .unwrap();
    let err = store
        .add_todo(NewTodo::new("second").with_id(id.clone()))
        .unwrap_err();
    assert!(matches!(err, StoreError::DuplicateId(dup) if dup == id));
    assert_eq!(store.todos().len(), 1);
}

#[test]
fn add_orders_after_the_current_maximum() {
    let mut store = memory_store();
    let first = store.add_todo(NewTodo::new("first")).unwrap();
    store
        .update_todo(
            &first.id,
            TodoPatch {
                order: Some(10),
                ..TodoPatch::default()
            },
        )
        .unwrap();

    let next = store.add_todo(NewTodo::new("next")).unwrap();
    assert_eq!(next.order, 11);
}

#[test]
fn add_after_maximum_order_is_rejected_until_renumbered() {
    let mut store = memory_store();
    let data = format!(
        r#"[{{"id": "last", "title": "at the end", "order": {}, "createdAt": "2026-01-01T00:00:00.000Z", "updatedAt": "2026-01-01T00:00:00.000Z"}}]"#,
        i64::MAX
    );
    store.import_todos(&data).unwrap();

    let err = store.add_todo(NewTodo::new("B")).unwrap_err();
    assert!(matches!(err, StoreError::OrderExhausted));
    assert_eq!(titles(store.todos()), vec!["at the end"]);

    store.reorder_todos(0, 0).unwrap();
    let added = store.add_todo(NewTodo::new("B")).unwrap();
    assert_eq!(added.order, 1);
}

#[test]
fn unknown_ids_report_not_found_and_leave_list_unchanged() {
    let mut store = memory_store();
    store.add_todo(NewTodo::new("only")).unwrap();
    let before = store.todos().to_vec();
    let missing = TodoId::parse("missing").unwrap();

    assert!(matches!(
        store.update_todo(&missing, TodoPatch::default()),
        Err(StoreError::NotFound(_))
    ));
    assert!(matches!(
        store.delete_todo(&missing),
        Err(StoreError::NotFound(_))
    ));
    assert!(matches!(
        store.toggle_todo(&missing),
        Err(StoreError::NotFound(_))
    ));
    assert_eq!(store.todos(), before.as_slice());
}

#[test]
fn update_with_blank_title_is_rejected() {
    let mut store = memory_store();
    let todo = store.add_todo(NewTodo::new("named")).unwrap();

    let err = store
        .update_todo(
            &todo.id,
            TodoPatch {
                title: Some(String::new()),
                ..TodoPatch::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));
    assert_eq!(store.get_todo(&todo.id).unwrap().title, "named");
}

#[test]
fn toggle_moves_completed_todos_behind_open_ones_and_back() {
    let mut store = memory_store();
    let a = store.add_todo(NewTodo::new("A")).unwrap();
    store.add_todo(NewTodo::new("B")).unwrap();
    store.add_todo(NewTodo::new("C")).unwrap();

    store.toggle_todo(&a.id).unwrap();
    assert_eq!(titles(store.todos()), vec!["B", "C", "A"]);
    assert_sorted(store.todos());

    store.toggle_todo(&a.id).unwrap();
    assert_eq!(titles(store.todos()), vec!["A", "B", "C"]);
    assert!(!store.get_todo(&a.id).unwrap().completed);
}

#[test]
fn toggled_overdue_todo_is_no_longer_overdue() {
    let mut store = memory_store();
    let todo = store
        .add_todo(NewTodo::new("X").with_due_date(Utc::now() - Duration::days(1)))
        .unwrap();
    assert!(todo.is_overdue());

    store.toggle_todo(&todo.id).unwrap();
    assert!(!store.get_todo(&todo.id).unwrap().is_overdue());
}

#[test]
fn delete_removes_one_todo() {
    let mut store = memory_store();
    let a = store.add_todo(NewTodo::new("A")).unwrap();
    store.add_todo(NewTodo::new("B")).unwrap();

    store.delete_todo(&a.id).unwrap();
    assert_eq!(titles(store.todos()), vec!["B"]);
    assert!(store.get_todo(&a.id).is_none());
}

#[test]
fn reorder_within_open_group_renumbers_orders() {
    let mut store = memory_store();
    for title in ["A", "B", "C"] {
        store.add_todo(NewTodo::new(title)).unwrap();
    }

    store.reorder_todos(2, 0).unwrap();
    assert_eq!(titles(store.todos()), vec!["C", "A", "B"]);
    let orders: Vec<i64> = store.todos().iter().map(|todo| todo.order).collect();
    assert_eq!(orders, vec![0, 1, 2]);
}

#[test]
fn reorder_across_completion_boundary_snaps_back_after_resort() {
    let mut store = memory_store();
    let a = store.add_todo(NewTodo::new("A")).unwrap();
    let b = store.add_todo(NewTodo::new("B")).unwrap();
    store.toggle_todo(&b.id).unwrap();
    assert_eq!(titles(store.todos()), vec!["A", "B"]);

    // Naive splice would yield [B, A]; the completion-first re-sort wins.
    store.reorder_todos(0, 1).unwrap();

    assert_eq!(titles(store.todos()), vec!["A", "B"]);
    assert_eq!(store.get_todo(&a.id).unwrap().order, 1);
    assert_eq!(store.get_todo(&b.id).unwrap().order, 0);
    assert_sorted(store.todos());
}

#[test]
fn reorder_out_of_range_is_rejected() {
    let mut store = memory_store();
    store.add_todo(NewTodo::new("A")).unwrap();

    let err = store.reorder_todos(0, 1).unwrap_err();
    assert!(matches!(
        err,
        StoreError::IndexOutOfRange { index: 1, len: 1 }
    ));
    assert_eq!(store.todos()[0].order, 0);
}

#[test]
fn move_todo_looks_up_source_by_id() {
    let mut store = memory_store();
    store.add_todo(NewTodo::new("A")).unwrap();
    store.add_todo(NewTodo::new("B")).unwrap();
    let c = store.add_todo(NewTodo::new("C")).unwrap();

    store.move_todo(&c.id, 1).unwrap();
    assert_eq!(titles(store.todos()), vec!["A", "C", "B"]);
}

#[test]
fn delete_completed_then_stats_reports_no_completed() {
    let mut store = memory_store();
    let a = store.add_todo(NewTodo::new("A")).unwrap();
    let b = store.add_todo(NewTodo::new("B")).unwrap();
    store.add_todo(NewTodo::new("C")).unwrap();
    store.toggle_todo(&a.id).unwrap();
    store.toggle_todo(&b.id).unwrap();

    assert_eq!(store.delete_completed(), 2);
    let stats = store.stats();
    assert_eq!(stats.completed, 0);
    assert_eq!(stats.total, 1);
    assert_eq!(stats.active, 1);
    assert_eq!(store.delete_completed(), 0);
}

#[test]
fn mark_all_complete_and_incomplete_only_flip_needed_todos() {
    let mut store = memory_store();
    let a = store.add_todo(NewTodo::new("A")).unwrap();
    store.add_todo(NewTodo::new("B")).unwrap();
    store.toggle_todo(&a.id).unwrap();
    let a_updated_at = store.get_todo(&a.id).unwrap().updated_at;

    assert_eq!(store.mark_all_complete(), 1);
    assert!(store.todos().iter().all(|todo| todo.completed));
    assert_eq!(store.get_todo(&a.id).unwrap().updated_at, a_updated_at);

    assert_eq!(store.mark_all_incomplete(), 2);
    assert!(store.todos().iter().all(|todo| !todo.completed));
    assert_eq!(store.mark_all_incomplete(), 0);
}

#[test]
fn bulk_operations_with_nothing_to_change_do_not_publish_or_persist() {
    let mut store = memory_store();
    assert_eq!(store.delete_completed(), 0);
    assert_eq!(store.mark_all_complete(), 0);
    assert_eq!(store.mark_all_incomplete(), 0);
    assert_eq!(store.snapshot().version(), 0);
    assert_eq!(
        store
            .storage()
            .get(&StoreConfig::default().storage_key)
            .unwrap(),
        None
    );

    store.add_todo(NewTodo::new("open")).unwrap();
    let version = store.snapshot().version();
    assert_eq!(store.delete_completed(), 0);
    assert_eq!(store.mark_all_incomplete(), 0);
    assert_eq!(store.snapshot().version(), version);
}

#[test]
fn filters_compose_status_priority_and_search() {
    let mut store = memory_store();
    let target = store
        .add_todo(
            NewTodo::new("Write FOO report")
                .with_priority(Priority::High),
        )
        .unwrap();
    store
        .add_todo(
            NewTodo::new("review")
                .with_description("mentions foo in the body")
                .with_priority(Priority::High),
        )
        .unwrap();
    let done = store
        .add_todo(NewTodo::new("foo done").with_priority(Priority::High))
        .unwrap();
    store
        .add_todo(NewTodo::new("foo low").with_priority(Priority::Low))
        .unwrap();
    store
        .add_todo(NewTodo::new("unrelated").with_priority(Priority::High))
        .unwrap();
    store.toggle_todo(&done.id).unwrap();

    store.set_filter(FilterPatch {
        status: Some(StatusFilter::Active),
        priority: Some(Some(Priority::High)),
        search_term: Some("foo".to_string()),
    });

    let filtered = store.filtered_todos();
    assert_eq!(titles(&filtered), vec!["Write FOO report", "review"]);
    assert_eq!(filtered[0].id, target.id);
    assert!(filtered.iter().all(|todo| !todo.completed
        && todo.priority == Priority::High));

    // Stats ignore the filter.
    assert_eq!(store.stats().total, 5);

    store.clear_filter();
    assert_eq!(store.filtered_todos().len(), 5);
    assert_eq!(store.filter().status, StatusFilter::All);
    assert!(store.filter().search_term.is_empty());
}

#[test]
fn set_filter_merges_field_by_field() {
    let mut store = memory_store();
    store.set_filter(FilterPatch::status(StatusFilter::Completed));
    store.set_filter(FilterPatch::search("milk"));
    assert_eq!(store.filter().status, StatusFilter::Completed);
    assert_eq!(store.filter().search_term, "milk");
}

#[test]
fn export_import_round_trip_reproduces_list() {
    let mut source = memory_store();
    source
        .add_todo(
            NewTodo::new("A")
                .with_description("first")
                .with_due_date(Utc::now() + Duration::days(3)),
        )
        .unwrap();
    let b = source
        .add_todo(NewTodo::new("B").with_priority(Priority::High))
        .unwrap();
    source.add_todo(NewTodo::new("C")).unwrap();
    source.toggle_todo(&b.id).unwrap();

    let exported = source.export_todos().unwrap();
    assert!(exported.contains("\n  {"), "export should be pretty-printed");

    let mut target = memory_store();
    target.add_todo(NewTodo::new("to be replaced")).unwrap();
    assert_eq!(target.import_todos(&exported).unwrap(), 3);
    assert_eq!(target.todos(), source.todos());
}

#[test]
fn import_rejects_malformed_data_without_touching_state() {
    let mut store = memory_store();
    store.add_todo(NewTodo::new("keep me")).unwrap();
    let before = store.todos().to_vec();

    let err = store.import_todos("not json").unwrap_err();
    assert!(matches!(err, ImportError::Parse(_)));
    assert!(!err.message().is_empty());

    let err = store.import_todos(r#"{"id": "x"}"#).unwrap_err();
    assert_eq!(err, ImportError::InvalidFormat);

    let partial = r#"[
        {"id": "ok", "title": "fine", "createdAt": "2026-01-01T00:00:00.000Z", "updatedAt": "2026-01-01T00:00:00.000Z"},
        {"id": "bad", "title": "", "createdAt": "2026-01-01T00:00:00.000Z", "updatedAt": "2026-01-01T00:00:00.000Z"}
    ]"#;
    let err = store.import_todos(partial).unwrap_err();
    assert!(matches!(err, ImportError::InvalidRecord { index: 1, .. }));

    let duplicated = r#"[
        {"id": "same", "title": "one", "createdAt": "2026-01-01T00:00:00.000Z", "updatedAt": "2026-01-01T00:00:00.000Z"},
        {"id": "same", "title": "two", "createdAt": "2026-01-01T00:00:00.000Z", "updatedAt": "2026-01-01T00:00:00.000Z"}
    ]"#;
    let err = store.import_todos(duplicated).unwrap_err();
    assert!(matches!(err, ImportError::DuplicateId(_)));

    assert_eq!(store.todos(), before.as_slice());
}

#[test]
fn import_sorts_incoming_records() {
    let mut store = memory_store();
    let data = r#"[
        {"id": "1", "title": "done", "completed": true, "order": 0, "createdAt": "2026-01-01T00:00:00.000Z", "updatedAt": "2026-01-01T00:00:00.000Z"},
        {"id": "2", "title": "late", "order": 5, "createdAt": "2026-01-01T00:00:00.000Z", "updatedAt": "2026-01-01T00:00:00.000Z"},
        {"id": "3", "title": "early", "order": 1, "createdAt": "2026-01-01T00:00:00.000Z", "updatedAt": "2026-01-01T00:00:00.000Z"}
    ]"#;

    assert_eq!(store.import_todos(data).unwrap(), 3);
    assert_eq!(titles(store.todos()), vec!["early", "late", "done"]);
}

#[test]
fn mutations_write_through_and_reload_on_open() {
    let mut store = memory_store();
    store.add_todo(NewTodo::new("persist me")).unwrap();
    let storage = store.storage().clone();
    let raw = storage
        .get(&StoreConfig::default().storage_key)
        .unwrap()
        .unwrap();
    assert!(raw.contains("persist me"));

    let reopened = TodoStore::open(storage, StoreConfig::default());
    assert_eq!(reopened.todos(), store.todos());
}

#[test]
fn filter_changes_are_not_persisted() {
    let mut store = memory_store();
    store.set_filter(FilterPatch::search("anything"));
    assert!(store.storage().is_empty());
}

#[test]
fn corrupt_persisted_snapshot_starts_empty() {
    let mut storage = MemoryKeyValueStore::new();
    storage
        .set(&StoreConfig::default().storage_key, "{ definitely not todos")
        .unwrap();

    let store = TodoStore::open(storage, StoreConfig::default());
    assert!(store.todos().is_empty());
}

#[test]
fn persisted_snapshot_with_duplicate_ids_starts_empty() {
    let mut storage = MemoryKeyValueStore::new();
    let duplicated = r#"[
        {"id": "a", "title": "one", "createdAt": "2026-01-01T00:00:00.000Z", "updatedAt": "2026-01-01T00:00:00.000Z"},
        {"id": "a", "title": "two", "order": 1, "createdAt": "2026-01-01T00:00:00.000Z", "updatedAt": "2026-01-01T00:00:00.000Z"}
    ]"#;
    storage
        .set(&StoreConfig::default().storage_key, duplicated)
        .unwrap();

    let store = TodoStore::open(storage, StoreConfig::default());
    assert!(store.todos().is_empty());
}

#[test]
fn storage_key_comes_from_config() {
    let config = StoreConfig {
        storage_key: "work.todos".to_string(),
    };
    let mut store = TodoStore::open(MemoryKeyValueStore::new(), config);
    store.add_todo(NewTodo::new("scoped")).unwrap();

    assert!(store.storage().get("work.todos").unwrap().is_some());
    assert!(store
        .storage()
        .get(&StoreConfig::default().storage_key)
        .unwrap()
        .is_none());
}

#[test]
fn write_failures_are_swallowed_and_memory_stays_authoritative() {
    let mut store = TodoStore::open(BrokenStorage::default(), StoreConfig::default());

    let todo = store.add_todo(NewTodo::new("in memory only")).unwrap();
    store.toggle_todo(&todo.id).unwrap();

    assert_eq!(store.storage().attempts, 2);
    assert!(store.get_todo(&todo.id).unwrap().completed);
    assert!(matches!(store.flush(), Err(StoreError::Storage(_))));
}

#[test]
fn sqlite_storage_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("todos.db");

    let ids = {
        let storage = SqliteKeyValueStore::open(&path).unwrap();
        let mut store = TodoStore::open(storage, StoreConfig::default());
        let a = store.add_todo(NewTodo::new("A")).unwrap();
        let b = store.add_todo(NewTodo::new("B")).unwrap();
        store.toggle_todo(&a.id).unwrap();
        store.flush().unwrap();
        vec![b.id, a.id]
    };

    let storage = SqliteKeyValueStore::open(&path).unwrap();
    let store = TodoStore::open(storage, StoreConfig::default());
    let reloaded: Vec<TodoId> = store.todos().iter().map(|todo| todo.id.clone()).collect();
    assert_eq!(reloaded, ids);
}

#[test]
fn subscribers_receive_replay_and_strictly_increasing_snapshots() {
    let mut store = memory_store();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let subscription = {
        let seen = Arc::clone(&seen);
        store.subscribe(move |snapshot| {
            seen.lock()
                .unwrap()
                .push((snapshot.version(), snapshot.todos().len(), snapshot.filtered().len()));
        })
    };

    let todo = store.add_todo(NewTodo::new("A")).unwrap();
    store.set_filter(FilterPatch::status(StatusFilter::Completed));
    store.toggle_todo(&todo.id).unwrap();
    assert!(store.unsubscribe(subscription));
    store.add_todo(NewTodo::new("B")).unwrap();

    let seen = seen.lock().unwrap().clone();
    assert_eq!(seen, vec![(0, 0, 0), (1, 1, 1), (2, 1, 0), (3, 1, 1)]);
    assert_eq!(store.snapshot().version(), 4);
    assert_eq!(store.snapshot().stats().total, 2);
}

#[test]
fn snapshots_are_not_affected_by_later_mutations() {
    let mut store = memory_store();
    let todo = store.add_todo(NewTodo::new("A")).unwrap();
    let before = store.snapshot();

    store.toggle_todo(&todo.id).unwrap();

    assert!(!before.todos()[0].completed);
    assert!(store.snapshot().todos()[0].completed);
}

#[test]
fn sample_data_adds_four_todos_with_one_completed() {
    let mut store = memory_store();
    assert_eq!(store.add_sample_data().unwrap(), 4);

    let stats = store.stats();
    assert_eq!(stats.total, 4);
    assert_eq!(stats.completed, 1);
    assert_sorted(store.todos());
}
