//! Reactive todo store.
//!
//! # Responsibility
//! - Own the authoritative todo list and the transient view filter.
//! - Publish immutable snapshots to subscribers after every change.
//! - Write the full list through to a durable key-value slot.
//!
//! # Invariants
//! - The list is always sorted incomplete-first, then by `order` ascending.
//! - Snapshot versions strictly increase; subscribers never observe a
//!   partially applied mutation.
//! - Persistence failures are logged and swallowed; memory stays
//!   authoritative for the session.
//! - Failed operations leave the list untouched.

use crate::config::StoreConfig;
use crate::model::filter::{FilterPatch, TodoFilter, TodoStats};
use crate::model::todo::{self, NewTodo, Priority, Todo, TodoId, TodoPatch, TodoValidationError};
use crate::repo::kv_repo::{KeyValueStore, RepoError};
use crate::service::pubsub::{SubscriberSet, SubscriptionId};
use log::{debug, error, info, warn};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex};

/// Store handle shared between the presentation layer and background services.
pub type SharedTodoStore<S> = Arc<Mutex<TodoStore<S>>>;

/// Store operation failure.
#[derive(Debug)]
pub enum StoreError {
    NotFound(TodoId),
    DuplicateId(TodoId),
    IndexOutOfRange { index: usize, len: usize },
    /// The highest `order` is `i64::MAX`; reorder to renumber.
    OrderExhausted,
    Validation(TodoValidationError),
    Serialization(serde_json::Error),
    Storage(RepoError),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "todo not found: {id}"),
            Self::DuplicateId(id) => write!(f, "todo id already exists: {id}"),
            Self::IndexOutOfRange { index, len } => {
                write!(f, "index {index} is out of range for {len} todos")
            }
            Self::OrderExhausted => {
                write!(f, "no order value left after the last todo; reorder to renumber")
            }
            Self::Validation(err) => write!(f, "{err}"),
            Self::Serialization(err) => write!(f, "failed to serialize todos: {err}"),
            Self::Storage(err) => write!(f, "failed to persist todos: {err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Serialization(err) => Some(err),
            Self::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TodoValidationError> for StoreError {
    fn from(value: TodoValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Import rejection. The store is unchanged whenever this is returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportError {
    /// Input is not valid JSON.
    Parse(String),
    /// Top level is not an array.
    InvalidFormat,
    /// One element could not be turned into a todo.
    InvalidRecord { index: usize, message: String },
    DuplicateId(TodoId),
}

impl ImportError {
    /// Human-readable message for UI surfaces.
    pub fn message(&self) -> String {
        self.to_string()
    }
}

impl Display for ImportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(details) => write!(f, "Failed to parse JSON data: {details}"),
            Self::InvalidFormat => write!(f, "Invalid data format: expected a JSON array of todos"),
            Self::InvalidRecord { index, message } => {
                write!(f, "Invalid todo at index {index}: {message}")
            }
            Self::DuplicateId(id) => write!(f, "Duplicate todo id `{id}` in import data"),
        }
    }
}

impl Error for ImportError {}

/// Immutable view of the store at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSnapshot {
    version: u64,
    todos: Vec<Todo>,
    filter: TodoFilter,
}

impl StoreSnapshot {
    /// Monotonic publish counter. The initial load is version 0.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Full sorted list.
    pub fn todos(&self) -> &[Todo] {
        &self.todos
    }

    pub fn filter(&self) -> &TodoFilter {
        &self.filter
    }

    pub fn filtered(&self) -> Vec<Todo> {
        self.filter.apply(&self.todos)
    }

    pub fn stats(&self) -> TodoStats {
        TodoStats::from_todos(&self.todos)
    }
}

/// Authoritative todo state container.
pub struct TodoStore<S: KeyValueStore> {
    storage: S,
    config: StoreConfig,
    todos: Vec<Todo>,
    filter: TodoFilter,
    current: Arc<StoreSnapshot>,
    subscribers: SubscriberSet<Arc<StoreSnapshot>>,
}

impl<S: KeyValueStore> TodoStore<S> {
    /// Creates the store and loads the persisted snapshot.
    ///
    /// A missing, unreadable or invalid snapshot (including duplicate ids)
    /// yields an empty list; the failure is logged, never returned.
    pub fn open(storage: S, config: StoreConfig) -> Self {
        let mut todos = load_from_storage(&storage, &config.storage_key);
        sort_todos(&mut todos);
        let filter = TodoFilter::default();
        let current = Arc::new(StoreSnapshot {
            version: 0,
            todos: todos.clone(),
            filter: filter.clone(),
        });

        Self {
            storage,
            config,
            todos,
            filter,
            current,
            subscribers: SubscriberSet::new(),
        }
    }

    pub fn into_shared(self) -> SharedTodoStore<S> {
        Arc::new(Mutex::new(self))
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Full sorted list.
    pub fn todos(&self) -> &[Todo] {
        &self.todos
    }

    pub fn filter(&self) -> &TodoFilter {
        &self.filter
    }

    pub fn filtered_todos(&self) -> Vec<Todo> {
        self.filter.apply(&self.todos)
    }

    /// Counts over the unfiltered list.
    pub fn stats(&self) -> TodoStats {
        TodoStats::from_todos(&self.todos)
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> Arc<StoreSnapshot> {
        Arc::clone(&self.current)
    }

    pub fn get_todo(&self, id: &TodoId) -> Option<Todo> {
        self.todos.iter().find(|todo| &todo.id == id).cloned()
    }

    /// Registers `callback` and immediately replays the current snapshot to it.
    pub fn subscribe(
        &mut self,
        mut callback: impl FnMut(&Arc<StoreSnapshot>) + Send + 'static,
    ) -> SubscriptionId {
        callback(&self.current);
        self.subscribers.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    /// Appends a todo positioned after every existing one.
    pub fn add_todo(&mut self, input: NewTodo) -> Result<Todo, StoreError> {
        if let Some(id) = input.id.as_ref() {
            if self.position_of(id).is_some() {
                return Err(StoreError::DuplicateId(id.clone()));
            }
        }

        let order = match self.todos.iter().map(|todo| todo.order).max() {
            None => 0,
            Some(max) => max.checked_add(1).ok_or_else(|| {
                warn!("event=todo_add module=store status=rejected reason=order_exhausted");
                StoreError::OrderExhausted
            })?,
        };
        let mut created = Todo::create(input).inspect_err(|err| {
            warn!("event=todo_add module=store status=rejected reason={err}");
        })?;
        created.order = order;

        self.todos.push(created.clone());
        self.commit();
        info!(
            "event=todo_add module=store status=ok id={} order={} total={}",
            created.id,
            created.order,
            self.todos.len()
        );
        Ok(created)
    }

    pub fn update_todo(&mut self, id: &TodoId, patch: TodoPatch) -> Result<(), StoreError> {
        let index = self.require_position(id)?;
        self.todos[index].update(patch)?;
        self.commit();
        info!("event=todo_update module=store status=ok id={id}");
        Ok(())
    }

    pub fn delete_todo(&mut self, id: &TodoId) -> Result<(), StoreError> {
        let index = self.require_position(id)?;
        self.todos.remove(index);
        self.commit();
        info!(
            "event=todo_delete module=store status=ok id={} total={}",
            id,
            self.todos.len()
        );
        Ok(())
    }

    pub fn toggle_todo(&mut self, id: &TodoId) -> Result<(), StoreError> {
        let index = self.require_position(id)?;
        self.todos[index].toggle();
        let completed = self.todos[index].completed;
        self.commit();
        info!("event=todo_toggle module=store status=ok id={id} completed={completed}");
        Ok(())
    }

    /// Moves the todo at `from` to `to` in the current list, renumbers every
    /// `order` by position, then re-sorts.
    ///
    /// The re-sort keeps completion grouping, so a move across the
    /// incomplete/completed boundary snaps back into its group.
    pub fn reorder_todos(&mut self, from: usize, to: usize) -> Result<(), StoreError> {
        let len = self.todos.len();
        for index in [from, to] {
            if index >= len {
                return Err(StoreError::IndexOutOfRange { index, len });
            }
        }

        let moved = self.todos.remove(from);
        self.todos.insert(to, moved);
        let now = todo::now();
        for (position, todo) in self.todos.iter_mut().enumerate() {
            todo.order = position as i64;
            todo.touch(now);
        }
        self.commit();
        info!("event=todo_reorder module=store status=ok from={from} to={to}");
        Ok(())
    }

    /// Same as `reorder_todos` with the source position looked up by id.
    pub fn move_todo(&mut self, id: &TodoId, to: usize) -> Result<(), StoreError> {
        let from = self.require_position(id)?;
        self.reorder_todos(from, to)
    }

    /// Removes every completed todo and returns how many were removed.
    ///
    /// Nothing is published or persisted when no todo was completed.
    pub fn delete_completed(&mut self) -> usize {
        let before = self.todos.len();
        self.todos.retain(|todo| !todo.completed);
        let removed = before - self.todos.len();
        if removed > 0 {
            self.commit();
        }
        info!("event=todo_delete_completed module=store status=ok removed={removed}");
        removed
    }

    /// Completes every open todo. Returns how many changed; a zero count
    /// publishes and persists nothing.
    pub fn mark_all_complete(&mut self) -> usize {
        self.mark_all(true)
    }

    /// Reopens every completed todo. Returns how many changed; a zero count
    /// publishes and persists nothing.
    pub fn mark_all_incomplete(&mut self) -> usize {
        self.mark_all(false)
    }

    fn mark_all(&mut self, completed: bool) -> usize {
        let mut changed = 0;
        for todo in self.todos.iter_mut().filter(|todo| todo.completed != completed) {
            todo.toggle();
            changed += 1;
        }
        if changed > 0 {
            self.commit();
        }
        info!("event=todo_mark_all module=store status=ok completed={completed} changed={changed}");
        changed
    }

    /// Merges `patch` into the view filter. The list is not touched.
    pub fn set_filter(&mut self, patch: FilterPatch) {
        self.filter = self.filter.merged(patch);
        debug!(
            "event=filter_set module=store status=ok status_filter={} priority={}",
            self.filter.status.as_str(),
            self.filter.priority.map_or("any", Priority::as_str)
        );
        self.publish();
    }

    pub fn clear_filter(&mut self) {
        self.filter = TodoFilter::default();
        debug!("event=filter_clear module=store status=ok");
        self.publish();
    }

    /// Serializes the full list as a pretty-printed JSON array.
    pub fn export_todos(&self) -> Result<String, StoreError> {
        serde_json::to_string_pretty(&self.todos).map_err(StoreError::Serialization)
    }

    /// Replaces the whole list with `data`, all or nothing.
    pub fn import_todos(&mut self, data: &str) -> Result<usize, ImportError> {
        let imported = parse_import(data).inspect_err(|err| {
            warn!("event=todo_import module=store status=rejected reason={err}");
        })?;

        let count = imported.len();
        self.todos = imported;
        self.commit();
        info!("event=todo_import module=store status=ok count={count}");
        Ok(count)
    }

    /// Adds the onboarding sample todos. Returns how many were added.
    pub fn add_sample_data(&mut self) -> Result<usize, StoreError> {
        let samples = [
            NewTodo::new("Welcome to your Todo App!")
                .with_description("You can drag and drop todos to reorder them")
                .with_priority(Priority::High),
            NewTodo::new("Try editing this todo")
                .with_description("Click on a todo to edit its details")
                .with_priority(Priority::Medium),
            NewTodo::new("Mark this as completed")
                .with_description("Check the box to mark todos as done")
                .with_priority(Priority::Low),
            NewTodo::new("This one is already done")
                .with_description("Completed todos can be filtered or hidden")
                .with_priority(Priority::Medium)
                .completed(true),
        ];

        let count = samples.len();
        for sample in samples {
            self.add_todo(sample)?;
        }
        Ok(count)
    }

    /// Writes the current list to storage, surfacing any failure.
    ///
    /// Used at teardown where the caller wants to know the data landed.
    pub fn flush(&mut self) -> Result<(), StoreError> {
        let payload = serde_json::to_string(&self.todos).map_err(StoreError::Serialization)?;
        self.storage
            .set(&self.config.storage_key, &payload)
            .map_err(StoreError::Storage)?;
        info!(
            "event=store_flush module=store status=ok count={}",
            self.todos.len()
        );
        Ok(())
    }

    fn position_of(&self, id: &TodoId) -> Option<usize> {
        self.todos.iter().position(|todo| &todo.id == id)
    }

    fn require_position(&self, id: &TodoId) -> Result<usize, StoreError> {
        self.position_of(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    /// Re-sorts, publishes, then writes through.
    fn commit(&mut self) {
        sort_todos(&mut self.todos);
        self.publish();
        self.persist();
    }

    fn publish(&mut self) {
        self.current = Arc::new(StoreSnapshot {
            version: self.current.version + 1,
            todos: self.todos.clone(),
            filter: self.filter.clone(),
        });
        self.subscribers.publish(&self.current);
    }

    fn persist(&mut self) {
        let payload = match serde_json::to_string(&self.todos) {
            Ok(payload) => payload,
            Err(err) => {
                error!("event=store_save module=store status=error error_code=encode_failed error={err}");
                return;
            }
        };

        match self.storage.set(&self.config.storage_key, &payload) {
            Ok(()) => debug!(
                "event=store_save module=store status=ok count={} bytes={}",
                self.todos.len(),
                payload.len()
            ),
            Err(err) => error!(
                "event=store_save module=store status=error error_code=write_failed error={err}"
            ),
        }
    }
}

/// Incomplete first, then ascending `order`. Stable for equal keys.
pub fn sort_todos(todos: &mut [Todo]) {
    todos.sort_by_key(|todo| (todo.completed, todo.order));
}

fn load_from_storage<S: KeyValueStore>(storage: &S, key: &str) -> Vec<Todo> {
    let raw = match storage.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            info!("event=store_load module=store status=empty");
            return Vec::new();
        }
        Err(err) => {
            error!("event=store_load module=store status=error error_code=read_failed error={err}");
            return Vec::new();
        }
    };

    // Same validation as import; duplicate ids reject the whole slot.
    match parse_import(&raw) {
        Ok(todos) => {
            info!(
                "event=store_load module=store status=ok count={}",
                todos.len()
            );
            todos
        }
        Err(err) => {
            error!("event=store_load module=store status=error error_code=decode_failed error={err}");
            Vec::new()
        }
    }
}

fn parse_import(data: &str) -> Result<Vec<Todo>, ImportError> {
    let value: serde_json::Value =
        serde_json::from_str(data).map_err(|err| ImportError::Parse(err.to_string()))?;
    let serde_json::Value::Array(items) = value else {
        return Err(ImportError::InvalidFormat);
    };

    let mut seen = HashSet::with_capacity(items.len());
    let mut todos = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let todo: Todo =
            serde_json::from_value(item).map_err(|err| ImportError::InvalidRecord {
                index,
                message: err.to_string(),
            })?;
        if !seen.insert(todo.id.clone()) {
            return Err(ImportError::DuplicateId(todo.id));
        }
        todos.push(todo);
    }
    Ok(todos)
}
