//! Core domain logic for the local-first todo manager.
//! This crate is the single source of truth for todo invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod search;
pub mod service;

pub use config::{ConfigError, CoreConfig, ReminderConfig, StoreConfig, ToastConfig};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::filter::{FilterPatch, StatusFilter, TodoFilter, TodoStats};
pub use model::todo::{NewTodo, Priority, Todo, TodoId, TodoPatch, TodoValidationError};
pub use repo::kv_repo::{
    KeyValueStore, MemoryKeyValueStore, RepoError, RepoResult, SqliteKeyValueStore,
};
pub use search::debounce::SearchDebouncer;
pub use service::confirmation_service::{
    ConfirmOptions, ConfirmationDialog, ConfirmationError, ConfirmationService, DialogId,
    DialogKind, PendingConfirmation,
};
pub use service::notification_service::{NotificationService, Toast, ToastId, ToastKind};
pub use service::pubsub::SubscriptionId;
pub use service::reminder_service::{
    DesktopNotification, DesktopNotifier, NoopDesktopNotifier, NotificationPermission,
    NotifierError, ReminderService, ReminderState,
};
pub use service::todo_service::{
    ImportError, SharedTodoStore, StoreError, StoreSnapshot, TodoStore,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
