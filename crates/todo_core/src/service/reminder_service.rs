//! Due-date reminder poller.
//!
//! # Responsibility
//! - Periodically scan the store for open todos whose due time arrived.
//! - Fire one reminder per todo per session: a best-effort desktop
//!   notification plus an in-app warning toast.
//!
//! # Invariants
//! - States are `Stopped` (initial) and `Running`; `start`/`stop` are
//!   idempotent.
//! - No due-check runs after `stop` returns.
//! - A todo is reminded at most once until it is completed (observed via
//!   store snapshots) or its tracking is cleared explicitly.
//! - Desktop notification failures never suppress the toast.

use crate::config::ReminderConfig;
use crate::model::todo::{Todo, TodoId};
use crate::repo::kv_repo::KeyValueStore;
use crate::service::lock;
use crate::service::notification_service::NotificationService;
use crate::service::pubsub::SubscriptionId;
use crate::service::todo_service::SharedTodoStore;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

pub const REMINDER_TITLE: &str = "🔔 Todo Reminder";

/// Desktop notification permission state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationPermission {
    /// Not asked yet.
    Default,
    Granted,
    Denied,
    /// The platform has no notification facility.
    Unsupported,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesktopNotification {
    pub title: String,
    pub body: String,
    /// Todo id; lets the platform coalesce repeats.
    pub tag: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifierError {
    Unavailable,
    Failed(String),
}

impl Display for NotifierError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable => write!(f, "desktop notifications are unavailable"),
            Self::Failed(message) => write!(f, "desktop notification failed: {message}"),
        }
    }
}

impl Error for NotifierError {}

/// External desktop notification facility.
pub trait DesktopNotifier: Send + Sync {
    fn permission(&self) -> NotificationPermission;
    fn request_permission(&self) -> NotificationPermission;
    fn notify(&self, notification: &DesktopNotification) -> Result<(), NotifierError>;
}

/// Notifier for environments without a desktop facility.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDesktopNotifier;

impl DesktopNotifier for NoopDesktopNotifier {
    fn permission(&self) -> NotificationPermission {
        NotificationPermission::Unsupported
    }

    fn request_permission(&self) -> NotificationPermission {
        NotificationPermission::Unsupported
    }

    fn notify(&self, _notification: &DesktopNotification) -> Result<(), NotifierError> {
        Err(NotifierError::Unavailable)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderState {
    Stopped,
    Running,
}

struct ReminderInner {
    state: ReminderState,
    notified: HashSet<TodoId>,
    task: Option<JoinHandle<()>>,
}

/// Shared pieces a due-check needs; cloned into the timer task.
struct ReminderCore<S: KeyValueStore> {
    store: SharedTodoStore<S>,
    notifications: NotificationService,
    notifier: Arc<dyn DesktopNotifier>,
    config: ReminderConfig,
    inner: Arc<Mutex<ReminderInner>>,
}

impl<S: KeyValueStore> Clone for ReminderCore<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            notifications: self.notifications.clone(),
            notifier: Arc::clone(&self.notifier),
            config: self.config.clone(),
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: KeyValueStore> ReminderCore<S> {
    /// Fires reminders due at `now`. Returns how many fired.
    ///
    /// With `only_while_running`, the check is skipped once the poller has
    /// stopped. The reminder lock is held for the whole check so `stop`
    /// cannot return in the middle of one.
    fn check(&self, now: DateTime<Utc>, only_while_running: bool) -> usize {
        // Store lock is released before the reminder lock is taken.
        let snapshot = lock(&self.store).snapshot();
        let mut inner = lock(&self.inner);
        if only_while_running && inner.state != ReminderState::Running {
            return 0;
        }

        let due: Vec<&Todo> = snapshot
            .todos()
            .iter()
            .filter(|todo| self.should_notify(todo, now, &inner.notified))
            .collect();
        for todo in &due {
            inner.notified.insert(todo.id.clone());
            self.send_reminder(todo);
        }

        debug!(
            "event=reminder_check module=reminder status=ok scanned={} fired={}",
            snapshot.todos().len(),
            due.len()
        );
        due.len()
    }

    fn should_notify(&self, todo: &Todo, now: DateTime<Utc>, notified: &HashSet<TodoId>) -> bool {
        if todo.completed || notified.contains(&todo.id) {
            return false;
        }
        let Some(due) = todo.due_date else {
            return false;
        };
        let lead = chrono::Duration::from_std(self.config.lead_time)
            .unwrap_or_else(|_| chrono::Duration::zero());
        now >= due - lead
    }

    fn send_reminder(&self, todo: &Todo) {
        let body = format!("\"{}\" is due now!", todo.title);

        if self.notifier.permission() == NotificationPermission::Granted {
            let notification = DesktopNotification {
                title: REMINDER_TITLE.to_string(),
                body: body.clone(),
                tag: todo.id.to_string(),
            };
            if let Err(err) = self.notifier.notify(&notification) {
                warn!(
                    "event=reminder_desktop module=reminder status=error id={} error={}",
                    todo.id, err
                );
            }
        }

        self.notifications
            .warning(body, Some(self.config.toast_duration));
        info!("event=reminder_fire module=reminder status=ok id={}", todo.id);
    }
}

/// Reminder poller bound to one store.
pub struct ReminderService<S: KeyValueStore + Send + 'static> {
    core: ReminderCore<S>,
    runtime: Handle,
    subscription: SubscriptionId,
}

impl<S: KeyValueStore + Send + 'static> ReminderService<S> {
    /// Creates a stopped poller and starts tracking completions in `store`.
    pub fn new(
        store: SharedTodoStore<S>,
        notifications: NotificationService,
        notifier: Arc<dyn DesktopNotifier>,
        config: ReminderConfig,
        runtime: Handle,
    ) -> Self {
        let inner = Arc::new(Mutex::new(ReminderInner {
            state: ReminderState::Stopped,
            notified: HashSet::new(),
            task: None,
        }));

        let tracked = Arc::clone(&inner);
        let subscription = lock(&store).subscribe(move |snapshot| {
            let mut inner = lock(&tracked);
            for todo in snapshot.todos().iter().filter(|todo| todo.completed) {
                inner.notified.remove(&todo.id);
            }
        });

        Self {
            core: ReminderCore {
                store,
                notifications,
                notifier,
                config,
                inner,
            },
            runtime,
            subscription,
        }
    }

    pub fn state(&self) -> ReminderState {
        lock(&self.core.inner).state
    }

    pub fn is_running(&self) -> bool {
        self.state() == ReminderState::Running
    }

    /// Moves to `Running`: asks for desktop permission if undecided, checks
    /// once immediately, then arms the periodic timer.
    pub fn start(&self) {
        {
            let mut inner = lock(&self.core.inner);
            if inner.state == ReminderState::Running {
                return;
            }
            inner.state = ReminderState::Running;

            let period = self.core.config.check_interval;
            let core = self.core.clone();
            inner.task = Some(self.runtime.spawn(async move {
                let mut ticker = interval_at(Instant::now() + period, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    ticker.tick().await;
                    core.check(Utc::now(), true);
                }
            }));
        }
        info!(
            "event=reminder_start module=reminder status=ok interval_ms={}",
            self.core.config.check_interval.as_millis()
        );

        self.ensure_permission();
        self.core.check(Utc::now(), true);
    }

    /// Moves to `Stopped` and disarms the timer.
    pub fn stop(&self) {
        let mut inner = lock(&self.core.inner);
        if inner.state == ReminderState::Stopped {
            return;
        }
        inner.state = ReminderState::Stopped;
        if let Some(task) = inner.task.take() {
            task.abort();
        }
        info!("event=reminder_stop module=reminder status=ok");
    }

    /// Runs one due-check against `now`, regardless of poller state.
    pub fn check_due_todos_at(&self, now: DateTime<Utc>) -> usize {
        self.core.check(now, false)
    }

    pub fn check_due_todos(&self) -> usize {
        self.check_due_todos_at(Utc::now())
    }

    /// Allows `id` to be reminded again.
    pub fn clear_notification(&self, id: &TodoId) -> bool {
        lock(&self.core.inner).notified.remove(id)
    }

    pub fn reset_notifications(&self) {
        lock(&self.core.inner).notified.clear();
    }

    pub fn was_notified(&self, id: &TodoId) -> bool {
        lock(&self.core.inner).notified.contains(id)
    }

    fn ensure_permission(&self) {
        let notifier = &self.core.notifier;
        if notifier.permission() != NotificationPermission::Default {
            return;
        }
        if notifier.request_permission() == NotificationPermission::Granted {
            self.core
                .notifications
                .success("Reminders enabled!", None);
        }
    }
}

impl<S: KeyValueStore + Send + 'static> Drop for ReminderService<S> {
    fn drop(&mut self) {
        self.stop();
        lock(&self.core.store).unsubscribe(self.subscription);
    }
}
