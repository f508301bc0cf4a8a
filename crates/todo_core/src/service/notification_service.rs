//! Transient toast notifications.
//!
//! # Responsibility
//! - Keep the ordered list of visible toasts.
//! - Expire each toast once after its duration.
//!
//! # Invariants
//! - Toast ids are unique per service instance.
//! - Removing an unknown or already-expired id is a no-op.
//! - Expiry timers never keep the service alive.

use crate::config::ToastConfig;
use crate::service::lock;
use crate::service::pubsub::{SubscriberSet, SubscriptionId};
use log::debug;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::runtime::Handle;

/// Stable toast identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ToastId(u64);

impl Display for ToastId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "toast-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
    Warning,
    Info,
}

impl ToastKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub id: ToastId,
    pub message: String,
    pub kind: ToastKind,
    pub duration: Duration,
}

#[derive(Default)]
struct ToastState {
    next_id: u64,
    toasts: Vec<Toast>,
    subscribers: SubscriberSet<Vec<Toast>>,
}

impl ToastState {
    fn publish(&mut self) {
        self.subscribers.publish(&self.toasts);
    }
}

/// Cloneable handle over one shared toast list.
#[derive(Clone)]
pub struct NotificationService {
    state: Arc<Mutex<ToastState>>,
    config: ToastConfig,
    runtime: Handle,
}

impl NotificationService {
    /// Creates the service. Expiry timers are spawned on `runtime`.
    pub fn new(config: ToastConfig, runtime: Handle) -> Self {
        Self {
            state: Arc::new(Mutex::new(ToastState::default())),
            config,
            runtime,
        }
    }

    pub fn success(&self, message: impl Into<String>, duration: Option<Duration>) -> ToastId {
        self.push(ToastKind::Success, message.into(), duration)
    }

    /// Error toasts default to the longer error duration.
    pub fn error(&self, message: impl Into<String>, duration: Option<Duration>) -> ToastId {
        self.push(ToastKind::Error, message.into(), duration)
    }

    pub fn warning(&self, message: impl Into<String>, duration: Option<Duration>) -> ToastId {
        self.push(ToastKind::Warning, message.into(), duration)
    }

    pub fn info(&self, message: impl Into<String>, duration: Option<Duration>) -> ToastId {
        self.push(ToastKind::Info, message.into(), duration)
    }

    /// Removes one toast. Returns whether it was still visible.
    pub fn remove(&self, id: ToastId) -> bool {
        remove_toast(&self.state, id)
    }

    pub fn clear_all(&self) {
        let mut state = lock(&self.state);
        state.toasts.clear();
        state.publish();
    }

    pub fn toasts(&self) -> Vec<Toast> {
        lock(&self.state).toasts.clone()
    }

    /// Registers `callback` for every toast list change.
    pub fn subscribe(&self, callback: impl FnMut(&Vec<Toast>) + Send + 'static) -> SubscriptionId {
        lock(&self.state).subscribers.subscribe(callback)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        lock(&self.state).subscribers.unsubscribe(id)
    }

    fn push(&self, kind: ToastKind, message: String, duration: Option<Duration>) -> ToastId {
        let duration = self.effective_duration(kind, duration);
        let id = {
            let mut state = lock(&self.state);
            state.next_id += 1;
            let id = ToastId(state.next_id);
            state.toasts.push(Toast {
                id,
                message,
                kind,
                duration,
            });
            state.publish();
            id
        };
        debug!(
            "event=toast_show module=notification status=ok id={} kind={} duration_ms={}",
            id,
            kind.as_str(),
            duration.as_millis()
        );

        let state = Arc::downgrade(&self.state);
        self.runtime.spawn(expire_after(state, id, duration));
        id
    }

    /// Zero or missing durations fall back to the per-kind default.
    fn effective_duration(&self, kind: ToastKind, requested: Option<Duration>) -> Duration {
        match requested.filter(|duration| !duration.is_zero()) {
            Some(duration) => duration,
            None if kind == ToastKind::Error => self.config.error_duration,
            None => self.config.default_duration,
        }
    }
}

async fn expire_after(state: Weak<Mutex<ToastState>>, id: ToastId, duration: Duration) {
    tokio::time::sleep(duration).await;
    if let Some(state) = state.upgrade() {
        if remove_toast(&state, id) {
            debug!("event=toast_expire module=notification status=ok id={id}");
        }
    }
}

fn remove_toast(state: &Mutex<ToastState>, id: ToastId) -> bool {
    let mut state = lock(state);
    let before = state.toasts.len();
    state.toasts.retain(|toast| toast.id != id);
    let removed = state.toasts.len() != before;
    if removed {
        state.publish();
    }
    removed
}
