//! Single-slot confirmation dialogs.
//!
//! # Responsibility
//! - Publish at most one pending confirmation request at a time.
//! - Resolve the requester's awaited answer when the UI closes the dialog.
//!
//! # Invariants
//! - Each request resolves at most once.
//! - A newer request supersedes the open one; the superseded requester
//!   observes `ConfirmationError::Abandoned` instead of waiting forever.

use crate::service::lock;
use crate::service::pubsub::{SubscriberSet, SubscriptionId};
use log::{debug, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tokio::sync::oneshot;

/// Stable dialog identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DialogId(u64);

impl Display for DialogId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "dialog-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DialogKind {
    Danger,
    Warning,
    #[default]
    Info,
}

/// Caller input for one confirmation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfirmOptions {
    pub title: String,
    pub message: String,
    pub confirm_text: Option<String>,
    pub cancel_text: Option<String>,
    pub kind: Option<DialogKind>,
}

/// Dialog descriptor published to the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationDialog {
    pub id: DialogId,
    pub title: String,
    pub message: String,
    pub confirm_text: String,
    pub cancel_text: String,
    pub kind: DialogKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationError {
    /// The dialog was replaced by a newer one, or the service went away.
    Abandoned,
}

impl Display for ConfirmationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Abandoned => write!(f, "confirmation dialog was abandoned"),
        }
    }
}

impl Error for ConfirmationError {}

/// Awaitable answer for one `confirm` call.
#[derive(Debug)]
pub struct PendingConfirmation {
    dialog_id: DialogId,
    receiver: oneshot::Receiver<bool>,
}

impl PendingConfirmation {
    pub fn dialog_id(&self) -> DialogId {
        self.dialog_id
    }
}

impl Future for PendingConfirmation {
    type Output = Result<bool, ConfirmationError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|result| result.map_err(|_| ConfirmationError::Abandoned))
    }
}

struct OpenDialog {
    dialog: ConfirmationDialog,
    responder: oneshot::Sender<bool>,
}

#[derive(Default)]
struct DialogState {
    next_id: u64,
    open: Option<OpenDialog>,
    subscribers: SubscriberSet<Option<ConfirmationDialog>>,
}

impl DialogState {
    fn publish(&mut self) {
        let current = self.open.as_ref().map(|open| open.dialog.clone());
        self.subscribers.publish(&current);
    }
}

/// Cloneable handle over the single dialog slot.
#[derive(Clone, Default)]
pub struct ConfirmationService {
    state: Arc<Mutex<DialogState>>,
}

impl ConfirmationService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a dialog and returns the awaitable answer.
    pub fn confirm(&self, options: ConfirmOptions) -> PendingConfirmation {
        let (responder, receiver) = oneshot::channel();
        let mut state = lock(&self.state);
        state.next_id += 1;
        let dialog = ConfirmationDialog {
            id: DialogId(state.next_id),
            title: options.title,
            message: options.message,
            confirm_text: options
                .confirm_text
                .unwrap_or_else(|| "Confirm".to_string()),
            cancel_text: options.cancel_text.unwrap_or_else(|| "Cancel".to_string()),
            kind: options.kind.unwrap_or_default(),
        };
        let dialog_id = dialog.id;

        if let Some(previous) = state.open.replace(OpenDialog { dialog, responder }) {
            info!(
                "event=dialog_superseded module=confirmation status=ok previous={} next={}",
                previous.dialog.id, dialog_id
            );
        }
        state.publish();
        debug!("event=dialog_open module=confirmation status=ok id={dialog_id}");

        PendingConfirmation {
            dialog_id,
            receiver,
        }
    }

    /// Answers the open dialog and clears the slot.
    ///
    /// Returns `false` when no dialog was open.
    pub fn close_dialog(&self, result: bool) -> bool {
        let mut state = lock(&self.state);
        let Some(open) = state.open.take() else {
            return false;
        };
        // The requester may have stopped waiting; that is not an error here.
        let _ = open.responder.send(result);
        state.publish();
        debug!(
            "event=dialog_close module=confirmation status=ok id={} result={}",
            open.dialog.id, result
        );
        true
    }

    pub fn current(&self) -> Option<ConfirmationDialog> {
        lock(&self.state)
            .open
            .as_ref()
            .map(|open| open.dialog.clone())
    }

    pub fn subscribe(
        &self,
        callback: impl FnMut(&Option<ConfirmationDialog>) + Send + 'static,
    ) -> SubscriptionId {
        lock(&self.state).subscribers.subscribe(callback)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        lock(&self.state).subscribers.unsubscribe(id)
    }

    /// Danger dialog for deleting one item.
    pub fn confirm_delete(&self, item_name: Option<&str>) -> PendingConfirmation {
        let target = match item_name {
            Some(name) => format!(" \"{name}\""),
            None => " this item".to_string(),
        };
        self.confirm(ConfirmOptions {
            title: "Delete Item".to_string(),
            message: format!(
                "Are you sure you want to delete{target}? This action cannot be undone."
            ),
            confirm_text: Some("Delete".to_string()),
            cancel_text: Some("Cancel".to_string()),
            kind: Some(DialogKind::Danger),
        })
    }

    /// Danger dialog for deleting `count` completed todos.
    pub fn confirm_bulk_delete(&self, count: usize) -> PendingConfirmation {
        let plural = if count > 1 { "s" } else { "" };
        self.confirm(ConfirmOptions {
            title: "Delete Multiple Items".to_string(),
            message: format!(
                "Are you sure you want to delete {count} completed todo{plural}? This action cannot be undone."
            ),
            confirm_text: Some("Delete All".to_string()),
            cancel_text: Some("Cancel".to_string()),
            kind: Some(DialogKind::Danger),
        })
    }
}
