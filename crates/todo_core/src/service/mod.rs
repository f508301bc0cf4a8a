//! Core use-case services.
//!
//! # Responsibility
//! - Own the todo store and the UI-signaling services around it.
//! - Keep presentation layers decoupled from storage details.
//!
//! # Invariants
//! - Services share state through explicit handles, never globals.
//! - Lock order is store -> reminder state -> toast state.

use std::sync::{Mutex, MutexGuard, PoisonError};

pub mod confirmation_service;
pub mod notification_service;
pub mod pubsub;
pub mod reminder_service;
pub mod todo_service;

/// Locks `mutex`, recovering the guard if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
