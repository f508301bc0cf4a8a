//! Durable storage contracts and implementations.
//!
//! # Responsibility
//! - Define the key-value slot contract the todo store persists through.
//! - Isolate SQLite details from store orchestration.
//!
//! # Invariants
//! - Keys are non-blank.
//! - Values are opaque text; callers own their encoding.

pub mod kv_repo;
