//! Domain model for todos and their derived views.
//!
//! # Responsibility
//! - Define the todo entity and its wire shape.
//! - Define transient filter state and derived statistics.
//!
//! # Invariants
//! - Every todo is identified by a stable `TodoId`.
//! - Filters and stats are projections; they never own todo data.

pub mod filter;
pub mod todo;
