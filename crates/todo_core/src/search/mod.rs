//! Search input helpers.
//!
//! # Responsibility
//! - Shape raw keystrokes into settled search terms for the store filter.
//!
//! Matching itself lives in `model::filter`.

pub mod debounce;
