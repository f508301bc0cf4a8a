//! Debounced, distinct-until-changed search input.
//!
//! # Invariants
//! - A term is emitted only after `quiet_period` without newer input.
//! - The same settled term is never emitted twice in a row.
//! - Time is supplied by the caller, so behavior is deterministic.

use crate::model::filter::FilterPatch;
use std::time::{Duration, Instant};

pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(300);

#[derive(Debug, Clone)]
pub struct SearchDebouncer {
    quiet_period: Duration,
    pending: Option<(String, Instant)>,
    last_emitted: Option<String>,
}

impl Default for SearchDebouncer {
    fn default() -> Self {
        Self::new(DEFAULT_QUIET_PERIOD)
    }
}

impl SearchDebouncer {
    pub fn new(quiet_period: Duration) -> Self {
        Self {
            quiet_period,
            pending: None,
            last_emitted: None,
        }
    }

    /// Records the latest raw input, replacing any unsettled one.
    pub fn input(&mut self, term: impl Into<String>, at: Instant) {
        self.pending = Some((term.into(), at));
    }

    /// Returns the settled term once it has been quiet long enough and
    /// differs from the previous emission.
    pub fn poll(&mut self, now: Instant) -> Option<String> {
        let (_, at) = self.pending.as_ref()?;
        if now.saturating_duration_since(*at) < self.quiet_period {
            return None;
        }

        let (term, _) = self.pending.take()?;
        if self.last_emitted.as_deref() == Some(term.as_str()) {
            return None;
        }
        self.last_emitted = Some(term.clone());
        Some(term)
    }

    /// Like `poll`, shaped as a store filter update.
    pub fn poll_patch(&mut self, now: Instant) -> Option<FilterPatch> {
        self.poll(now).map(FilterPatch::search)
    }

    /// Drops pending input and forgets the last emission, e.g. after the
    /// filter was cleared elsewhere.
    pub fn reset(&mut self) {
        self.pending = None;
        self.last_emitted = None;
    }
}
