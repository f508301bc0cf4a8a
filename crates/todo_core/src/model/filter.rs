//! Filter and statistics projections over the todo list.
//!
//! # Invariants
//! - Filtering is status -> priority -> search, and preserves list order.
//! - Search is a case-insensitive substring match on title or description.
//! - Stats are always computed over the unfiltered list.

use crate::model::todo::{Priority, Todo};
use serde::{Deserialize, Serialize};

/// Completion-status filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Completed,
}

impl StatusFilter {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Active => "active",
            Self::Completed => "completed",
        }
    }

    fn matches(self, todo: &Todo) -> bool {
        match self {
            Self::All => true,
            Self::Active => !todo.completed,
            Self::Completed => todo.completed,
        }
    }
}

/// Transient view filter. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoFilter {
    pub status: StatusFilter,
    pub priority: Option<Priority>,
    pub search_term: String,
}

/// Partial filter update merged field by field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterPatch {
    pub status: Option<StatusFilter>,
    /// `Some(None)` clears the priority filter.
    pub priority: Option<Option<Priority>>,
    pub search_term: Option<String>,
}

impl FilterPatch {
    pub fn status(status: StatusFilter) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn priority(priority: Option<Priority>) -> Self {
        Self {
            priority: Some(priority),
            ..Self::default()
        }
    }

    pub fn search(term: impl Into<String>) -> Self {
        Self {
            search_term: Some(term.into()),
            ..Self::default()
        }
    }
}

impl TodoFilter {
    /// Returns a copy with `patch` merged over the current fields.
    pub fn merged(&self, patch: FilterPatch) -> Self {
        Self {
            status: patch.status.unwrap_or(self.status),
            priority: patch.priority.unwrap_or(self.priority),
            search_term: patch
                .search_term
                .unwrap_or_else(|| self.search_term.clone()),
        }
    }

    pub fn matches(&self, todo: &Todo) -> bool {
        if !self.status.matches(todo) {
            return false;
        }
        if let Some(priority) = self.priority {
            if todo.priority != priority {
                return false;
            }
        }

        let needle = self.search_term.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        todo.title.to_lowercase().contains(&needle)
            || todo
                .description
                .as_deref()
                .is_some_and(|description| description.to_lowercase().contains(&needle))
    }

    /// Runs `todos` through the filter, keeping their relative order.
    pub fn apply(&self, todos: &[Todo]) -> Vec<Todo> {
        todos
            .iter()
            .filter(|todo| self.matches(todo))
            .cloned()
            .collect()
    }

    pub fn has_active_filters(&self) -> bool {
        self.status != StatusFilter::All
            || self.priority.is_some()
            || !self.search_term.trim().is_empty()
    }

    /// Human-readable summary, empty when no filter is active.
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if self.status != StatusFilter::All {
            parts.push(format!("Status: {}", self.status.as_str()));
        }
        if let Some(priority) = self.priority {
            parts.push(format!("Priority: {priority}"));
        }
        if !self.search_term.trim().is_empty() {
            parts.push(format!("Search: \"{}\"", self.search_term));
        }

        if parts.is_empty() {
            String::new()
        } else {
            format!("Active filters: {}", parts.join(", "))
        }
    }
}

/// Derived counts over the full list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TodoStats {
    pub total: usize,
    pub active: usize,
    pub completed: usize,
}

impl TodoStats {
    pub fn from_todos(todos: &[Todo]) -> Self {
        let completed = todos.iter().filter(|todo| todo.completed).count();
        Self {
            total: todos.len(),
            active: todos.len() - completed,
            completed,
        }
    }
}
