//! Todo entity model.
//!
//! # Responsibility
//! - Define the canonical todo record and its per-item behavior.
//! - Own the wire shape used by persistence, export and import.
//!
//! # Invariants
//! - `id` is non-empty and never changes after creation.
//! - `title` is non-empty after trimming.
//! - `updated_at >= created_at`.
//! - Timestamps carry millisecond precision so the ISO-8601 wire form
//!   round-trips exactly.

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Opaque stable identifier of one todo.
///
/// Fresh ids are UUID v4 strings; imported ids are kept verbatim so data
/// written by other clients keeps its identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TodoId(String);

impl TodoId {
    /// Generates a fresh unique id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wraps caller-provided id text, rejecting blank values.
    pub fn parse(value: impl Into<String>) -> Result<Self, TodoValidationError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(TodoValidationError::EmptyId);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for TodoId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Todo urgency level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl Display for Priority {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validation failures for todo construction and mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TodoValidationError {
    EmptyId,
    EmptyTitle,
    /// `updated_at` precedes `created_at`.
    TimestampsOutOfOrder {
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    },
}

impl Display for TodoValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyId => write!(f, "todo id must not be blank"),
            Self::EmptyTitle => write!(f, "todo title must not be blank"),
            Self::TimestampsOutOfOrder {
                created_at,
                updated_at,
            } => write!(
                f,
                "updatedAt ({}) must be >= createdAt ({})",
                iso8601(updated_at),
                iso8601(created_at)
            ),
        }
    }
}

impl Error for TodoValidationError {}

/// Input for creating a todo. Unset fields take entity defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTodo {
    /// Caller-provided id; a fresh one is generated when `None`.
    pub id: Option<TodoId>,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub priority: Priority,
    pub due_date: Option<DateTime<Utc>>,
}

impl NewTodo {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_due_date(mut self, due_date: DateTime<Utc>) -> Self {
        self.due_date = Some(due_date);
        self
    }

    pub fn with_id(mut self, id: TodoId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn completed(mut self, completed: bool) -> Self {
        self.completed = completed;
        self
    }
}

/// Shallow field-by-field update. `None` leaves the field untouched.
///
/// `description` and `due_date` are doubly optional so a patch can clear
/// them (`Some(None)`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub completed: Option<bool>,
    pub priority: Option<Priority>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub order: Option<i64>,
}

impl TodoPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.completed.is_none()
            && self.priority.is_none()
            && self.due_date.is_none()
            && self.order.is_none()
    }
}

/// Canonical todo record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TodoRecord", into = "TodoRecord")]
pub struct Todo {
    pub id: TodoId,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub due_date: Option<DateTime<Utc>>,
    /// Manual ordering key among todos of equal completion status.
    pub order: i64,
}

impl Todo {
    /// Creates a todo stamped with the current time.
    pub fn create(input: NewTodo) -> Result<Self, TodoValidationError> {
        Self::create_at(input, now())
    }

    /// Creates a todo using `now` for both timestamps.
    ///
    /// # Invariants
    /// - Title is trimmed and must not be blank.
    /// - Blank descriptions are dropped.
    /// - `order` starts at 0; the store assigns the real position.
    pub fn create_at(input: NewTodo, now: DateTime<Utc>) -> Result<Self, TodoValidationError> {
        let now = now.trunc_subsecs(3);
        let todo = Self {
            id: input.id.unwrap_or_else(TodoId::generate),
            title: normalize_title(&input.title)?,
            description: normalize_description(input.description),
            completed: input.completed,
            priority: input.priority,
            created_at: now,
            updated_at: now,
            due_date: input.due_date.map(|due| due.trunc_subsecs(3)),
            order: 0,
        };
        todo.validate()?;
        Ok(todo)
    }

    /// Checks entity invariants.
    pub fn validate(&self) -> Result<(), TodoValidationError> {
        if self.id.as_str().trim().is_empty() {
            return Err(TodoValidationError::EmptyId);
        }
        if self.title.trim().is_empty() {
            return Err(TodoValidationError::EmptyTitle);
        }
        if self.updated_at < self.created_at {
            return Err(TodoValidationError::TimestampsOutOfOrder {
                created_at: self.created_at,
                updated_at: self.updated_at,
            });
        }
        Ok(())
    }

    /// Flips completion state.
    pub fn toggle(&mut self) {
        self.completed = !self.completed;
        self.touch(now());
    }

    pub fn set_priority(&mut self, priority: Priority) {
        self.priority = priority;
        self.touch(now());
    }

    /// Merges `patch` over this todo.
    ///
    /// A rejected patch leaves the todo unchanged.
    pub fn update(&mut self, patch: TodoPatch) -> Result<(), TodoValidationError> {
        self.update_at(patch, now())
    }

    pub fn update_at(
        &mut self,
        patch: TodoPatch,
        now: DateTime<Utc>,
    ) -> Result<(), TodoValidationError> {
        let title = match patch.title {
            Some(title) => Some(normalize_title(&title)?),
            None => None,
        };

        if let Some(title) = title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = normalize_description(description);
        }
        if let Some(completed) = patch.completed {
            self.completed = completed;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = due_date.map(|due| due.trunc_subsecs(3));
        }
        if let Some(order) = patch.order {
            self.order = order;
        }
        self.touch(now);
        Ok(())
    }

    /// Refreshes `updated_at`, never moving it before `created_at`.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now.trunc_subsecs(3).max(self.created_at);
    }

    pub fn is_overdue(&self) -> bool {
        self.is_overdue_at(Utc::now())
    }

    /// True when a due date exists, lies strictly before `now`, and the todo
    /// is still open.
    pub fn is_overdue_at(&self, now: DateTime<Utc>) -> bool {
        match self.due_date {
            Some(due) => !self.completed && now > due,
            None => false,
        }
    }

    pub fn days_until_due(&self) -> Option<i64> {
        self.days_until_due_at(Utc::now())
    }

    /// Whole days until the due date, rounded up. Negative when overdue.
    pub fn days_until_due_at(&self, now: DateTime<Utc>) -> Option<i64> {
        let due = self.due_date?;
        let diff_ms = due.signed_duration_since(now).num_milliseconds();
        Some(-(-diff_ms).div_euclid(MILLIS_PER_DAY))
    }
}

/// Current time truncated to the precision stored on the wire.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

fn normalize_title(title: &str) -> Result<String, TodoValidationError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(TodoValidationError::EmptyTitle);
    }
    Ok(trimmed.to_string())
}

fn normalize_description(description: Option<String>) -> Option<String> {
    description
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn iso8601(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Persisted/exported JSON shape of one todo.
///
/// Missing defaultable fields fall back to entity defaults; timestamps are
/// required.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TodoRecord {
    #[serde(default = "TodoId::generate")]
    id: TodoId,
    title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default)]
    completed: bool,
    #[serde(default)]
    priority: Priority,
    #[serde(serialize_with = "serialize_timestamp")]
    created_at: DateTime<Utc>,
    #[serde(serialize_with = "serialize_timestamp")]
    updated_at: DateTime<Utc>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_optional_timestamp"
    )]
    due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    order: i64,
}

impl TryFrom<TodoRecord> for Todo {
    type Error = TodoValidationError;

    fn try_from(record: TodoRecord) -> Result<Self, Self::Error> {
        let todo = Self {
            id: record.id,
            title: record.title,
            description: record.description,
            completed: record.completed,
            priority: record.priority,
            created_at: record.created_at.trunc_subsecs(3),
            updated_at: record.updated_at.trunc_subsecs(3),
            due_date: record.due_date.map(|due| due.trunc_subsecs(3)),
            order: record.order,
        };
        todo.validate()?;
        Ok(todo)
    }
}

impl From<Todo> for TodoRecord {
    fn from(todo: Todo) -> Self {
        Self {
            id: todo.id,
            title: todo.title,
            description: todo.description,
            completed: todo.completed,
            priority: todo.priority,
            created_at: todo.created_at,
            updated_at: todo.updated_at,
            due_date: todo.due_date,
            order: todo.order,
        }
    }
}

fn serialize_timestamp<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&iso8601(value))
}

fn serialize_optional_timestamp<S>(
    value: &Option<DateTime<Utc>>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(value) => serializer.serialize_str(&iso8601(value)),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::{NewTodo, Todo};
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn days_until_due_rounds_up_partial_days() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let todo = Todo::create_at(
            NewTodo::new("ship").with_due_date(now + Duration::hours(25)),
            now,
        )
        .unwrap();
        assert_eq!(todo.days_until_due_at(now), Some(2));
    }

    #[test]
    fn days_until_due_is_negative_for_past_due_dates() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let todo = Todo::create_at(
            NewTodo::new("late").with_due_date(now - Duration::hours(36)),
            now,
        )
        .unwrap();
        assert_eq!(todo.days_until_due_at(now), Some(-1));
    }

    #[test]
    fn touch_never_moves_updated_at_before_created_at() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let mut todo = Todo::create_at(NewTodo::new("clock skew"), now).unwrap();
        todo.touch(now - Duration::minutes(5));
        assert_eq!(todo.updated_at, todo.created_at);
    }
}
