//! Command handlers. Each handler drives the core services the way an
//! interactive front end would: mutate the store, then surface a toast.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::{Arc, MutexGuard, PoisonError};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use log::{info, warn};
use tokio::runtime::Handle;
use todo_core::db::DbError;
use todo_core::{
    ConfigError, ConfirmOptions, ConfirmationService, CoreConfig, DialogKind, FilterPatch,
    ImportError, NewTodo, NoopDesktopNotifier, NotificationService, PendingConfirmation,
    ReminderService, SharedTodoStore, SqliteKeyValueStore, StoreError, Todo, TodoId, TodoPatch,
    TodoStore,
};

use crate::cli::{AddArgs, EditArgs, ExportArgs, ImportArgs, ListArgs, MoveArgs, RemindArgs};

type CliStore = SharedTodoStore<SqliteKeyValueStore>;

#[derive(Debug)]
pub enum CliError {
    Config(ConfigError),
    Db(DbError),
    Store(StoreError),
    Import(ImportError),
    Io(io::Error),
    UnknownId(String),
    AmbiguousId(String),
    InvalidDate(String),
    NothingToChange,
}

impl Display for CliError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "database error: {err}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::Import(err) => write!(f, "{err}"),
            Self::Io(err) => write!(f, "{err}"),
            Self::UnknownId(id) => write!(f, "no todo matches `{id}`"),
            Self::AmbiguousId(id) => write!(f, "`{id}` matches more than one todo"),
            Self::InvalidDate(value) => write!(
                f,
                "invalid date `{value}`; expected RFC 3339, `YYYY-MM-DD HH:MM` or `YYYY-MM-DD`"
            ),
            Self::NothingToChange => write!(f, "no changes given"),
        }
    }
}

impl Error for CliError {}

impl From<ConfigError> for CliError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<DbError> for CliError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<StoreError> for CliError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<io::Error> for CliError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

/// Wired services for one CLI invocation.
pub struct App {
    store: CliStore,
    notifications: NotificationService,
    confirmations: ConfirmationService,
    config: CoreConfig,
    assume_yes: bool,
}

impl App {
    pub fn open(db: &Path, config: CoreConfig, assume_yes: bool) -> Result<Self, CliError> {
        let storage = SqliteKeyValueStore::open(db)?;
        let store = TodoStore::open(storage, config.store.clone()).into_shared();

        let notifications = NotificationService::new(config.toasts.clone(), Handle::current());
        let mut last_printed = None;
        notifications.subscribe(move |toasts| {
            for toast in toasts.iter() {
                if !last_printed.map_or(true, |last| toast.id > last) {
                    continue;
                }
                eprintln!("[{}] {}", toast.kind.as_str(), toast.message);
                last_printed = Some(toast.id);
            }
        });

        let confirmations = ConfirmationService::new();
        if !assume_yes {
            confirmations.subscribe(|dialog| {
                if let Some(dialog) = dialog {
                    eprint!(
                        "{}\n{} [y = {}, n = {}] ",
                        dialog.title, dialog.message, dialog.confirm_text, dialog.cancel_text
                    );
                    let _ = io::stderr().flush();
                }
            });
        }

        Ok(Self {
            store,
            notifications,
            confirmations,
            config,
            assume_yes,
        })
    }

    /// Writes the final list, surfacing storage failures.
    pub fn finish(&self) -> Result<(), CliError> {
        self.store().flush()?;
        Ok(())
    }

    pub fn add(&self, args: AddArgs) -> Result<(), CliError> {
        let mut input = NewTodo::new(args.title);
        if let Some(description) = args.description {
            input = input.with_description(description);
        }
        if let Some(priority) = args.priority {
            input = input.with_priority(priority.into());
        }
        if let Some(due) = args.due.as_deref() {
            input = input.with_due_date(parse_due(due)?);
        }

        let created = self.store().add_todo(input).inspect_err(|err| {
            self.notifications.error(format!("Failed to add todo: {err}"), None);
        })?;
        self.notifications.success("Todo added successfully", None);
        println!("{}", created.id);
        Ok(())
    }

    pub fn list(&self, args: ListArgs) -> Result<(), CliError> {
        let snapshot = {
            let mut store = self.store();
            store.set_filter(FilterPatch {
                status: Some(args.status.into()),
                priority: Some(args.priority.map(Into::into)),
                search_term: Some(args.search.unwrap_or_default()),
            });
            store.snapshot()
        };

        let filtered = snapshot.filtered();
        if snapshot.filter().has_active_filters() {
            println!("{}", snapshot.filter().describe());
        }
        if filtered.is_empty() {
            println!("No todos found");
            return Ok(());
        }

        let now = Utc::now();
        for todo in &filtered {
            println!("{}", summary_line(todo, now));
        }
        let stats = snapshot.stats();
        println!(
            "{} shown / {} total ({} active, {} completed)",
            filtered.len(),
            stats.total,
            stats.active,
            stats.completed
        );
        Ok(())
    }

    pub fn show(&self, raw_id: &str) -> Result<(), CliError> {
        let todo = self.find(raw_id)?;
        let now = Utc::now();

        println!("id:          {}", todo.id);
        println!("title:       {}", todo.title);
        if let Some(description) = &todo.description {
            println!("description: {description}");
        }
        println!(
            "status:      {}",
            if todo.completed { "completed" } else { "active" }
        );
        println!("priority:    {}", todo.priority.as_str());
        println!("created:     {}", todo.created_at.to_rfc3339());
        println!("updated:     {}", todo.updated_at.to_rfc3339());
        if let Some(due) = todo.due_date {
            let days = todo.days_until_due_at(now).unwrap_or_default();
            let note = if todo.is_overdue_at(now) {
                " (overdue)".to_string()
            } else {
                format!(" ({days} day(s) left)")
            };
            println!("due:         {}{note}", due.to_rfc3339());
        }
        println!("position:    {}", todo.order);
        Ok(())
    }

    pub fn edit(&self, args: EditArgs) -> Result<(), CliError> {
        let id = self.resolve_id(&args.id)?;
        let patch = TodoPatch {
            title: args.title,
            description: if args.clear_description {
                Some(None)
            } else {
                args.description.map(Some)
            },
            priority: args.priority.map(Into::into),
            due_date: if args.clear_due {
                Some(None)
            } else {
                args.due.as_deref().map(parse_due).transpose()?.map(Some)
            },
            ..TodoPatch::default()
        };
        if patch.is_empty() {
            return Err(CliError::NothingToChange);
        }

        self.store().update_todo(&id, patch).inspect_err(|_| {
            self.notifications.error("Failed to update todo", None);
        })?;
        self.notifications.success("Todo updated successfully", None);
        Ok(())
    }

    pub fn toggle(&self, raw_id: &str) -> Result<(), CliError> {
        let id = self.resolve_id(raw_id)?;
        let mut store = self.store();
        store.toggle_todo(&id)?;
        let completed = store.get_todo(&id).is_some_and(|todo| todo.completed);
        drop(store);

        if completed {
            self.notifications.success("Todo completed", None);
        } else {
            self.notifications.info("Todo reopened", None);
        }
        Ok(())
    }

    pub async fn delete(&self, raw_id: &str) -> Result<(), CliError> {
        let todo = self.find(raw_id)?;
        let pending = self.confirmations.confirm_delete(Some(&todo.title));
        if !self.answer(pending).await? {
            info!("event=cli_delete module=cli status=cancelled id={}", todo.id);
            return Ok(());
        }

        self.store().delete_todo(&todo.id).inspect_err(|_| {
            self.notifications.error("Failed to delete todo", None);
        })?;
        self.notifications.success("Todo deleted successfully", None);
        Ok(())
    }

    pub fn move_to(&self, args: MoveArgs) -> Result<(), CliError> {
        let todo = self.find(&args.id)?;
        self.store().move_todo(&todo.id, args.to)?;
        self.notifications
            .success(format!("Moved \"{}\" to new position", todo.title), None);
        Ok(())
    }

    pub async fn clear_completed(&self) -> Result<(), CliError> {
        let count = self.store().stats().completed;
        if count == 0 {
            self.notifications.info("No completed todos to delete", None);
            return Ok(());
        }

        let pending = self.confirmations.confirm_bulk_delete(count);
        if !self.answer(pending).await? {
            return Ok(());
        }
        let removed = self.store().delete_completed();
        self.notifications
            .success(format!("Deleted {removed} completed todos"), None);
        Ok(())
    }

    pub fn complete_all(&self) {
        self.store().mark_all_complete();
        self.notifications.success("All todos marked as complete", None);
    }

    pub fn reopen_all(&self) {
        self.store().mark_all_incomplete();
        self.notifications.info("All todos marked as incomplete", None);
    }

    pub fn stats(&self) {
        let stats = self.store().stats();
        println!("total:     {}", stats.total);
        println!("active:    {}", stats.active);
        println!("completed: {}", stats.completed);
    }

    pub fn export(&self, args: ExportArgs) -> Result<(), CliError> {
        let (json, count) = {
            let store = self.store();
            (store.export_todos()?, store.todos().len())
        };
        match args.output {
            Some(path) => {
                std::fs::write(&path, json)?;
                self.notifications.success(
                    format!("Exported {count} todos to {}", path.display()),
                    None,
                );
            }
            None => println!("{json}"),
        }
        Ok(())
    }

    pub async fn import(&self, args: ImportArgs) -> Result<(), CliError> {
        let data = std::fs::read_to_string(&args.input)?;
        let pending = self.confirmations.confirm(ConfirmOptions {
            title: "Import Todos".to_string(),
            message: "Importing replaces every existing todo. Continue?".to_string(),
            confirm_text: Some("Import".to_string()),
            kind: Some(DialogKind::Warning),
            ..ConfirmOptions::default()
        });
        if !self.answer(pending).await? {
            return Ok(());
        }

        match self.store().import_todos(&data) {
            Ok(count) => {
                self.notifications
                    .success(format!("Imported {count} todos"), None);
                Ok(())
            }
            Err(err) => {
                self.notifications.error(err.message(), None);
                Err(CliError::Import(err))
            }
        }
    }

    pub fn sample(&self) -> Result<(), CliError> {
        let added = self.store().add_sample_data()?;
        self.notifications
            .success(format!("Added {added} sample todos"), None);
        Ok(())
    }

    pub async fn remind(&self, args: RemindArgs) -> Result<(), CliError> {
        let reminders = ReminderService::new(
            Arc::clone(&self.store),
            self.notifications.clone(),
            Arc::new(NoopDesktopNotifier),
            self.config.reminders.clone(),
            Handle::current(),
        );

        if args.once {
            let fired = reminders.check_due_todos();
            println!("{fired} reminder(s) fired");
            return Ok(());
        }

        reminders.start();
        eprintln!(
            "Watching due dates every {}s; press Ctrl-C to stop.",
            self.config.reminders.check_interval.as_secs()
        );
        tokio::signal::ctrl_c().await?;
        reminders.stop();
        Ok(())
    }

    fn store(&self) -> MutexGuard<'_, TodoStore<SqliteKeyValueStore>> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn find(&self, raw_id: &str) -> Result<Todo, CliError> {
        let id = self.resolve_id(raw_id)?;
        self.store()
            .get_todo(&id)
            .ok_or_else(|| CliError::UnknownId(raw_id.to_string()))
    }

    /// Exact id match first, then a unique prefix.
    fn resolve_id(&self, raw_id: &str) -> Result<TodoId, CliError> {
        let raw_id = raw_id.trim();
        let store = self.store();
        if let Some(todo) = store.todos().iter().find(|todo| todo.id.as_str() == raw_id) {
            return Ok(todo.id.clone());
        }

        let mut matches = store
            .todos()
            .iter()
            .filter(|todo| !raw_id.is_empty() && todo.id.as_str().starts_with(raw_id));
        match (matches.next(), matches.next()) {
            (Some(todo), None) => Ok(todo.id.clone()),
            (Some(_), Some(_)) => Err(CliError::AmbiguousId(raw_id.to_string())),
            _ => Err(CliError::UnknownId(raw_id.to_string())),
        }
    }

    /// Answers the open dialog from `--yes` or stdin, then awaits the result.
    async fn answer(&self, pending: PendingConfirmation) -> Result<bool, CliError> {
        let answer = if self.assume_yes {
            true
        } else {
            tokio::task::spawn_blocking(read_yes_no)
                .await
                .map_err(|err| CliError::Io(io::Error::other(err)))??
        };
        self.confirmations.close_dialog(answer);
        match pending.await {
            Ok(answer) => Ok(answer),
            Err(err) => {
                warn!("event=cli_confirm module=cli status=abandoned error={err}");
                Ok(false)
            }
        }
    }
}

fn read_yes_no() -> io::Result<bool> {
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(matches!(
        line.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}

fn summary_line(todo: &Todo, now: DateTime<Utc>) -> String {
    let mark = if todo.completed { "x" } else { " " };
    let short_id: String = todo.id.as_str().chars().take(8).collect();
    let mut line = format!(
        "[{mark}] {short_id}  {:<6}  {}",
        todo.priority.as_str(),
        todo.title
    );
    if let Some(due) = todo.due_date {
        line.push_str(&format!("  (due {})", due.format("%Y-%m-%d %H:%M")));
        if todo.is_overdue_at(now) {
            line.push_str(" OVERDUE");
        }
    }
    line
}

/// Accepts RFC 3339, `YYYY-MM-DD HH:MM` (UTC) or `YYYY-MM-DD` (UTC midnight).
fn parse_due(value: &str) -> Result<DateTime<Utc>, CliError> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M") {
        return Ok(parsed.and_utc());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
        .ok_or_else(|| CliError::InvalidDate(value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::{parse_due, summary_line, CliError};
    use chrono::{TimeZone, Utc};
    use todo_core::{NewTodo, Priority, Todo};

    #[test]
    fn parse_due_accepts_supported_formats() {
        let expected = Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap();
        assert_eq!(parse_due("2026-03-01T09:30:00Z").unwrap(), expected);
        assert_eq!(parse_due("2026-03-01T10:30:00+01:00").unwrap(), expected);
        assert_eq!(parse_due("2026-03-01 09:30").unwrap(), expected);
        assert_eq!(
            parse_due("2026-03-01").unwrap(),
            Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap()
        );
        assert!(matches!(
            parse_due("next tuesday"),
            Err(CliError::InvalidDate(_))
        ));
    }

    #[test]
    fn summary_line_flags_overdue_todos() {
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap();
        let todo = Todo::create_at(
            NewTodo::new("file taxes")
                .with_priority(Priority::High)
                .with_due_date(Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap()),
            Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap(),
        )
        .unwrap();

        let line = summary_line(&todo, now);
        assert!(line.starts_with("[ ] "));
        assert!(line.contains("high"));
        assert!(line.contains("file taxes"));
        assert!(line.ends_with("OVERDUE"));
    }
}
