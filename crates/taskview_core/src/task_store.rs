//! Typed task and category operations over a [`RowStore`].
//!
//! The only logic here is the boundary mapping: wire rows use snake_case
//! field names and carry instants as ISO-8601 strings, which are parsed on
//! the way in and formatted on the way out.

use crate::error::AppError;
use crate::model::{Category, CategoryDraft, DueDate, Priority, Task, TaskDraft};
use crate::remote::{Order, RowStore, Table};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRow {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    pub priority: Priority,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub category_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRow {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Serialize)]
struct TaskWrite<'a> {
    title: &'a str,
    description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    due_date: Option<Option<String>>,
    priority: Priority,
    category_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    updated_at: Option<String>,
}

#[derive(Debug, Serialize)]
struct CompletionWrite {
    completed: bool,
    updated_at: String,
}

#[derive(Debug, Serialize)]
struct CategoryWrite<'a> {
    name: &'a str,
    color: Option<&'a str>,
}

pub fn parse_instant(field: &str, raw: &str) -> Result<OffsetDateTime, AppError> {
    OffsetDateTime::parse(raw.trim(), &Rfc3339)
        .map_err(|_| AppError::invalid_data(format!("{field} must be RFC3339")))
}

pub fn format_instant(instant: OffsetDateTime) -> Result<String, AppError> {
    instant
        .format(&Rfc3339)
        .map_err(|err| AppError::invalid_data(err.to_string()))
}

impl TryFrom<TaskRow> for Task {
    type Error = AppError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        let due_date = match row.due_date.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(parse_instant("due_date", raw)?),
        };
        let created_at = parse_instant("created_at", &row.created_at)?;
        let updated_at = parse_instant("updated_at", &row.updated_at)?;
        if updated_at < created_at {
            return Err(AppError::invalid_data(format!(
                "task {} has updated_at before created_at",
                row.id
            )));
        }

        Ok(Task {
            id: row.id,
            title: row.title,
            description: row.description,
            due_date,
            priority: row.priority,
            completed: row.completed,
            category_id: row.category_id,
            created_at,
            updated_at,
            user_id: row.user_id,
        })
    }
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Category {
            id: row.id,
            name: row.name,
            color: row.color,
        }
    }
}

pub fn task_from_value(value: Value) -> Result<Task, AppError> {
    let row: TaskRow =
        serde_json::from_value(value).map_err(|err| AppError::invalid_data(err.to_string()))?;
    Task::try_from(row)
}

pub fn category_from_value(value: Value) -> Result<Category, AppError> {
    let row: CategoryRow =
        serde_json::from_value(value).map_err(|err| AppError::invalid_data(err.to_string()))?;
    Ok(Category::from(row))
}

fn due_date_field(due_date: &DueDate) -> Result<Option<Option<String>>, AppError> {
    match due_date {
        DueDate::Unchanged => Ok(None),
        DueDate::Cleared => Ok(Some(None)),
        DueDate::At(at) => Ok(Some(Some(format_instant(*at)?))),
    }
}

fn task_write(draft: &TaskDraft, updated_at: Option<OffsetDateTime>) -> Result<Value, AppError> {
    let write = TaskWrite {
        title: &draft.title,
        description: draft.description.as_deref(),
        due_date: due_date_field(&draft.due_date)?,
        priority: draft.priority,
        category_id: draft.category_id.as_deref(),
        updated_at: updated_at.map(format_instant).transpose()?,
    };
    to_value(&write)
}

fn to_value<T: Serialize>(value: &T) -> Result<Value, AppError> {
    serde_json::to_value(value).map_err(|err| AppError::invalid_data(err.to_string()))
}

fn require_id(id: &str) -> Result<&str, AppError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation("id", "id is required"));
    }
    Ok(trimmed)
}

/// Client for the signed-in user's tasks and categories.
#[derive(Debug)]
pub struct TaskStore<R> {
    remote: R,
}

impl<R: RowStore> TaskStore<R> {
    pub fn new(remote: R) -> Self {
        Self { remote }
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// Newest first.
    pub async fn list_tasks(&self) -> Result<Vec<Task>, AppError> {
        let rows = self
            .remote
            .select(Table::Tasks, &Order::descending("created_at"))
            .await
            .inspect_err(|err| tracing::error!(error = %err, "failed to fetch tasks"))?;
        rows.into_iter().map(task_from_value).collect()
    }

    pub async fn create_task(&self, draft: &TaskDraft) -> Result<Task, AppError> {
        let draft = draft.validated()?;
        let row = task_write(&draft, None)?;
        let stored = self
            .remote
            .insert(Table::Tasks, row)
            .await
            .inspect_err(|err| tracing::error!(error = %err, "failed to create task"))?;
        task_from_value(stored)
    }

    pub async fn update_task(&self, id: &str, draft: &TaskDraft) -> Result<Task, AppError> {
        let id = require_id(id)?;
        let draft = draft.validated()?;
        let patch = task_write(&draft, Some(OffsetDateTime::now_utc()))?;
        let stored = self
            .remote
            .update(Table::Tasks, id, patch)
            .await
            .inspect_err(|err| tracing::error!(task_id = id, error = %err, "failed to update task"))?;
        task_from_value(stored)
    }

    pub async fn set_completed(&self, id: &str, completed: bool) -> Result<Task, AppError> {
        let id = require_id(id)?;
        let patch = to_value(&CompletionWrite {
            completed,
            updated_at: format_instant(OffsetDateTime::now_utc())?,
        })?;
        let stored = self
            .remote
            .update(Table::Tasks, id, patch)
            .await
            .inspect_err(|err| {
                tracing::error!(task_id = id, error = %err, "failed to toggle task completion")
            })?;
        task_from_value(stored)
    }

    pub async fn delete_task(&self, id: &str) -> Result<(), AppError> {
        let id = require_id(id)?;
        self.remote
            .delete(Table::Tasks, id)
            .await
            .inspect_err(|err| tracing::error!(task_id = id, error = %err, "failed to delete task"))
    }

    /// Alphabetical by name.
    pub async fn list_categories(&self) -> Result<Vec<Category>, AppError> {
        let rows = self
            .remote
            .select(Table::Categories, &Order::ascending("name"))
            .await
            .inspect_err(|err| tracing::error!(error = %err, "failed to fetch categories"))?;
        rows.into_iter().map(category_from_value).collect()
    }

    pub async fn create_category(&self, draft: &CategoryDraft) -> Result<Category, AppError> {
        let draft = draft.validated()?;
        let row = to_value(&CategoryWrite {
            name: &draft.name,
            color: draft.color.as_deref(),
        })?;
        let stored = self
            .remote
            .insert(Table::Categories, row)
            .await
            .inspect_err(|err| tracing::error!(error = %err, "failed to create category"))?;
        category_from_value(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::{TaskStore, task_from_value, task_write};
    use crate::error::AppError;
    use crate::model::{CategoryDraft, DueDate, Priority, TaskDraft};
    use crate::remote::Table;
    use crate::remote::memory::MemoryRowStore;
    use serde_json::json;
    use time::macros::datetime;

    fn row(id: &str, created_at: &str) -> serde_json::Value {
        json!({
            "id": id,
            "title": format!("task {id}"),
            "description": null,
            "due_date": null,
            "priority": "medium",
            "completed": false,
            "category_id": null,
            "created_at": created_at,
            "updated_at": created_at,
            "user_id": "user-1"
        })
    }

    #[test]
    fn maps_wire_row_to_task() {
        let task = task_from_value(json!({
            "id": "t1",
            "title": "Buy groceries",
            "description": "milk",
            "due_date": "2025-07-05T10:00:00.123456+00:00",
            "priority": "high",
            "completed": true,
            "category_id": "cat-1",
            "created_at": "2025-07-01T08:00:00Z",
            "updated_at": "2025-07-02T08:00:00Z",
            "user_id": "user-1"
        }))
        .unwrap();

        assert_eq!(task.title, "Buy groceries");
        assert_eq!(task.priority, Priority::High);
        assert!(task.completed);
        assert_eq!(task.category_id.as_deref(), Some("cat-1"));
        assert_eq!(
            task.due_date,
            Some(datetime!(2025-07-05 10:00:00.123456 UTC))
        );
        assert_eq!(task.created_at, datetime!(2025-07-01 08:00 UTC));
    }

    #[test]
    fn absent_null_and_blank_due_dates_normalize_to_none() {
        let mut absent = row("t1", "2025-07-01T08:00:00Z");
        absent.as_object_mut().unwrap().remove("due_date");
        let mut blank = row("t2", "2025-07-01T08:00:00Z");
        blank["due_date"] = json!("");

        assert_eq!(task_from_value(absent).unwrap().due_date, None);
        assert_eq!(task_from_value(row("t3", "2025-07-01T08:00:00Z")).unwrap().due_date, None);
        assert_eq!(task_from_value(blank).unwrap().due_date, None);
    }

    #[test]
    fn rejects_updated_before_created() {
        let mut bad = row("t1", "2025-07-02T08:00:00Z");
        bad["updated_at"] = json!("2025-07-01T08:00:00Z");
        let err = task_from_value(bad).unwrap_err();
        assert_eq!(err.code(), "invalid_data");
    }

    #[test]
    fn rejects_malformed_dates_and_priorities() {
        let mut bad_date = row("t1", "2025-07-01T08:00:00Z");
        bad_date["due_date"] = json!("next tuesday");
        assert_eq!(
            task_from_value(bad_date).unwrap_err().message(),
            "due_date must be RFC3339"
        );

        let mut bad_priority = row("t2", "2025-07-01T08:00:00Z");
        bad_priority["priority"] = json!("urgent");
        assert_eq!(task_from_value(bad_priority).unwrap_err().code(), "invalid_data");
    }

    #[test]
    fn write_omits_unchanged_due_date_and_nulls_cleared_one() {
        let mut draft = TaskDraft::new("Plan trip");
        let unchanged = task_write(&draft, None).unwrap();
        assert!(unchanged.get("due_date").is_none());
        assert!(unchanged.get("updated_at").is_none());

        draft.due_date = DueDate::Cleared;
        let cleared = task_write(&draft, None).unwrap();
        assert!(cleared["due_date"].is_null());

        draft.due_date = DueDate::At(datetime!(2025-07-05 10:00 UTC));
        let set = task_write(&draft, Some(datetime!(2025-07-01 09:00 UTC))).unwrap();
        assert_eq!(set["due_date"], "2025-07-05T10:00:00Z");
        assert_eq!(set["updated_at"], "2025-07-01T09:00:00Z");
        assert_eq!(set["priority"], "medium");
    }

    #[tokio::test]
    async fn list_tasks_returns_newest_first() {
        let remote = MemoryRowStore::new("user-1");
        remote.seed(
            Table::Tasks,
            vec![
                row("old", "2025-06-01T08:00:00Z"),
                row("new", "2025-07-01T08:00:00Z"),
            ],
        );
        let store = TaskStore::new(remote);

        let tasks = store.list_tasks().await.unwrap();
        let ids: Vec<&str> = tasks.iter().map(|task| task.id.as_str()).collect();
        assert_eq!(ids, ["new", "old"]);
    }

    #[tokio::test]
    async fn create_task_defaults_to_incomplete() {
        let store = TaskStore::new(MemoryRowStore::new("user-1"));
        let mut draft = TaskDraft::new("  Buy groceries ");
        draft.due_date = DueDate::At(datetime!(2025-07-05 10:00 UTC));

        let task = store.create_task(&draft).await.unwrap();
        assert_eq!(task.title, "Buy groceries");
        assert!(!task.completed);
        assert_eq!(task.user_id, "user-1");
        assert!(task.updated_at >= task.created_at);
        assert_eq!(task.due_date, Some(datetime!(2025-07-05 10:00 UTC)));
    }

    #[tokio::test]
    async fn create_task_blocks_blank_title_locally() {
        let remote = MemoryRowStore::new("user-1");
        let store = TaskStore::new(remote);

        let err = store.create_task(&TaskDraft::new(" ")).await.unwrap_err();
        assert_eq!(err.code(), "validation");
        assert!(store.remote().rows(Table::Tasks).is_empty());
    }

    #[tokio::test]
    async fn update_and_complete_round_through_remote() {
        let store = TaskStore::new(MemoryRowStore::new("user-1"));
        let created = store.create_task(&TaskDraft::new("Draft")).await.unwrap();

        let mut draft = TaskDraft::from_task(&created);
        draft.title = "Final".to_string();
        draft.priority = Priority::High;
        let updated = store.update_task(&created.id, &draft).await.unwrap();
        assert_eq!(updated.title, "Final");
        assert_eq!(updated.priority, Priority::High);
        assert!(updated.updated_at >= updated.created_at);

        let completed = store.set_completed(&created.id, true).await.unwrap();
        assert!(completed.completed);

        store.delete_task(&created.id).await.unwrap();
        assert!(store.list_tasks().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn blank_id_is_rejected_before_remote_call() {
        let store = TaskStore::new(MemoryRowStore::new("user-1"));
        let err = store.set_completed("  ", true).await.unwrap_err();
        assert_eq!(err.code(), "validation");
        assert_eq!(store.delete_task("").await.unwrap_err().code(), "validation");
    }

    #[tokio::test]
    async fn remote_errors_pass_through() {
        let remote = MemoryRowStore::new("user-1");
        remote.fail_next(AppError::remote_rejection("permission denied for table tasks"));
        let store = TaskStore::new(remote);

        let err = store.list_tasks().await.unwrap_err();
        assert_eq!(err, AppError::remote_rejection("permission denied for table tasks"));
    }

    #[tokio::test]
    async fn categories_are_listed_by_name() {
        let store = TaskStore::new(MemoryRowStore::new("user-1"));
        store.create_category(&CategoryDraft::new("Work")).await.unwrap();
        let home = store.create_category(&CategoryDraft::new("Home")).await.unwrap();
        assert_eq!(home.color.as_deref(), Some("#8B5CF6"));

        let names: Vec<String> = store
            .list_categories()
            .await
            .unwrap()
            .into_iter()
            .map(|category| category.name)
            .collect();
        assert_eq!(names, ["Home", "Work"]);
    }
}
