use crate::error::AppError;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    /// Sort rank; lower ranks are listed first.
    pub fn rank(self) -> u8 {
        match self {
            Self::High => 0,
            Self::Medium => 1,
            Self::Low => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, AppError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            other => Err(AppError::invalid_data(format!("unknown priority '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<OffsetDateTime>,
    pub priority: Priority,
    pub completed: bool,
    pub category_id: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub user_id: String,
}

/// Due date as it crosses the wire on writes.
///
/// `Unchanged` omits the field, `Cleared` sends `null`, `At` sends an
/// ISO-8601 instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DueDate {
    #[default]
    Unchanged,
    Cleared,
    At(OffsetDateTime),
}

impl DueDate {
    pub fn is_unchanged(&self) -> bool {
        matches!(self, Self::Unchanged)
    }

    pub fn instant(&self) -> Option<OffsetDateTime> {
        match self {
            Self::At(at) => Some(*at),
            Self::Unchanged | Self::Cleared => None,
        }
    }
}

impl From<Option<OffsetDateTime>> for DueDate {
    fn from(value: Option<OffsetDateTime>) -> Self {
        match value {
            Some(at) => Self::At(at),
            None => Self::Cleared,
        }
    }
}

/// Fields a user submits when adding or editing a task.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaskDraft {
    pub title: String,
    pub description: Option<String>,
    pub due_date: DueDate,
    pub priority: Priority,
    pub category_id: Option<String>,
}

impl TaskDraft {
    pub fn new<T: Into<String>>(title: T) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Pre-fills a draft from an existing task, the way an edit form does.
    pub fn from_task(task: &Task) -> Self {
        Self {
            title: task.title.clone(),
            description: task.description.clone(),
            due_date: DueDate::from(task.due_date),
            priority: task.priority,
            category_id: task.category_id.clone(),
        }
    }

    /// Trims text fields and rejects a blank title.
    pub fn validated(&self) -> Result<TaskDraft, AppError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(AppError::validation("title", "Title is required"));
        }

        let description = self
            .description
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);
        let category_id = self
            .category_id
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);

        Ok(TaskDraft {
            title: title.to_string(),
            description,
            due_date: self.due_date,
            priority: self.priority,
            category_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{DueDate, Priority, TaskDraft};
    use time::macros::datetime;

    #[test]
    fn priority_rank_orders_high_first() {
        assert!(Priority::High.rank() < Priority::Medium.rank());
        assert!(Priority::Medium.rank() < Priority::Low.rank());
    }

    #[test]
    fn priority_parse_accepts_any_case() {
        assert_eq!(Priority::parse(" HIGH ").unwrap(), Priority::High);
        assert_eq!(Priority::parse("low").unwrap(), Priority::Low);
        assert_eq!(Priority::parse("urgent").unwrap_err().code(), "invalid_data");
    }

    #[test]
    fn draft_defaults_to_medium_without_due_date() {
        let draft = TaskDraft::new("Buy milk");
        assert_eq!(draft.priority, Priority::Medium);
        assert_eq!(draft.due_date, DueDate::Unchanged);
    }

    #[test]
    fn validated_draft_trims_and_drops_blank_fields() {
        let draft = TaskDraft {
            title: "  Buy milk ".to_string(),
            description: Some("   ".to_string()),
            due_date: DueDate::At(datetime!(2025-07-05 10:00 UTC)),
            priority: Priority::High,
            category_id: Some(String::new()),
        };

        let validated = draft.validated().unwrap();
        assert_eq!(validated.title, "Buy milk");
        assert_eq!(validated.description, None);
        assert_eq!(validated.category_id, None);
        assert_eq!(validated.priority, Priority::High);
    }

    #[test]
    fn validated_draft_rejects_blank_title() {
        let err = TaskDraft::new("   ").validated().unwrap_err();
        assert_eq!(err.code(), "validation");
        assert_eq!(err.message(), "Title is required");
    }

    #[test]
    fn due_date_from_option_distinguishes_cleared() {
        assert_eq!(DueDate::from(None), DueDate::Cleared);
        let at = datetime!(2025-07-05 10:00 UTC);
        assert_eq!(DueDate::from(Some(at)).instant(), Some(at));
    }
}
