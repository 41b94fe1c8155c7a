//! Filter-sort-group engine.
//!
//! Turns a task collection and a [`FilterCriteria`] into the grouped,
//! ordered structure the task list renders. Everything here is pure: the
//! caller supplies `now`, whose offset defines the local calendar day.

mod filter;
mod group;
mod order;

pub use filter::matches;
pub use group::{NO_DUE_DATE_LABEL, TODAY_LABEL, TOMORROW_LABEL, group_label};
pub use order::{compare_tasks, sort_tasks};

use crate::model::{Category, FilterCriteria, Task};
use time::{OffsetDateTime, UtcOffset};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskGroup {
    pub label: String,
    pub tasks: Vec<Task>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskView {
    /// No task survived filtering; the caller shows an empty state.
    Empty,
    Groups(Vec<TaskGroup>),
}

impl TaskView {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn groups(&self) -> &[TaskGroup] {
        match self {
            Self::Empty => &[],
            Self::Groups(groups) => groups,
        }
    }

    pub fn len(&self) -> usize {
        self.groups().iter().map(|group| group.tasks.len()).sum()
    }

    /// Tasks in display order with the group structure removed.
    pub fn flatten(&self) -> Vec<Task> {
        self.groups()
            .iter()
            .flat_map(|group| group.tasks.iter().cloned())
            .collect()
    }
}

/// Copy shown in place of an empty task list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyState {
    /// The user has no tasks at all.
    NoTasks,
    /// Tasks exist but the filters excluded all of them.
    NoMatches,
}

impl EmptyState {
    pub fn for_collection(total_tasks: usize) -> Self {
        if total_tasks == 0 {
            Self::NoTasks
        } else {
            Self::NoMatches
        }
    }

    pub fn title(self) -> &'static str {
        "No tasks found"
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::NoTasks => "Add your first task to get started!",
            Self::NoMatches => "Try adjusting your filters to see more tasks.",
        }
    }

    pub fn action_label(self) -> &'static str {
        match self {
            Self::NoTasks => "Add Task",
            Self::NoMatches => "Clear Filters",
        }
    }
}

pub fn filter_sort_group(
    tasks: &[Task],
    criteria: &FilterCriteria,
    now: OffsetDateTime,
) -> TaskView {
    let mut selected: Vec<Task> = tasks
        .iter()
        .filter(|task| matches(task, criteria, now))
        .cloned()
        .collect();

    if selected.is_empty() {
        return TaskView::Empty;
    }

    sort_tasks(&mut selected);
    TaskView::Groups(group::group_tasks(selected, now))
}

/// Category a task points at; dangling references read as uncategorized.
pub fn resolve_category<'a>(task: &Task, categories: &'a [Category]) -> Option<&'a Category> {
    let id = task.category_id.as_deref()?;
    categories.iter().find(|category| category.id == id)
}

/// The process's local offset. On unix this can only be read while the
/// process is single-threaded; hosts running inside a multi-threaded
/// runtime should resolve it at startup and use [`now_in`].
pub fn local_offset() -> UtcOffset {
    match UtcOffset::current_local_offset() {
        Ok(offset) => offset,
        Err(err) => {
            tracing::warn!(error = %err, "local offset unavailable; day boundaries use UTC");
            UtcOffset::UTC
        }
    }
}

pub fn now_in(offset: UtcOffset) -> OffsetDateTime {
    OffsetDateTime::now_utc().to_offset(offset)
}
