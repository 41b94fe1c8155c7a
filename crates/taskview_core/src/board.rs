//! Task board view model: the fetched collections, the active criteria and
//! the write operations behind the task list page.

use crate::error::AppError;
use crate::model::{Category, CategoryDraft, FilterCriteria, Task, TaskDraft};
use crate::notify::{Notice, Notifier, deliver};
use crate::remote::RowStore;
use crate::task_store::TaskStore;
use crate::view::{EmptyState, TaskView, filter_sort_group, resolve_category};
use std::sync::Arc;
use time::OffsetDateTime;

/// Writes report their outcome through the notifier. Remote failures end
/// there and come back as `Ok(None)`; only validation errors are returned,
/// since they block the submission.
pub struct TaskBoard<R> {
    store: TaskStore<R>,
    notifier: Arc<dyn Notifier>,
    tasks: Vec<Task>,
    categories: Vec<Category>,
    criteria: FilterCriteria,
}

impl<R: RowStore> TaskBoard<R> {
    pub fn new(store: TaskStore<R>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store,
            notifier,
            tasks: Vec::new(),
            categories: Vec::new(),
            criteria: FilterCriteria::default(),
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn set_criteria(&mut self, criteria: FilterCriteria) {
        self.criteria = criteria;
    }

    pub fn clear_filters(&mut self) {
        self.criteria = FilterCriteria::default();
    }

    pub fn view(&self, now: OffsetDateTime) -> TaskView {
        filter_sort_group(&self.tasks, &self.criteria, now)
    }

    /// What to show instead of an empty view, `None` when it has groups.
    pub fn empty_state(&self, view: &TaskView) -> Option<EmptyState> {
        view.is_empty()
            .then(|| EmptyState::for_collection(self.tasks.len()))
    }

    pub fn category_for(&self, task: &Task) -> Option<&Category> {
        resolve_category(task, &self.categories)
    }

    /// Re-fetches both collections. Read failures are returned; the
    /// previously loaded data is kept.
    pub async fn refresh(&mut self) -> Result<(), AppError> {
        let tasks = self.store.list_tasks().await?;
        let categories = self.store.list_categories().await?;
        self.tasks = tasks;
        self.categories = categories;
        Ok(())
    }

    pub async fn add_task(&mut self, draft: &TaskDraft) -> Result<Option<Task>, AppError> {
        let result = self.store.create_task(draft).await;
        let created = self.settle(
            result,
            Notice::success("Task created")
                .with_description("Your task has been successfully created."),
            "create task",
        )?;
        if created.is_some() {
            self.reload_tasks().await;
        }
        Ok(created)
    }

    pub async fn edit_task(&mut self, id: &str, draft: &TaskDraft) -> Result<Option<Task>, AppError> {
        let result = self.store.update_task(id, draft).await;
        let updated = self.settle(
            result,
            Notice::success("Task updated").with_description("Your changes have been saved."),
            "update task",
        )?;
        if updated.is_some() {
            self.reload_tasks().await;
        }
        Ok(updated)
    }

    /// Flips completion of a loaded task. Succeeds silently.
    pub async fn toggle_complete(&mut self, id: &str) -> Result<Option<Task>, AppError> {
        let completed = self
            .tasks
            .iter()
            .find(|task| task.id == id)
            .map(|task| task.completed)
            .ok_or_else(|| AppError::validation("id", format!("unknown task '{id}'")))?;

        match self.store.set_completed(id, !completed).await {
            Ok(task) => {
                self.reload_tasks().await;
                Ok(Some(task))
            }
            Err(err) => {
                self.report_failure(&err, "update task");
                Ok(None)
            }
        }
    }

    pub async fn delete_task(&mut self, id: &str) -> Result<bool, AppError> {
        let result = self.store.delete_task(id).await;
        let deleted = self
            .settle(
                result,
                Notice::success("Task deleted")
                    .with_description("Task has been permanently removed."),
                "delete task",
            )?
            .is_some();
        if deleted {
            self.reload_tasks().await;
        }
        Ok(deleted)
    }

    pub async fn add_category(&mut self, draft: &CategoryDraft) -> Result<Option<Category>, AppError> {
        let result = self.store.create_category(draft).await;
        let created = self.settle(
            result,
            Notice::success("Category created").with_description("New category has been created."),
            "create category",
        )?;
        if created.is_some() {
            match self.store.list_categories().await {
                Ok(categories) => self.categories = categories,
                Err(err) => tracing::warn!(error = %err, "keeping stale categories"),
            }
        }
        Ok(created)
    }

    fn settle<T>(
        &self,
        result: Result<T, AppError>,
        success: Notice,
        action: &str,
    ) -> Result<Option<T>, AppError> {
        match result {
            Ok(value) => {
                deliver(self.notifier.as_ref(), &success);
                Ok(Some(value))
            }
            Err(err @ AppError::Validation { .. }) => Err(err),
            Err(err) => {
                self.report_failure(&err, action);
                Ok(None)
            }
        }
    }

    fn report_failure(&self, err: &AppError, action: &str) {
        tracing::warn!(error = %err, action, "task board write failed");
        let notice =
            Notice::error("Error").with_description(format!("Failed to {action}. Please try again."));
        deliver(self.notifier.as_ref(), &notice);
    }

    async fn reload_tasks(&mut self) {
        match self.store.list_tasks().await {
            Ok(tasks) => self.tasks = tasks,
            Err(err) => tracing::warn!(error = %err, "keeping stale tasks"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::TaskBoard;
    use crate::error::AppError;
    use crate::model::{CategoryDraft, FilterCriteria, Priority, PriorityFilter, TaskDraft};
    use crate::notify::{NoticeKind, RecordingNotifier};
    use crate::remote::Table;
    use crate::remote::memory::MemoryRowStore;
    use crate::task_store::TaskStore;
    use crate::view::EmptyState;
    use serde_json::json;
    use std::sync::Arc;
    use time::macros::datetime;

    fn board() -> (TaskBoard<MemoryRowStore>, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::new());
        let board = TaskBoard::new(
            TaskStore::new(MemoryRowStore::new("user-1")),
            notifier.clone(),
        );
        (board, notifier)
    }

    #[tokio::test]
    async fn add_task_notifies_and_refetches() {
        let (mut board, notifier) = board();

        let created = board.add_task(&TaskDraft::new("Buy milk")).await.unwrap();

        assert_eq!(created.unwrap().title, "Buy milk");
        assert_eq!(board.tasks().len(), 1);
        let notices = notifier.take();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].title, "Task created");
        assert_eq!(notices[0].kind, NoticeKind::Success);
    }

    #[tokio::test]
    async fn blank_title_is_returned_without_notice() {
        let (mut board, notifier) = board();

        let err = board.add_task(&TaskDraft::new("   ")).await.unwrap_err();

        assert_eq!(err.code(), "validation");
        assert!(notifier.notices().is_empty());
        assert!(board.store.remote().rows(Table::Tasks).is_empty());
    }

    #[tokio::test]
    async fn remote_failure_becomes_a_notice() {
        let (mut board, notifier) = board();
        board
            .store
            .remote()
            .fail_next(AppError::network("connection reset"));

        let created = board.add_task(&TaskDraft::new("Buy milk")).await.unwrap();

        assert!(created.is_none());
        let notices = notifier.take();
        assert_eq!(notices[0].kind, NoticeKind::Error);
        assert_eq!(
            notices[0].description.as_deref(),
            Some("Failed to create task. Please try again.")
        );
    }

    #[tokio::test]
    async fn toggle_flips_completion() {
        let (mut board, notifier) = board();
        let task = board
            .add_task(&TaskDraft::new("Buy milk"))
            .await
            .unwrap()
            .unwrap();
        notifier.take();

        let toggled = board.toggle_complete(&task.id).await.unwrap().unwrap();
        assert!(toggled.completed);
        assert!(board.tasks()[0].completed);

        let toggled = board.toggle_complete(&task.id).await.unwrap().unwrap();
        assert!(!toggled.completed);
        assert!(notifier.notices().is_empty());
    }

    #[tokio::test]
    async fn toggle_of_unknown_task_is_rejected() {
        let (mut board, _) = board();
        let err = board.toggle_complete("missing").await.unwrap_err();
        assert_eq!(err.code(), "validation");
    }

    #[tokio::test]
    async fn edit_and_delete_round_through_the_store() {
        let (mut board, notifier) = board();
        let task = board
            .add_task(&TaskDraft::new("Buy milk"))
            .await
            .unwrap()
            .unwrap();

        let mut draft = TaskDraft::from_task(&task);
        draft.priority = Priority::High;
        let edited = board.edit_task(&task.id, &draft).await.unwrap().unwrap();
        assert_eq!(edited.priority, Priority::High);

        assert!(board.delete_task(&task.id).await.unwrap());
        assert!(board.tasks().is_empty());

        let titles: Vec<String> = notifier
            .take()
            .into_iter()
            .map(|notice| notice.title)
            .collect();
        assert_eq!(titles, vec!["Task created", "Task updated", "Task deleted"]);
    }

    #[tokio::test]
    async fn add_category_refreshes_categories() {
        let (mut board, notifier) = board();

        let category = board
            .add_category(&CategoryDraft::new("Errands"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(board.categories().len(), 1);
        assert_eq!(notifier.take()[0].title, "Category created");

        board
            .store
            .remote()
            .seed(
                Table::Tasks,
                vec![json!({
                    "id": "t1",
                    "title": "Groceries",
                    "priority": "low",
                    "category_id": category.id,
                    "created_at": "2025-07-01T08:00:00Z",
                    "updated_at": "2025-07-01T08:00:00Z",
                    "user_id": "user-1"
                })],
            );
        board.refresh().await.unwrap();
        let task = &board.tasks()[0];
        assert_eq!(board.category_for(task).unwrap().name, "Errands");
    }

    #[tokio::test]
    async fn empty_state_distinguishes_no_tasks_from_no_matches() {
        let (mut board, _) = board();
        let now = datetime!(2025-07-05 12:00 UTC);

        let view = board.view(now);
        assert_eq!(board.empty_state(&view), Some(EmptyState::NoTasks));

        board.add_task(&TaskDraft::new("Buy milk")).await.unwrap();
        board.set_criteria(FilterCriteria {
            priority: PriorityFilter::Only(Priority::High),
            ..FilterCriteria::default()
        });
        let view = board.view(now);
        assert_eq!(board.empty_state(&view), Some(EmptyState::NoMatches));

        board.clear_filters();
        let view = board.view(now);
        assert_eq!(board.empty_state(&view), None);
        assert_eq!(view.len(), 1);
    }
}
