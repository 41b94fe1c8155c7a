mod category;
mod criteria;
mod session;
mod task;

pub use category::{CATEGORY_COLORS, Category, CategoryDraft, DEFAULT_CATEGORY_COLOR};
pub use criteria::{CategoryFilter, CompletionFilter, DueRange, FilterCriteria, PriorityFilter};
pub use session::{AuthEvent, AuthEventKind, Session, User};
pub use task::{DueDate, Priority, Task, TaskDraft};
