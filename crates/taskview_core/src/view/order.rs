use crate::model::Task;
use std::cmp::Ordering;
use time::OffsetDateTime;

/// Display order: open before completed, then priority, then due date
/// (dated first, earliest first), then newest creation first.
pub fn compare_tasks(a: &Task, b: &Task) -> Ordering {
    a.completed
        .cmp(&b.completed)
        .then_with(|| a.priority.rank().cmp(&b.priority.rank()))
        .then_with(|| compare_due(a.due_date, b.due_date))
        .then_with(|| b.created_at.cmp(&a.created_at))
}

fn compare_due(a: Option<OffsetDateTime>, b: Option<OffsetDateTime>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Stable sort; tasks that compare equal keep their input order.
pub fn sort_tasks(tasks: &mut [Task]) {
    tasks.sort_by(compare_tasks);
}
