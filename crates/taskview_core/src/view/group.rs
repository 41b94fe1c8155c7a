use crate::model::Task;
use crate::view::TaskGroup;
use time::OffsetDateTime;
use time::macros::format_description;

pub const TODAY_LABEL: &str = "Today";
pub const TOMORROW_LABEL: &str = "Tomorrow";
pub const NO_DUE_DATE_LABEL: &str = "No Due Date";

/// Bucket label for a task relative to the local day of `now`.
pub fn group_label(task: &Task, now: OffsetDateTime) -> String {
    let Some(due) = task.due_date else {
        return NO_DUE_DATE_LABEL.to_string();
    };

    let today = now.date();
    let due_day = due.to_offset(now.offset()).date();

    if due_day == today {
        TODAY_LABEL.to_string()
    } else if today.next_day() == Some(due_day) {
        TOMORROW_LABEL.to_string()
    } else {
        let format = format_description!("[weekday], [month repr:short] [day padding:none]");
        due_day
            .format(format)
            .unwrap_or_else(|_| due_day.to_string())
    }
}

/// Buckets already-sorted tasks; groups appear in order of first occurrence.
pub(crate) fn group_tasks(sorted: Vec<Task>, now: OffsetDateTime) -> Vec<TaskGroup> {
    let mut groups: Vec<TaskGroup> = Vec::new();

    for task in sorted {
        let label = group_label(&task, now);
        match groups.iter_mut().find(|group| group.label == label) {
            Some(group) => group.tasks.push(task),
            None => groups.push(TaskGroup {
                label,
                tasks: vec![task],
            }),
        }
    }

    groups
}
