use crate::model::{CategoryFilter, CompletionFilter, DueRange, FilterCriteria, PriorityFilter, Task};
use time::{Duration, OffsetDateTime, Time};

const WEEK_DAYS: i64 = 7;
const MONTH_DAYS: i64 = 30;

/// True when `task` satisfies every active predicate of `criteria`.
pub fn matches(task: &Task, criteria: &FilterCriteria, now: OffsetDateTime) -> bool {
    matches_completion(task, criteria.completion)
        && matches_priority(task, criteria.priority)
        && matches_category(task, &criteria.category)
        && matches_due(task, criteria.due, now)
        && matches_search(task, criteria.search_query())
}

fn matches_completion(task: &Task, filter: CompletionFilter) -> bool {
    match filter {
        CompletionFilter::All => true,
        CompletionFilter::Only(completed) => task.completed == completed,
    }
}

fn matches_priority(task: &Task, filter: PriorityFilter) -> bool {
    match filter {
        PriorityFilter::All => true,
        PriorityFilter::Only(priority) => task.priority == priority,
    }
}

fn matches_category(task: &Task, filter: &CategoryFilter) -> bool {
    match filter {
        CategoryFilter::All => true,
        CategoryFilter::Only(id) => task.category_id.as_deref() == Some(id.as_str()),
    }
}

// Today/tomorrow compare local calendar days; week/month compare raw
// instants against a half-open window starting at local midnight.
fn matches_due(task: &Task, range: DueRange, now: OffsetDateTime) -> bool {
    if range == DueRange::All {
        return true;
    }

    let Some(due) = task.due_date else {
        return false;
    };

    let today = now.date();
    let due_day = due.to_offset(now.offset()).date();

    match range {
        DueRange::All => true,
        DueRange::Today => due_day == today,
        DueRange::Tomorrow => today.next_day() == Some(due_day),
        DueRange::Week => within_days(due, now, WEEK_DAYS),
        DueRange::Month => within_days(due, now, MONTH_DAYS),
    }
}

pub(crate) fn start_of_day(now: OffsetDateTime) -> OffsetDateTime {
    now.replace_time(Time::MIDNIGHT)
}

fn within_days(due: OffsetDateTime, now: OffsetDateTime, days: i64) -> bool {
    let start = start_of_day(now);
    let end = start + Duration::days(days);
    due >= start && due < end
}

fn matches_search(task: &Task, query: Option<&str>) -> bool {
    let Some(query) = query else {
        return true;
    };

    let needle = query.to_lowercase();
    task.title.to_lowercase().contains(&needle)
        || task
            .description
            .as_deref()
            .is_some_and(|description| description.to_lowercase().contains(&needle))
}

#[cfg(test)]
mod tests {
    use super::matches;
    use crate::model::{
        CategoryFilter, CompletionFilter, DueRange, FilterCriteria, Priority, PriorityFilter, Task,
    };
    use time::macros::datetime;
    use time::{Duration, OffsetDateTime};

    fn task(id: &str, title: &str, due_date: Option<OffsetDateTime>) -> Task {
        Task {
            id: id.to_string(),
            title: title.to_string(),
            description: None,
            due_date,
            priority: Priority::Medium,
            completed: false,
            category_id: None,
            created_at: datetime!(2025-07-01 08:00 UTC),
            updated_at: datetime!(2025-07-01 08:00 UTC),
            user_id: "user-1".to_string(),
        }
    }

    fn due_only(range: DueRange) -> FilterCriteria {
        FilterCriteria {
            due: range,
            ..FilterCriteria::default()
        }
    }

    #[test]
    fn search_matches_title_case_insensitively() {
        let now = datetime!(2025-07-05 12:00 UTC);
        let criteria = FilterCriteria {
            search: "groc".to_string(),
            ..FilterCriteria::default()
        };

        assert!(matches(&task("t1", "Buy groceries", None), &criteria, now));
        assert!(!matches(
            &task("t2", "Schedule appointment", None),
            &criteria,
            now
        ));
    }

    #[test]
    fn search_matches_description() {
        let now = datetime!(2025-07-05 12:00 UTC);
        let mut with_description = task("t1", "Errands", None);
        with_description.description = Some("Pick up DRY cleaning".to_string());
        let criteria = FilterCriteria {
            search: "dry ".to_string(),
            ..FilterCriteria::default()
        };

        assert!(matches(&with_description, &criteria, now));
    }

    #[test]
    fn search_whitespace_is_part_of_the_needle() {
        let now = datetime!(2025-07-05 12:00 UTC);
        let criteria = FilterCriteria {
            search: "s ".to_string(),
            ..FilterCriteria::default()
        };

        assert!(!matches(&task("t1", "Buy groceries", None), &criteria, now));
        assert!(matches(&task("t2", "Pay bills today", None), &criteria, now));
    }

    #[test]
    fn predicates_combine_with_and() {
        let now = datetime!(2025-07-05 12:00 UTC);
        let mut candidate = task("t1", "Report", None);
        candidate.priority = Priority::High;
        candidate.category_id = Some("work".to_string());

        let criteria = FilterCriteria {
            priority: PriorityFilter::Only(Priority::High),
            category: CategoryFilter::Only("work".to_string()),
            completion: CompletionFilter::Only(false),
            ..FilterCriteria::default()
        };
        assert!(matches(&candidate, &criteria, now));

        candidate.completed = true;
        assert!(!matches(&candidate, &criteria, now));
    }

    #[test]
    fn category_filter_excludes_uncategorized() {
        let now = datetime!(2025-07-05 12:00 UTC);
        let criteria = FilterCriteria {
            category: CategoryFilter::Only("home".to_string()),
            ..FilterCriteria::default()
        };
        assert!(!matches(&task("t1", "Loose", None), &criteria, now));
    }

    #[test]
    fn range_filters_never_match_undated_tasks() {
        let now = datetime!(2025-07-05 12:00 UTC);
        let undated = task("t1", "Someday", None);
        for range in [
            DueRange::Today,
            DueRange::Tomorrow,
            DueRange::Week,
            DueRange::Month,
        ] {
            assert!(!matches(&undated, &due_only(range), now));
        }
        assert!(matches(&undated, &due_only(DueRange::All), now));
    }

    #[test]
    fn today_uses_local_calendar_day() {
        // 22:30 UTC on the 4th is already the 5th at +02:00.
        let now = datetime!(2025-07-05 09:00 +2);
        let late = task("t1", "Late", Some(datetime!(2025-07-04 22:30 UTC)));
        let earlier = task("t2", "Earlier", Some(datetime!(2025-07-04 21:59 UTC)));

        assert!(matches(&late, &due_only(DueRange::Today), now));
        assert!(!matches(&earlier, &due_only(DueRange::Today), now));
    }

    #[test]
    fn tomorrow_covers_the_whole_next_day() {
        let now = datetime!(2025-07-05 23:59:59 UTC);
        let first = task("t1", "Start", Some(datetime!(2025-07-06 00:00 UTC)));
        let last = task("t2", "End", Some(datetime!(2025-07-06 23:59:59 UTC)));
        let after = task("t3", "After", Some(datetime!(2025-07-07 00:00 UTC)));

        let criteria = due_only(DueRange::Tomorrow);
        assert!(matches(&first, &criteria, now));
        assert!(matches(&last, &criteria, now));
        assert!(!matches(&after, &criteria, now));
    }

    #[test]
    fn week_window_is_half_open_from_local_midnight() {
        let now = datetime!(2025-07-05 15:00 UTC);
        let midnight = datetime!(2025-07-05 00:00 UTC);
        let criteria = due_only(DueRange::Week);

        let at_start = task("t1", "Start", Some(midnight));
        let before_start = task("t2", "Before", Some(midnight - Duration::seconds(1)));
        let before_end = task(
            "t3",
            "Edge",
            Some(midnight + Duration::days(7) - Duration::seconds(1)),
        );
        let at_end = task("t4", "End", Some(midnight + Duration::days(7)));

        assert!(matches(&at_start, &criteria, now));
        assert!(!matches(&before_start, &criteria, now));
        assert!(matches(&before_end, &criteria, now));
        assert!(!matches(&at_end, &criteria, now));
    }

    #[test]
    fn week_includes_tasks_earlier_today() {
        let now = datetime!(2025-07-05 15:00 UTC);
        let this_morning = task("t1", "Morning", Some(datetime!(2025-07-05 06:00 UTC)));
        assert!(matches(&this_morning, &due_only(DueRange::Week), now));
        assert!(matches(&this_morning, &due_only(DueRange::Today), now));
    }

    #[test]
    fn month_window_spans_thirty_days() {
        let now = datetime!(2025-07-05 15:00 UTC);
        let midnight = datetime!(2025-07-05 00:00 UTC);
        let criteria = due_only(DueRange::Month);

        let inside = task("t1", "Inside", Some(midnight + Duration::days(29)));
        let outside = task("t2", "Outside", Some(midnight + Duration::days(30)));

        assert!(matches(&inside, &criteria, now));
        assert!(!matches(&outside, &criteria, now));
    }

    #[test]
    fn week_window_uses_instants_not_calendar_days() {
        // Local midnight at -05:00 is 05:00 UTC; a due date at 04:00 UTC the
        // same UTC day falls before the window even though its UTC date matches.
        let now = datetime!(2025-07-05 12:00 -5);
        let early = task("t1", "Early", Some(datetime!(2025-07-05 04:00 UTC)));
        let inside = task("t2", "Inside", Some(datetime!(2025-07-05 05:00 UTC)));

        assert!(!matches(&early, &due_only(DueRange::Week), now));
        assert!(matches(&inside, &due_only(DueRange::Week), now));
    }
}
