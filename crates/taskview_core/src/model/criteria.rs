use crate::error::AppError;
use crate::model::Priority;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PriorityFilter {
    #[default]
    All,
    Only(Priority),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompletionFilter {
    #[default]
    All,
    Only(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DueRange {
    #[default]
    All,
    Today,
    Tomorrow,
    Week,
    Month,
}

/// The active predicates applied to a task collection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterCriteria {
    pub priority: PriorityFilter,
    pub category: CategoryFilter,
    pub completion: CompletionFilter,
    pub due: DueRange,
    pub search: String,
}

impl FilterCriteria {
    /// Search text as typed, or `None` when it is blank and the search
    /// predicate is disabled. Surrounding whitespace is part of the needle.
    pub fn search_query(&self) -> Option<&str> {
        if self.search.trim().is_empty() {
            None
        } else {
            Some(&self.search)
        }
    }

    pub fn is_unfiltered(&self) -> bool {
        self.priority == PriorityFilter::All
            && self.category == CategoryFilter::All
            && self.completion == CompletionFilter::All
            && self.due == DueRange::All
            && self.search_query().is_none()
    }
}

impl PriorityFilter {
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        if raw.trim().eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        Priority::parse(raw).map(Self::Only)
    }
}

impl CategoryFilter {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
            Self::All
        } else {
            Self::Only(trimmed.to_string())
        }
    }
}

impl CompletionFilter {
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "completed" | "done" | "true" => Ok(Self::Only(true)),
            "pending" | "open" | "false" => Ok(Self::Only(false)),
            other => Err(AppError::invalid_data(format!(
                "unknown completion filter '{other}'"
            ))),
        }
    }
}

impl DueRange {
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "today" => Ok(Self::Today),
            "tomorrow" => Ok(Self::Tomorrow),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            other => Err(AppError::invalid_data(format!("unknown due range '{other}'"))),
        }
    }
}
