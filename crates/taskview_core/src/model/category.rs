use crate::error::AppError;

pub const DEFAULT_CATEGORY_COLOR: &str = "#8B5CF6";

/// Swatches offered when creating a category.
pub const CATEGORY_COLORS: [&str; 8] = [
    "#8B5CF6", "#0EA5E9", "#F97316", "#10B981", "#EF4444", "#F59E0B", "#EC4899", "#6366F1",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryDraft {
    pub name: String,
    pub color: Option<String>,
}

impl CategoryDraft {
    pub fn new<N: Into<String>>(name: N) -> Self {
        Self {
            name: name.into(),
            color: Some(DEFAULT_CATEGORY_COLOR.to_string()),
        }
    }

    pub fn validated(&self) -> Result<CategoryDraft, AppError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(AppError::validation("name", "Category name is required"));
        }

        let color = match self.color.as_deref().map(str::trim) {
            Some("") | None => None,
            Some(value) if is_hex_color(value) => Some(value.to_string()),
            Some(value) => {
                return Err(AppError::validation(
                    "color",
                    format!("'{value}' is not a hex color"),
                ));
            }
        };

        Ok(CategoryDraft {
            name: name.to_string(),
            color,
        })
    }
}

fn is_hex_color(value: &str) -> bool {
    match value.strip_prefix('#') {
        Some(digits) => {
            matches!(digits.len(), 3 | 6) && digits.chars().all(|ch| ch.is_ascii_hexdigit())
        }
        None => false,
    }
}
