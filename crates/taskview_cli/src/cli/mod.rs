use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use taskview_core::config::ConfigOverrides;
use taskview_core::error::AppError;
use taskview_core::model::{
    CategoryFilter, CompletionFilter, DueRange, FilterCriteria, PriorityFilter,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Override configuration values (format KEY=VALUE)
    #[arg(long = "config-override", value_name = "KEY=VALUE", global = true)]
    pub config_override: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show a task snapshot filtered, sorted and grouped by due date
    ///
    /// Example: taskview list --snapshot tasks.json --due week
    /// Example: taskview list --snapshot tasks.json --search groc --status pending
    List(ListArgs),
    /// Remove cached auth tokens
    ///
    /// Example: taskview purge-tokens
    /// Example: taskview purge-tokens --store ./tokens.json
    PurgeTokens {
        /// Token cache file (defaults to TASKVIEW_TOKEN_STORE_PATH or the config directory)
        #[arg(long, value_name = "FILE")]
        store: Option<PathBuf>,
    },
}

#[derive(Args, Debug, Default)]
pub struct ListArgs {
    /// Snapshot file with `tasks` and `categories` rows
    #[arg(long, value_name = "FILE", env = "TASKVIEW_SNAPSHOT_PATH")]
    pub snapshot: Option<PathBuf>,

    /// all, high, medium or low
    #[arg(long)]
    pub priority: Option<String>,

    /// Category id, or all
    #[arg(long)]
    pub category: Option<String>,

    /// all, pending or completed
    #[arg(long)]
    pub status: Option<String>,

    /// all, today, tomorrow, week or month
    #[arg(long)]
    pub due: Option<String>,

    /// Case-insensitive text matched against title and description
    #[arg(long)]
    pub search: Option<String>,

    /// Reference instant (RFC3339); its offset defines the local day
    #[arg(long, value_name = "RFC3339")]
    pub now: Option<String>,
}

impl ListArgs {
    pub fn criteria(&self) -> Result<FilterCriteria, AppError> {
        let mut criteria = FilterCriteria::default();
        if let Some(raw) = self.priority.as_deref() {
            criteria.priority = PriorityFilter::parse(raw)?;
        }
        if let Some(raw) = self.category.as_deref() {
            criteria.category = CategoryFilter::parse(raw);
        }
        if let Some(raw) = self.status.as_deref() {
            criteria.completion = CompletionFilter::parse(raw)?;
        }
        if let Some(raw) = self.due.as_deref() {
            criteria.due = DueRange::parse(raw)?;
        }
        if let Some(raw) = self.search.as_deref() {
            criteria.search = raw.to_string();
        }
        Ok(criteria)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigOverrideTarget {
    HomeRoute,
    SignInRoute,
    SessionTimeoutMs,
    TokenKeyPrefixes,
    TokenKeyMarkers,
    OAuthRedirectTo,
    LogLevel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedConfigOverride {
    pub target: ConfigOverrideTarget,
    pub value: String,
}

/// Parse a raw `KEY=VALUE` override string into a structured target.
pub fn parse_config_override(raw: &str) -> Result<ParsedConfigOverride, String> {
    let trimmed = raw.trim();
    let (key_raw, value_raw) = trimmed
        .split_once('=')
        .ok_or_else(|| "override must be in KEY=VALUE format".to_string())?;

    let value = value_raw.trim().to_string();
    let canonical_field =
        canonicalize_flag_name(key_raw).ok_or_else(|| "override key cannot be empty".to_string())?;

    let target = match canonical_field.as_str() {
        "home_route" | "home" => ConfigOverrideTarget::HomeRoute,
        "sign_in_route" | "sign_in" => ConfigOverrideTarget::SignInRoute,
        "session_timeout_ms" | "session_timeout" => ConfigOverrideTarget::SessionTimeoutMs,
        "token_key_prefixes" => ConfigOverrideTarget::TokenKeyPrefixes,
        "token_key_markers" => ConfigOverrideTarget::TokenKeyMarkers,
        "oauth_redirect_to" => ConfigOverrideTarget::OAuthRedirectTo,
        "log_level" => ConfigOverrideTarget::LogLevel,
        other => return Err(format!("unknown config field '{other}'")),
    };

    Ok(ParsedConfigOverride { target, value })
}

/// Folds every `--config-override` argument into one set of overrides;
/// later arguments win.
pub fn collect_overrides(raw: &[String]) -> Result<ConfigOverrides, AppError> {
    let mut overrides = ConfigOverrides::default();

    for entry in raw {
        let parsed = parse_config_override(entry).map_err(AppError::invalid_data)?;
        let value = parsed.value;
        match parsed.target {
            ConfigOverrideTarget::HomeRoute => overrides.home_route = Some(value),
            ConfigOverrideTarget::SignInRoute => overrides.sign_in_route = Some(value),
            ConfigOverrideTarget::SessionTimeoutMs => {
                let timeout = value.parse::<u64>().map_err(|_| {
                    AppError::invalid_data(format!(
                        "session_timeout_ms must be a whole number, got '{value}'"
                    ))
                })?;
                overrides.session_timeout_ms = Some(timeout);
            }
            ConfigOverrideTarget::TokenKeyPrefixes => {
                overrides.token_key_prefixes = Some(split_list(&value));
            }
            ConfigOverrideTarget::TokenKeyMarkers => {
                overrides.token_key_markers = Some(split_list(&value));
            }
            ConfigOverrideTarget::OAuthRedirectTo => overrides.oauth_redirect_to = Some(value),
            ConfigOverrideTarget::LogLevel => overrides.log_level = Some(value),
        }
    }

    Ok(overrides)
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn canonicalize_flag_name(name: &str) -> Option<String> {
    let mut cleaned = String::new();
    let mut previous_underscore = false;

    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            cleaned.push(ch.to_ascii_lowercase());
            previous_underscore = false;
        } else if !previous_underscore && !cleaned.is_empty() {
            cleaned.push('_');
            previous_underscore = true;
        }
    }

    let trimmed = cleaned.trim_matches('_');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::{
        ConfigOverrideTarget, ListArgs, collect_overrides, parse_config_override,
    };
    use taskview_core::model::{CompletionFilter, DueRange, Priority, PriorityFilter};

    #[test]
    fn parse_config_override_canonicalizes_field_names() {
        let parsed = parse_config_override(" Session-Timeout-MS = 2500 ").unwrap();

        assert_eq!(parsed.target, ConfigOverrideTarget::SessionTimeoutMs);
        assert_eq!(parsed.value, "2500");
    }

    #[test]
    fn parse_config_override_rejects_unknown_fields() {
        let err = parse_config_override("unknown.field=value").unwrap_err();
        assert!(err.contains("unknown config field 'unknown_field'"));
    }

    #[test]
    fn parse_config_override_rejects_missing_equals() {
        let err = parse_config_override("log_level").unwrap_err();
        assert!(err.contains("KEY=VALUE"));
    }

    #[test]
    fn parse_config_override_rejects_empty_key() {
        let err = parse_config_override(" -- = debug").unwrap_err();
        assert!(err.contains("cannot be empty"));
    }

    #[test]
    fn collect_overrides_splits_lists_and_parses_numbers() {
        let raw = vec![
            "token_key_prefixes = app.auth., , legacy.".to_string(),
            "session_timeout_ms=250".to_string(),
            "log_level=info".to_string(),
            "log_level=debug".to_string(),
        ];
        let overrides = collect_overrides(&raw).unwrap();

        assert_eq!(
            overrides.token_key_prefixes,
            Some(vec!["app.auth.".to_string(), "legacy.".to_string()])
        );
        assert_eq!(overrides.session_timeout_ms, Some(250));
        assert_eq!(overrides.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn collect_overrides_rejects_non_numeric_timeout() {
        let err = collect_overrides(&["session_timeout_ms=soon".to_string()]).unwrap_err();
        assert_eq!(err.code(), "invalid_data");
    }

    #[test]
    fn list_args_build_criteria() {
        let args = ListArgs {
            priority: Some("HIGH".to_string()),
            status: Some("pending".to_string()),
            due: Some("week".to_string()),
            search: Some("groc".to_string()),
            ..ListArgs::default()
        };
        let criteria = args.criteria().unwrap();

        assert_eq!(criteria.priority, PriorityFilter::Only(Priority::High));
        assert_eq!(criteria.completion, CompletionFilter::Only(false));
        assert_eq!(criteria.due, DueRange::Week);
        assert_eq!(criteria.search, "groc");
    }

    #[test]
    fn list_args_reject_unknown_due_range() {
        let args = ListArgs {
            due: Some("fortnight".to_string()),
            ..ListArgs::default()
        };
        assert_eq!(args.criteria().unwrap_err().code(), "invalid_data");
    }
}
