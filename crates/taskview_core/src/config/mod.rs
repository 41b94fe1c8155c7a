use crate::error::AppError;
use crate::storage::token_store::TokenKeyRules;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_DIR_NAME: &str = "taskview";
const CONFIG_FILE_NAME: &str = "config.json";
const CONFIG_ENV_VAR: &str = "TASKVIEW_CONFIG_PATH";

pub const DEFAULT_SESSION_TIMEOUT_MS: u64 = 10_000;

fn default_home_route() -> String {
    "/".to_string()
}

fn default_sign_in_route() -> String {
    "/auth".to_string()
}

fn default_session_timeout_ms() -> u64 {
    DEFAULT_SESSION_TIMEOUT_MS
}

fn default_token_key_prefixes() -> Vec<String> {
    vec!["supabase.auth.".to_string()]
}

fn default_token_key_markers() -> Vec<String> {
    vec!["sb-".to_string()]
}

fn default_log_level() -> String {
    "warn".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_home_route")]
    pub home_route: String,
    #[serde(default = "default_sign_in_route")]
    pub sign_in_route: String,
    /// Upper bound for the startup session query.
    #[serde(default = "default_session_timeout_ms")]
    pub session_timeout_ms: u64,
    #[serde(default = "default_token_key_prefixes")]
    pub token_key_prefixes: Vec<String>,
    #[serde(default = "default_token_key_markers")]
    pub token_key_markers: Vec<String>,
    /// Where the auth service sends users back after email confirmation or
    /// an external provider sign-in.
    #[serde(default)]
    pub oauth_redirect_to: Option<String>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            home_route: default_home_route(),
            sign_in_route: default_sign_in_route(),
            session_timeout_ms: default_session_timeout_ms(),
            token_key_prefixes: default_token_key_prefixes(),
            token_key_markers: default_token_key_markers(),
            oauth_redirect_to: None,
            log_level: default_log_level(),
        }
    }
}

impl ClientConfig {
    pub fn session_timeout(&self) -> Duration {
        Duration::from_millis(self.session_timeout_ms)
    }

    pub fn token_key_rules(&self) -> TokenKeyRules {
        TokenKeyRules::new(
            self.token_key_prefixes.clone(),
            self.token_key_markers.clone(),
        )
    }
}

#[derive(Debug, Clone)]
pub struct ConfigLoad {
    pub config: ClientConfig,
    pub error: Option<AppError>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub home_route: Option<String>,
    pub sign_in_route: Option<String>,
    pub session_timeout_ms: Option<u64>,
    pub token_key_prefixes: Option<Vec<String>>,
    pub token_key_markers: Option<Vec<String>>,
    pub oauth_redirect_to: Option<String>,
    pub log_level: Option<String>,
}

/// Per-user directory holding the config file and the token cache.
pub fn app_dir() -> Result<PathBuf, AppError> {
    if cfg!(windows) {
        let appdata =
            std::env::var("APPDATA").map_err(|_| AppError::invalid_data("APPDATA is not set"))?;
        Ok(PathBuf::from(appdata).join(APP_DIR_NAME))
    } else {
        let home = std::env::var("HOME").map_err(|_| AppError::invalid_data("HOME is not set"))?;
        Ok(PathBuf::from(home).join(".config").join(APP_DIR_NAME))
    }
}

pub fn config_path() -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    Ok(app_dir()?.join(CONFIG_FILE_NAME))
}

pub fn load_config_with_fallback() -> ConfigLoad {
    match config_path() {
        Ok(path) => load_config_with_fallback_from_path(&path),
        Err(err) => ConfigLoad {
            config: ClientConfig::default(),
            error: Some(err),
        },
    }
}

pub fn load_config_with_fallback_from_path(path: &Path) -> ConfigLoad {
    if !path.exists() {
        return ConfigLoad {
            config: ClientConfig::default(),
            error: None,
        };
    }

    match load_config_from_path(path) {
        Ok(config) => ConfigLoad {
            config,
            error: None,
        },
        Err(err) => ConfigLoad {
            config: ClientConfig::default(),
            error: Some(err),
        },
    }
}

fn load_config_from_path(path: &Path) -> Result<ClientConfig, AppError> {
    let content = std::fs::read_to_string(path)
        .map_err(|err| AppError::io(format!("{}: {}", path.display(), err)))?;
    let config: ClientConfig = serde_json::from_str(&content).map_err(|err| {
        AppError::invalid_data(format!("invalid JSON in {}: {}", path.display(), err))
    })?;
    validate(config)
}

fn validate(config: ClientConfig) -> Result<ClientConfig, AppError> {
    for (name, route) in [
        ("home_route", &config.home_route),
        ("sign_in_route", &config.sign_in_route),
    ] {
        if !route.starts_with('/') {
            return Err(AppError::invalid_data(format!(
                "{name} must start with '/'"
            )));
        }
    }
    if config.home_route == config.sign_in_route {
        return Err(AppError::invalid_data(
            "home_route and sign_in_route must differ",
        ));
    }
    if config.session_timeout_ms == 0 {
        return Err(AppError::invalid_data(
            "session_timeout_ms must be greater than zero",
        ));
    }
    Ok(config)
}

pub fn merge_overrides(
    base: &ClientConfig,
    overrides: &ConfigOverrides,
) -> Result<ClientConfig, AppError> {
    let mut merged = base.clone();
    if let Some(route) = overrides.home_route.as_ref() {
        merged.home_route = route.clone();
    }
    if let Some(route) = overrides.sign_in_route.as_ref() {
        merged.sign_in_route = route.clone();
    }
    if let Some(timeout) = overrides.session_timeout_ms {
        merged.session_timeout_ms = timeout;
    }
    if let Some(prefixes) = overrides.token_key_prefixes.as_ref() {
        merged.token_key_prefixes = prefixes.clone();
    }
    if let Some(markers) = overrides.token_key_markers.as_ref() {
        merged.token_key_markers = markers.clone();
    }
    if let Some(redirect) = overrides.oauth_redirect_to.as_ref() {
        merged.oauth_redirect_to = Some(redirect.clone());
    }
    if let Some(level) = overrides.log_level.as_ref() {
        merged.log_level = level.clone();
    }

    validate(merged)
}
