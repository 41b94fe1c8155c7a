use crate::config::ClientConfig;
use url::form_urlencoded;

/// Where the host application is, as far as session handling cares.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Route {
    /// Default view shown to signed-in users.
    #[default]
    Home,
    SignIn,
    /// Any other protected path.
    Other(String),
}

/// Maps routes to host paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTable {
    home: String,
    sign_in: String,
}

impl RouteTable {
    pub fn new<H: Into<String>, S: Into<String>>(home: H, sign_in: S) -> Self {
        Self {
            home: home.into(),
            sign_in: sign_in.into(),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.home_route.clone(), config.sign_in_route.clone())
    }

    pub fn path<'a>(&'a self, route: &'a Route) -> &'a str {
        match route {
            Route::Home => &self.home,
            Route::SignIn => &self.sign_in,
            Route::Other(path) => path,
        }
    }

    pub fn route_for(&self, path: &str) -> Route {
        let trimmed = trim_trailing_slash(path);
        if trimmed == trim_trailing_slash(&self.home) {
            Route::Home
        } else if trimmed == trim_trailing_slash(&self.sign_in) {
            Route::SignIn
        } else {
            Route::Other(path.to_string())
        }
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::from_config(&ClientConfig::default())
    }
}

fn trim_trailing_slash(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() { "/" } else { trimmed }
}

/// Error reported by an external provider through the redirect URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthError {
    pub code: String,
    pub description: Option<String>,
}

impl OAuthError {
    pub fn message(&self) -> &str {
        self.description.as_deref().unwrap_or(&self.code)
    }
}

/// What the host knows at startup: current location and whether the page
/// was reached as an external-provider callback.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StartupContext {
    pub location: Route,
    pub oauth_callback: bool,
    pub oauth_error: Option<OAuthError>,
}

impl StartupContext {
    pub fn at(location: Route) -> Self {
        Self {
            location,
            ..Self::default()
        }
    }

    /// Builds the context from the URL path and query string the app was
    /// opened with.
    pub fn from_url(routes: &RouteTable, path: &str, query: &str) -> Self {
        let params: Vec<(String, String)> =
            form_urlencoded::parse(query.trim_start_matches('?').as_bytes())
                .map(|(key, value)| (key.into_owned(), value.into_owned()))
                .collect();
        let param = |name: &str| {
            params
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.clone())
        };

        let oauth_error = param("error").map(|code| OAuthError {
            code,
            description: param("error_description").filter(|value| !value.is_empty()),
        });
        let oauth_callback = oauth_error.is_some()
            || param("access_token").is_some()
            || param("provider").is_some();

        Self {
            location: routes.route_for(path),
            oauth_callback,
            oauth_error,
        }
    }
}
