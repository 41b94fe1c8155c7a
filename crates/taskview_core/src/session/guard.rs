use super::manager::SessionSnapshot;
use super::route::Route;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Session still resolving; render a loading indicator.
    Loading,
    Render,
    /// Replace the current entry with `to`. `from` is remembered so the
    /// sign-in page can send the user back afterwards.
    Redirect { to: Route, from: Option<Route> },
}

/// Decides what the host renders for `requested`.
///
/// `from` is the route the user was originally sent away from, if any.
pub fn guard_route(
    snapshot: &SessionSnapshot,
    requested: &Route,
    from: Option<&Route>,
) -> GuardDecision {
    if snapshot.is_loading {
        return GuardDecision::Loading;
    }

    let signed_in = snapshot.session.is_some();
    match requested {
        Route::SignIn if signed_in => GuardDecision::Redirect {
            to: from
                .filter(|route| **route != Route::SignIn)
                .cloned()
                .unwrap_or(Route::Home),
            from: None,
        },
        Route::SignIn => GuardDecision::Render,
        _ if signed_in => GuardDecision::Render,
        other => GuardDecision::Redirect {
            to: Route::SignIn,
            from: Some(other.clone()),
        },
    }
}
