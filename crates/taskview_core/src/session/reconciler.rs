//! Session state machine.
//!
//! [`reduce`] is pure: it takes the current state and one input and returns
//! the next state together with the effects the driver has to perform. All
//! redirect deduplication lives here so it can be tested without a runtime.

use super::route::{Route, StartupContext};
use crate::error::AppError;
use crate::model::{AuthEvent, AuthEventKind, Session, User};
use crate::notify::Notice;
use crate::remote::SignOutScope;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Uninitialized,
    /// Waiting for the initial session query.
    Loading,
    Authenticated(Session),
    Anonymous,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionState {
    pub phase: SessionPhase,
    pub location: Route,
    /// Target of a navigation that was issued but not yet completed.
    pub pending_route: Option<Route>,
    /// Set while the app handles an external-provider callback; the callback
    /// owns navigation until its sign-in event arrives.
    pub oauth_callback: bool,
    pub welcome_shown: bool,
    pub signing_out: bool,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self) -> Option<&Session> {
        match &self.phase {
            SessionPhase::Authenticated(session) => Some(session),
            _ => None,
        }
    }

    pub fn user(&self) -> Option<&User> {
        self.session().map(|session| &session.user)
    }

    pub fn is_loading(&self) -> bool {
        matches!(
            self.phase,
            SessionPhase::Uninitialized | SessionPhase::Loading
        ) || self.signing_out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionInput {
    Started(StartupContext),
    Auth(AuthEvent),
    InitialSession(Result<Option<Session>, AppError>),
    InitialSessionTimedOut,
    NavigationCompleted(Route),
    NavigationFailed(Route),
    /// The host moved on its own, e.g. after a route guard redirect.
    LocationChanged(Route),
    SignOutRequested,
    SignOutFinished(Result<(), AppError>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Navigate { route: Route, replace: bool },
    Notify(Notice),
    PurgeLocalTokens,
    RevokeRemote(SignOutScope),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub state: SessionState,
    pub effects: Vec<Effect>,
}

pub fn reduce(state: &SessionState, input: SessionInput) -> Transition {
    let mut next = state.clone();
    let mut effects = Vec::new();

    match input {
        SessionInput::Started(context) => start(&mut next, &mut effects, context),
        SessionInput::Auth(event) => on_auth_event(&mut next, &mut effects, event),
        SessionInput::InitialSession(result) => on_initial_session(&mut next, &mut effects, result),
        SessionInput::InitialSessionTimedOut => {
            if next.phase == SessionPhase::Loading {
                tracing::warn!("initial session query timed out; continuing signed out");
                next.phase = SessionPhase::Anonymous;
            }
        }
        SessionInput::NavigationCompleted(route) => {
            if next.pending_route.as_ref() == Some(&route) {
                next.pending_route = None;
            }
            next.location = route;
        }
        SessionInput::NavigationFailed(route) => {
            if next.pending_route.as_ref() == Some(&route) {
                next.pending_route = None;
            }
        }
        SessionInput::LocationChanged(route) => {
            if next.pending_route.as_ref() == Some(&route) {
                next.pending_route = None;
            }
            tracing::debug!(?route, "host location changed");
            next.location = route;
        }
        SessionInput::SignOutRequested => {
            if next.signing_out {
                let conflict = AppError::state_conflict("sign-out already in progress");
                tracing::debug!(error = %conflict, "ignoring sign-out request");
            } else {
                next.signing_out = true;
                effects.push(Effect::PurgeLocalTokens);
                effects.push(Effect::RevokeRemote(SignOutScope::Global));
            }
        }
        SessionInput::SignOutFinished(result) => {
            next.signing_out = false;
            become_anonymous(&mut next);
            let notice = match result {
                Ok(()) => Notice::success("Logged out successfully"),
                Err(err) => {
                    tracing::error!(error = %err, "remote sign-out failed");
                    Notice::error("Failed to log out").with_description(err.message())
                }
            };
            effects.push(Effect::Notify(notice));
            navigate_to(&mut next, &mut effects, Route::SignIn);
        }
    }

    Transition {
        state: next,
        effects,
    }
}

fn start(state: &mut SessionState, effects: &mut Vec<Effect>, context: StartupContext) {
    if state.phase != SessionPhase::Uninitialized {
        tracing::debug!("session already started");
        return;
    }

    state.phase = SessionPhase::Loading;
    state.location = context.location;
    state.oauth_callback = context.oauth_callback;

    if let Some(error) = context.oauth_error {
        tracing::error!(code = %error.code, "external provider reported an error");
        effects.push(Effect::Notify(
            Notice::error(format!("Authentication error: {}", error.message())),
        ));
    }
}

fn on_auth_event(state: &mut SessionState, effects: &mut Vec<Effect>, event: AuthEvent) {
    tracing::info!(
        event = ?event.kind,
        email = event
            .session
            .as_ref()
            .and_then(|session| session.user.email.as_deref()),
        "auth state changed"
    );

    match event.kind {
        AuthEventKind::SignedIn => {
            let Some(session) = event.session else {
                tracing::warn!("signed-in event without a session");
                return;
            };

            let welcome = match session.user.email.as_deref() {
                Some(email) => format!("Welcome {email}!"),
                None => "Welcome!".to_string(),
            };
            state.phase = SessionPhase::Authenticated(session);

            if !state.welcome_shown {
                state.welcome_shown = true;
                effects.push(Effect::Notify(Notice::success(welcome)));
            }

            request_home_redirect(state, effects);
            state.oauth_callback = false;
        }
        AuthEventKind::SignedOut => {
            become_anonymous(state);
            state.oauth_callback = false;
            navigate_to(state, effects, Route::SignIn);
        }
        AuthEventKind::UserUpdated => {
            effects.push(Effect::Notify(Notice::info("Your profile has been updated")));
            refresh_session(state, event.session);
        }
        AuthEventKind::TokenRefreshed => refresh_session(state, event.session),
    }
}

fn on_initial_session(
    state: &mut SessionState,
    effects: &mut Vec<Effect>,
    result: Result<Option<Session>, AppError>,
) {
    if state.phase != SessionPhase::Loading {
        // Events or the timeout already settled the phase; the query result
        // is older than what they delivered.
        tracing::debug!(ok = result.is_ok(), "ignoring late initial session result");
        return;
    }

    match result {
        Ok(Some(session)) => {
            state.phase = SessionPhase::Authenticated(session);
            if state.location == Route::SignIn {
                request_home_redirect(state, effects);
            }
        }
        Ok(None) => state.phase = SessionPhase::Anonymous,
        Err(err) => {
            tracing::error!(error = %err, "error checking session");
            state.phase = SessionPhase::Anonymous;
        }
    }
}

fn refresh_session(state: &mut SessionState, session: Option<Session>) {
    let Some(session) = session else {
        return;
    };

    match state.phase {
        SessionPhase::Authenticated(_) | SessionPhase::Loading => {
            state.phase = SessionPhase::Authenticated(session);
        }
        SessionPhase::Uninitialized | SessionPhase::Anonymous => {
            tracing::debug!("ignoring session refresh while signed out");
        }
    }
}

fn become_anonymous(state: &mut SessionState) {
    state.phase = SessionPhase::Anonymous;
    state.welcome_shown = false;
}

fn request_home_redirect(state: &mut SessionState, effects: &mut Vec<Effect>) {
    if state.oauth_callback {
        tracing::debug!("provider callback in progress; leaving navigation to it");
        return;
    }
    if let Some(pending) = &state.pending_route {
        let conflict = AppError::state_conflict("redirect already in flight");
        tracing::debug!(error = %conflict, ?pending, "skipping home redirect");
        return;
    }
    if state.location == Route::Home {
        return;
    }

    navigate(state, effects, Route::Home);
}

fn navigate_to(state: &mut SessionState, effects: &mut Vec<Effect>, route: Route) {
    let already_there = match &state.pending_route {
        Some(pending) => *pending == route,
        None => state.location == route,
    };
    if already_there {
        return;
    }

    navigate(state, effects, route);
}

fn navigate(state: &mut SessionState, effects: &mut Vec<Effect>, route: Route) {
    state.pending_route = Some(route.clone());
    effects.push(Effect::Navigate {
        route,
        replace: true,
    });
}
