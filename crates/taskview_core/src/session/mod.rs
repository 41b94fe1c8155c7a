//! Authentication session lifecycle: the reconciler that turns auth events
//! into state and navigation, the runtime driving it, and the route guard.

mod credentials;
mod guard;
mod manager;
mod reconciler;
mod route;

pub use credentials::{Credentials, MIN_PASSWORD_LEN, SignUpForm};
pub use guard::{GuardDecision, guard_route};
pub use manager::{Navigator, SessionManager, SessionServices, SessionSnapshot};
pub use reconciler::{Effect, SessionInput, SessionPhase, SessionState, Transition, reduce};
pub use route::{OAuthError, Route, RouteTable, StartupContext};
