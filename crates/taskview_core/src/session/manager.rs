//! Runtime side of the session: one task owns [`SessionState`], feeds it
//! auth events, the initial session query and user commands, and performs
//! the effects [`reduce`] asks for.

use super::credentials::{Credentials, SignUpForm};
use super::reconciler::{Effect, SessionInput, SessionState, reduce};
use super::route::{Route, RouteTable, StartupContext};
use crate::config::ClientConfig;
use crate::error::AppError;
use crate::model::{Session, User};
use crate::notify::{Notice, Notifier, deliver};
use crate::remote::{AuthBackend, OAuthProvider, SignOutScope};
use crate::storage::token_store::{PurgeReport, TokenKeyRules, TokenStorage, purge_auth_artifacts};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

/// Host-side navigation. Implementations replace or push a history entry
/// and report whether the move happened.
pub trait Navigator: Send + Sync {
    fn navigate(&self, path: &str, replace: bool) -> Result<(), AppError>;
}

/// Read-only view of the session published to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub session: Option<Session>,
    pub is_loading: bool,
}

impl SessionSnapshot {
    fn loading() -> Self {
        Self {
            session: None,
            is_loading: true,
        }
    }

    fn of(state: &SessionState) -> Self {
        Self {
            session: state.session().cloned(),
            is_loading: state.is_loading(),
        }
    }

    pub fn user(&self) -> Option<&User> {
        self.session.as_ref().map(|session| &session.user)
    }
}

pub struct SessionServices {
    pub navigator: Arc<dyn Navigator>,
    pub notifier: Arc<dyn Notifier>,
    pub token_storages: Vec<Arc<dyn TokenStorage>>,
}

impl SessionServices {
    fn purge_tokens(&self, rules: &TokenKeyRules) -> PurgeReport {
        let storages: Vec<&dyn TokenStorage> = self
            .token_storages
            .iter()
            .map(|storage| storage.as_ref())
            .collect();
        purge_auth_artifacts(&storages, rules)
    }

    fn notify(&self, notice: Notice) {
        deliver(self.notifier.as_ref(), &notice);
    }
}

enum Command {
    SignOut(oneshot::Sender<Result<(), AppError>>),
    SignOutFinished(Result<(), AppError>),
    LocationChanged(Route),
    Shutdown,
}

/// Owns the session task. Must be started inside a tokio runtime.
///
/// Dropping the manager stops the task; [`SessionManager::shutdown`] also
/// waits for it to release the auth subscription.
pub struct SessionManager<B> {
    backend: Arc<B>,
    services: Arc<SessionServices>,
    config: ClientConfig,
    routes: RouteTable,
    commands: mpsc::UnboundedSender<Command>,
    snapshot: watch::Receiver<SessionSnapshot>,
    task: Option<JoinHandle<()>>,
}

impl<B: AuthBackend + 'static> SessionManager<B> {
    pub fn start(
        backend: Arc<B>,
        services: SessionServices,
        config: ClientConfig,
        startup: StartupContext,
    ) -> Self {
        let services = Arc::new(services);
        let (commands, inbox) = mpsc::unbounded_channel();
        let (publish, snapshot) = watch::channel(SessionSnapshot::loading());
        let routes = RouteTable::from_config(&config);

        let driver = Driver {
            state: SessionState::new(),
            routes: routes.clone(),
            rules: config.token_key_rules(),
            backend: Arc::clone(&backend),
            services: Arc::clone(&services),
            commands: commands.clone(),
            publish,
        };
        let task = tokio::spawn(driver.run(startup, config.session_timeout(), inbox));

        Self {
            backend,
            services,
            config,
            routes,
            commands,
            snapshot,
            task: Some(task),
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.clone()
    }

    /// Waits until the session is no longer loading.
    pub async fn resolved(&self) -> SessionSnapshot {
        let mut receiver = self.snapshot.clone();
        match receiver.wait_for(|snapshot| !snapshot.is_loading).await {
            Ok(snapshot) => snapshot.clone(),
            Err(_) => self.snapshot(),
        }
    }

    /// Reports a navigation the host made on its own, such as following a
    /// route guard redirect.
    pub fn location_changed(&self, path: &str) -> Result<(), AppError> {
        let route = self.routes.route_for(path);
        self.commands
            .send(Command::LocationChanged(route))
            .map_err(|_| AppError::state_conflict("session manager stopped"))
    }

    /// Signs in from a clean slate: cached artifacts are purged and any
    /// remote session revoked first so a stale one cannot linger.
    pub async fn sign_in_with_password(&self, credentials: &Credentials) -> Result<(), AppError> {
        let credentials = credentials.validated()?;

        self.services.purge_tokens(&self.config.token_key_rules());
        if let Err(err) = self.backend.sign_out(SignOutScope::Global).await {
            tracing::debug!(error = %err, "pre-sign-in sign-out failed; continuing");
        }

        match self
            .backend
            .sign_in_with_password(&credentials.email, &credentials.password)
            .await
        {
            Ok(()) => {
                self.services.notify(Notice::success("Login successful"));
                Ok(())
            }
            Err(err) => {
                tracing::error!(error = %err, "sign-in failed");
                self.services
                    .notify(Notice::error("Login failed").with_description(err.message()));
                Err(err)
            }
        }
    }

    pub async fn sign_up(&self, form: &SignUpForm) -> Result<(), AppError> {
        let credentials = form.validated()?;

        self.services.purge_tokens(&self.config.token_key_rules());
        let result = self
            .backend
            .sign_up(
                &credentials.email,
                &credentials.password,
                self.config.oauth_redirect_to.as_deref(),
            )
            .await;

        match result {
            Ok(()) => {
                self.services.notify(
                    Notice::success("Signup successful")
                        .with_description("Please check your email to confirm your account"),
                );
                Ok(())
            }
            Err(err) => {
                tracing::error!(error = %err, "sign-up failed");
                self.services
                    .notify(Notice::error("Signup failed").with_description(err.message()));
                Err(err)
            }
        }
    }

    /// Starts the provider redirect. Success shows up later as a
    /// signed-in event once the host reopens on the callback URL.
    pub async fn sign_in_with_oauth(&self, provider: OAuthProvider) -> Result<(), AppError> {
        self.services.purge_tokens(&self.config.token_key_rules());

        let result = self
            .backend
            .sign_in_with_oauth(provider, self.config.oauth_redirect_to.as_deref())
            .await;
        if let Err(err) = &result {
            tracing::error!(error = %err, provider = provider.as_str(), "provider sign-in failed");
            self.services.notify(
                Notice::error(format!("{} sign in failed", provider.display_name()))
                    .with_description(err.message()),
            );
        }
        result
    }

    /// Ends the session. Local state is anonymous afterwards even when the
    /// remote revocation fails; that failure is returned.
    pub async fn sign_out(&self) -> Result<(), AppError> {
        let (reply, outcome) = oneshot::channel();
        self.commands
            .send(Command::SignOut(reply))
            .map_err(|_| AppError::state_conflict("session manager stopped"))?;
        outcome
            .await
            .map_err(|_| AppError::state_conflict("session manager stopped"))?
    }

    pub async fn shutdown(mut self) {
        let _ = self.commands.send(Command::Shutdown);
        if let Some(task) = self.task.take()
            && let Err(err) = task.await
        {
            tracing::error!(error = %err, "session task failed");
        }
    }
}

impl<B> Drop for SessionManager<B> {
    fn drop(&mut self) {
        if self.task.is_some() {
            let _ = self.commands.send(Command::Shutdown);
        }
    }
}

struct Driver<B> {
    state: SessionState,
    routes: RouteTable,
    rules: TokenKeyRules,
    backend: Arc<B>,
    services: Arc<SessionServices>,
    commands: mpsc::UnboundedSender<Command>,
    publish: watch::Sender<SessionSnapshot>,
}

impl<B: AuthBackend + 'static> Driver<B> {
    async fn run(
        mut self,
        startup: StartupContext,
        timeout: Duration,
        mut inbox: mpsc::UnboundedReceiver<Command>,
    ) {
        self.apply(SessionInput::Started(startup));

        // Subscribe before querying so no event between the two is lost.
        let mut subscription = self.backend.subscribe_auth_events();
        let backend = Arc::clone(&self.backend);
        let initial =
            tokio::time::timeout(timeout, async move { backend.get_current_session().await });
        tokio::pin!(initial);

        let mut initial_pending = true;
        let mut events_open = true;
        let mut sign_out_waiters: Vec<oneshot::Sender<Result<(), AppError>>> = Vec::new();

        loop {
            tokio::select! {
                result = &mut initial, if initial_pending => {
                    initial_pending = false;
                    let input = match result {
                        Ok(result) => SessionInput::InitialSession(result),
                        Err(_) => SessionInput::InitialSessionTimedOut,
                    };
                    self.apply(input);
                }
                event = subscription.recv(), if events_open => match event {
                    Some(event) => self.apply(SessionInput::Auth(event)),
                    None => {
                        events_open = false;
                        tracing::warn!("auth event stream closed");
                    }
                },
                command = inbox.recv() => match command {
                    Some(Command::SignOut(reply)) => {
                        sign_out_waiters.push(reply);
                        self.apply(SessionInput::SignOutRequested);
                    }
                    Some(Command::SignOutFinished(result)) => {
                        // Callers observe the outcome only after local state is cleared.
                        self.apply(SessionInput::SignOutFinished(result.clone()));
                        for waiter in sign_out_waiters.drain(..) {
                            let _ = waiter.send(result.clone());
                        }
                    }
                    Some(Command::LocationChanged(route)) => {
                        self.apply(SessionInput::LocationChanged(route));
                    }
                    Some(Command::Shutdown) | None => break,
                },
            }
        }

        subscription.unsubscribe();
        tracing::debug!("session task stopped");
    }

    fn apply(&mut self, input: SessionInput) {
        let mut queue = VecDeque::from([input]);

        while let Some(input) = queue.pop_front() {
            let transition = reduce(&self.state, input);
            self.state = transition.state;
            for effect in transition.effects {
                if let Some(follow_up) = self.perform(effect) {
                    queue.push_back(follow_up);
                }
            }
        }

        let snapshot = SessionSnapshot::of(&self.state);
        self.publish.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
    }

    fn perform(&self, effect: Effect) -> Option<SessionInput> {
        match effect {
            Effect::Navigate { route, replace } => {
                let path = self.routes.path(&route);
                match self.services.navigator.navigate(path, replace) {
                    Ok(()) => {
                        tracing::debug!(path, "navigated");
                        Some(SessionInput::NavigationCompleted(route))
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, path, "navigation failed");
                        Some(SessionInput::NavigationFailed(route))
                    }
                }
            }
            Effect::Notify(notice) => {
                self.services.notify(notice);
                None
            }
            Effect::PurgeLocalTokens => {
                self.services.purge_tokens(&self.rules);
                None
            }
            Effect::RevokeRemote(scope) => {
                let backend = Arc::clone(&self.backend);
                let commands = self.commands.clone();
                tokio::spawn(async move {
                    let result = backend.sign_out(scope).await;
                    if commands.send(Command::SignOutFinished(result)).is_err() {
                        tracing::debug!("session task gone before sign-out finished");
                    }
                });
                None
            }
        }
    }
}
