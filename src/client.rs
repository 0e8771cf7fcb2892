//! The authentication boundary: state owner and consumer handle
//!
//! [`AuthClient`] owns the canonical [`AuthState`] for one boundary and is
//! its sole writer. Every mutation flows through [`AuthClient::dispatch`],
//! which applies the event reducer and publishes the new snapshot to all
//! subscribers; consumers hold cheap clones of the client and read-only
//! snapshots of the state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info};

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::provider::{IdentityProvider, RedirectProvider, ScreenHint};
use crate::session;
use crate::state::{AuthEvent, AuthState};
use crate::types::{AuthResult, UserProfile};

/// Options for [`AuthClient::handle_authentication`].
#[derive(Debug, Clone, Default)]
pub struct HandleAuthentication {
    /// Route to navigate to on success; falls back to the configured
    /// default when absent.
    pub post_login_route: Option<String>,
}

struct ClientInner {
    config: AuthConfig,
    provider: Arc<dyn IdentityProvider>,
    /// Canonical state lives inside the watch sender: `send_modify` gives
    /// the single mutation entry point and snapshot broadcast in one step.
    state: watch::Sender<AuthState>,
    /// Guards against overlapping callback processing.
    handling: AtomicBool,
}

/// Handle to one authentication boundary.
///
/// Clones share the same state; hand them to whatever parts of the
/// application need authentication reads or operations.
#[derive(Clone)]
pub struct AuthClient {
    inner: Arc<ClientInner>,
}

impl AuthClient {
    /// Create a boundary with the stock [`RedirectProvider`] built from
    /// the configuration. Exactly one provider client exists per boundary.
    pub fn new(config: AuthConfig) -> Self {
        let provider = Arc::new(RedirectProvider::new(&config));
        Self::with_provider(config, provider)
    }

    /// Create a boundary around a caller-supplied provider client.
    pub fn with_provider(config: AuthConfig, provider: Arc<dyn IdentityProvider>) -> Self {
        let (state, _) = watch::channel(AuthState::default());
        Self {
            inner: Arc::new(ClientInner {
                config,
                provider,
                state,
                handling: AtomicBool::new(false),
            }),
        }
    }

    /// Apply a state transition and publish the new snapshot.
    pub fn dispatch(&self, event: AuthEvent) {
        debug!("Dispatching {}", event.name());
        self.inner.state.send_modify(|state| state.apply(event));
    }

    /// Current state snapshot.
    pub fn snapshot(&self) -> AuthState {
        self.inner.state.borrow().clone()
    }

    /// Subscribe to state snapshots. The receiver sees every dispatched
    /// transition from this point on.
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.inner.state.subscribe()
    }

    /// Boundary configuration.
    pub fn config(&self) -> &AuthConfig {
        &self.inner.config
    }

    /// True while a login redirect or callback round-trip is in flight.
    pub fn is_authenticating(&self) -> bool {
        self.inner.state.borrow().is_authenticating
    }

    /// True iff a session exists and has not expired.
    pub fn is_authenticated(&self) -> bool {
        self.inner.state.borrow().is_authenticated()
    }

    /// True iff the user holds any of the given roles under the configured
    /// claim namespace.
    pub fn is_authorized<I, S>(&self, roles: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.inner
            .state
            .borrow()
            .is_authorized(&self.inner.config.custom_property_namespace, roles)
    }

    /// Current identity record.
    pub fn user(&self) -> UserProfile {
        self.inner.state.borrow().user.clone()
    }

    /// Convenience accessor for the subject identifier.
    pub fn user_id(&self) -> Option<String> {
        self.inner.state.borrow().user.sub.clone()
    }

    /// Raw result of the most recent authentication exchange.
    pub fn auth_result(&self) -> Option<AuthResult> {
        self.inner.state.borrow().auth_result.clone()
    }

    /// Most recent failure, if any.
    pub fn error(&self) -> Option<AuthError> {
        self.inner.state.borrow().error.clone()
    }

    /// Classification code of the most recent failure.
    pub fn error_type(&self) -> Option<&'static str> {
        self.inner.state.borrow().error_type()
    }

    /// Start a login flow: mark the flow in progress and navigate to the
    /// provider's hosted login page. Rejected while another flow is
    /// pending.
    pub fn login(&self) -> Result<(), AuthError> {
        self.begin_redirect(ScreenHint::Login)
    }

    /// Start a signup flow; otherwise identical to [`AuthClient::login`].
    pub fn signup(&self) -> Result<(), AuthError> {
        self.begin_redirect(ScreenHint::Signup)
    }

    fn begin_redirect(&self, hint: ScreenHint) -> Result<(), AuthError> {
        if self.is_authenticating() {
            return Err(AuthError::FlowInProgress);
        }

        info!(
            "Initiating {} redirect to {}",
            match hint {
                ScreenHint::Login => "login",
                ScreenHint::Signup => "signup",
            },
            self.inner.config.domain
        );

        self.dispatch(AuthEvent::LoginStarted);
        let url = self.inner.provider.authorize_url(hint);
        (self.inner.config.navigate)(&url);
        Ok(())
    }

    /// End the session: reset local state and navigate to the provider's
    /// logout endpoint, returning to the callback domain.
    pub fn logout(&self) {
        info!("Logging out of {}", self.inner.config.domain);
        self.dispatch(AuthEvent::LoggedOut);
        let url = self
            .inner
            .provider
            .logout_url(&self.inner.config.callback_domain);
        (self.inner.config.navigate)(&url);
    }

    /// Process the redirect callback the provider sent the browser back
    /// with.
    ///
    /// The hosting application calls this with its current location once
    /// it lands on the callback route. Resolves to `true` when a session
    /// was established, in which case navigation to the post-login route
    /// has happened; `false` leaves the recorded error in state for
    /// inspection. A second invocation while one is pending is rejected
    /// with [`AuthError::FlowInProgress`].
    pub async fn handle_authentication(
        &self,
        callback_url: &str,
        opts: HandleAuthentication,
    ) -> Result<bool, AuthError> {
        if self
            .inner
            .handling
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(AuthError::FlowInProgress);
        }

        let outcome = self.process_callback(callback_url, opts).await;
        self.inner.handling.store(false, Ordering::SeqCst);
        Ok(outcome)
    }

    async fn process_callback(&self, callback_url: &str, opts: HandleAuthentication) -> bool {
        self.dispatch(AuthEvent::LoginStarted);

        let dispatch = |event: AuthEvent| self.dispatch(event);
        let provider = self.inner.provider.as_ref();

        if !callback_url.starts_with(&self.inner.config.callback_domain) {
            let err = AuthError::CallbackDomainMismatch {
                expected: self.inner.config.callback_domain.clone(),
                actual: callback_url.to_string(),
            };
            return session::handle_auth_result(Some(err), &dispatch, provider, None).await;
        }

        let ok = match provider.parse_callback(callback_url).await {
            Ok(result) => session::handle_auth_result(None, &dispatch, provider, result).await,
            Err(err) => session::handle_auth_result(Some(err), &dispatch, provider, None).await,
        };

        if ok {
            let route = opts
                .post_login_route
                .unwrap_or_else(|| self.inner.config.post_login_route.clone());
            (self.inner.config.navigate)(&route);
        }

        ok
    }
}
