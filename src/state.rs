//! Authentication session state and its event reducer

use chrono::{DateTime, Utc};

use crate::error::AuthError;
use crate::types::{AuthResult, UserProfile};

/// Events driving the session state machine.
///
/// All mutation of [`AuthState`] flows through [`AuthState::apply`]; there
/// is no other write path.
#[derive(Debug, Clone)]
pub enum AuthEvent {
    /// A login redirect or callback flow was initiated.
    LoginStarted,

    /// A callback resolved successfully; installs the new session in one
    /// transition.
    LoginSucceeded {
        user: UserProfile,
        auth_result: AuthResult,
        expires_at: DateTime<Utc>,
    },

    /// A flow failed; records the error and ends the flow. The previous
    /// session, if any, is left in place.
    LoginFailed(AuthError),

    /// The user logged out; resets to the unauthenticated shape.
    LoggedOut,
}

impl AuthEvent {
    /// Short event name, used for logging without token material.
    pub fn name(&self) -> &'static str {
        match self {
            AuthEvent::LoginStarted => "login_started",
            AuthEvent::LoginSucceeded { .. } => "login_succeeded",
            AuthEvent::LoginFailed(_) => "login_failed",
            AuthEvent::LoggedOut => "logged_out",
        }
    }
}

/// The session record held by one authentication boundary.
#[derive(Debug, Clone, Default)]
pub struct AuthState {
    /// Current identity; the default (all fields absent) when
    /// unauthenticated.
    pub user: UserProfile,

    /// Raw decoded result of the most recent authentication exchange.
    pub auth_result: Option<AuthResult>,

    /// Instant after which the session is no longer valid. `None` while no
    /// authenticated session exists.
    pub expires_at: Option<DateTime<Utc>>,

    /// True while a login redirect or callback round-trip is in flight.
    pub is_authenticating: bool,

    /// Most recent failure, if any.
    pub error: Option<AuthError>,
}

impl AuthState {
    /// Apply one event. This is the only mutation path for session state.
    pub fn apply(&mut self, event: AuthEvent) {
        match event {
            AuthEvent::LoginStarted => {
                self.is_authenticating = true;
                self.error = None;
            }
            AuthEvent::LoginSucceeded {
                user,
                auth_result,
                expires_at,
            } => {
                self.user = user;
                self.auth_result = Some(auth_result);
                self.expires_at = Some(expires_at);
                self.is_authenticating = false;
                self.error = None;
            }
            AuthEvent::LoginFailed(error) => {
                self.is_authenticating = false;
                self.error = Some(error);
            }
            AuthEvent::LoggedOut => {
                *self = AuthState::default();
            }
        }
    }

    /// True iff a session exists and its expiry lies in the future.
    pub fn is_authenticated(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at > Utc::now(),
            None => false,
        }
    }

    /// True iff the user holds any of the given roles under the namespaced
    /// roles claim. Degrades to `false` when the claim is missing or
    /// malformed.
    pub fn is_authorized<I, S>(&self, namespace: &str, roles: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let held = self.user.roles(namespace);
        roles
            .into_iter()
            .any(|wanted| held.iter().any(|r| r == wanted.as_ref()))
    }

    /// Classification code of the most recent failure.
    pub fn error_type(&self) -> Option<&'static str> {
        self.error.as_ref().map(AuthError::error_code)
    }

    /// Convenience accessor for the subject identifier.
    pub fn user_id(&self) -> Option<&str> {
        self.user.sub.as_deref()
    }
}
