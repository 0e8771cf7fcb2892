//! Error types and classification for authentication flows

use thiserror::Error;

/// Failures an authentication flow can surface.
///
/// Errors are recovered locally and recorded in
/// [`AuthState::error`](crate::state::AuthState); read operations such as
/// `is_authenticated` never fail, they degrade to `false`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// The redirect callback could not be parsed.
    #[error("Callback parse failed: {0}")]
    CallbackParse(String),

    /// The callback URL did not originate from the configured callback domain.
    #[error("Callback domain mismatch: expected {expected}, got {actual}")]
    CallbackDomainMismatch { expected: String, actual: String },

    /// The provider reported an error in the callback parameters.
    #[error("Provider returned {code}: {desc}", desc = .description.as_deref().unwrap_or("no description"))]
    ProviderError {
        code: String,
        description: Option<String>,
    },

    /// The callback carried neither an error nor an authentication result.
    #[error("Callback carried neither an error nor an authentication result")]
    MissingAuthResult,

    /// The authentication result lacks fields required to establish a session.
    #[error("Incomplete authentication result: {0}")]
    IncompleteAuthResult(String),

    /// The user identity could not be decoded from the authentication result.
    #[error("Failed to decode user profile: {0}")]
    ProfileDecode(String),

    /// A login or callback flow is already pending.
    #[error("An authentication flow is already in progress")]
    FlowInProgress,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Stable classification code for consuming applications, so they can
    /// match on the failure kind without parsing display messages.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::CallbackParse(_) => "callback_parse_failed",
            AuthError::CallbackDomainMismatch { .. } => "callback_domain_mismatch",
            AuthError::ProviderError { .. } => "provider_error",
            AuthError::MissingAuthResult => "missing_auth_result",
            AuthError::IncompleteAuthResult(_) => "incomplete_auth_result",
            AuthError::ProfileDecode(_) => "profile_decode_failed",
            AuthError::FlowInProgress => "flow_in_progress",
            AuthError::Internal(_) => "internal_error",
        }
    }
}
