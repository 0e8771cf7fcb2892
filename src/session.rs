//! Callback resolution and session establishment

use chrono::{Duration, Utc};
use tracing::{info, warn};

use crate::error::AuthError;
use crate::provider::IdentityProvider;
use crate::state::AuthEvent;
use crate::types::{AuthResult, UserProfile};

/// Establish a session from a decoded authentication result.
///
/// Requires an access token and a positive token lifetime; fails with
/// [`AuthError::IncompleteAuthResult`] otherwise, without dispatching
/// anything, so no partial session is ever installed. On success the
/// session expiry is computed from the token lifetime, the user identity
/// is resolved through the provider, and a single
/// [`AuthEvent::LoginSucceeded`] installs everything atomically. Resolves
/// with the profile used for that update.
pub async fn set_session<D>(
    dispatch: &D,
    provider: &dyn IdentityProvider,
    auth_result: AuthResult,
) -> Result<UserProfile, AuthError>
where
    D: Fn(AuthEvent) + Sync,
{
    if auth_result
        .access_token
        .as_deref()
        .map_or(true, str::is_empty)
    {
        return Err(AuthError::IncompleteAuthResult(
            "missing access token".to_string(),
        ));
    }

    let expires_in = auth_result
        .expires_in
        .filter(|secs| *secs > 0)
        .ok_or_else(|| AuthError::IncompleteAuthResult("missing token expiry".to_string()))?;

    let expires_at = Utc::now() + Duration::seconds(expires_in);
    let user = provider.user_profile(&auth_result).await?;

    info!(
        "Session established for {} until {}",
        user.sub.as_deref().unwrap_or("<unknown subject>"),
        expires_at
    );

    dispatch(AuthEvent::LoginSucceeded {
        user: user.clone(),
        auth_result,
        expires_at,
    });

    Ok(user)
}

/// Resolve the outcome of an authentication callback.
///
/// A present `err` dispatches [`AuthEvent::LoginFailed`] and resolves
/// `false`, leaving any prior session expiry untouched. A present result
/// runs [`set_session`] and resolves `true` on success. Neither present is
/// itself a failure ([`AuthError::MissingAuthResult`]). Every path ends
/// the in-flight flow.
pub async fn handle_auth_result<D>(
    err: Option<AuthError>,
    dispatch: &D,
    provider: &dyn IdentityProvider,
    auth_result: Option<AuthResult>,
) -> bool
where
    D: Fn(AuthEvent) + Sync,
{
    if let Some(err) = err {
        warn!("Authentication callback failed: {}", err);
        dispatch(AuthEvent::LoginFailed(err));
        return false;
    }

    match auth_result {
        Some(result) => match set_session(dispatch, provider, result).await {
            Ok(_) => true,
            Err(err) => {
                warn!("Session establishment failed: {}", err);
                dispatch(AuthEvent::LoginFailed(err));
                false
            }
        },
        None => {
            warn!("Callback carried neither an error nor an authentication result");
            dispatch(AuthEvent::LoginFailed(AuthError::MissingAuthResult));
            false
        }
    }
}
