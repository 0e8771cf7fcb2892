//! End-to-end authentication flow tests against a scripted provider

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::json;
use tokio::sync::Notify;

use crate::{
    AuthClient, AuthConfig, AuthError, AuthEvent, AuthResult, HandleAuthentication,
    IdentityProvider, Navigate, ScreenHint, UserProfile,
};

/// Records every navigation the client performs.
#[derive(Clone, Default)]
struct NavLog {
    targets: Arc<Mutex<Vec<String>>>,
}

impl NavLog {
    fn navigate(&self) -> Navigate {
        let targets = self.targets.clone();
        Arc::new(move |route: &str| targets.lock().unwrap().push(route.to_string()))
    }

    fn last(&self) -> Option<String> {
        self.targets.lock().unwrap().last().cloned()
    }

    fn len(&self) -> usize {
        self.targets.lock().unwrap().len()
    }
}

/// Provider whose callback parses are scripted per URL; unknown URLs
/// resolve to no authentication parameters.
struct ScriptedProvider {
    callbacks: HashMap<String, Result<Option<AuthResult>, AuthError>>,
    profile: UserProfile,
    /// When set, `parse_callback` blocks until notified.
    gate: Option<Arc<Notify>>,
}

impl ScriptedProvider {
    fn new() -> Self {
        let mut profile = UserProfile {
            sub: Some("provider|abc123".to_string()),
            email: Some("alice@example.com".to_string()),
            ..UserProfile::default()
        };
        profile.extra.insert(
            "https://localhost:3000/roles".to_string(),
            json!(["admin", "editor"]),
        );

        Self {
            callbacks: HashMap::new(),
            profile,
            gate: None,
        }
    }

    fn on_callback(mut self, url: &str, outcome: Result<Option<AuthResult>, AuthError>) -> Self {
        self.callbacks.insert(url.to_string(), outcome);
        self
    }
}

#[async_trait]
impl IdentityProvider for ScriptedProvider {
    fn authorize_url(&self, hint: ScreenHint) -> String {
        match hint {
            ScreenHint::Login => "https://provider.test/authorize".to_string(),
            ScreenHint::Signup => "https://provider.test/authorize?screen_hint=signup".to_string(),
        }
    }

    fn logout_url(&self, return_to: &str) -> String {
        format!("https://provider.test/v2/logout?returnTo={}", return_to)
    }

    async fn parse_callback(&self, callback_url: &str) -> Result<Option<AuthResult>, AuthError> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.callbacks
            .get(callback_url)
            .cloned()
            .unwrap_or(Ok(None))
    }

    async fn user_profile(&self, _auth_result: &AuthResult) -> Result<UserProfile, AuthError> {
        Ok(self.profile.clone())
    }
}

fn token_result(expires_in: i64) -> AuthResult {
    AuthResult {
        access_token: Some("at-123".to_string()),
        id_token: Some("it-456".to_string()),
        expires_in: Some(expires_in),
        token_type: Some("Bearer".to_string()),
        ..AuthResult::default()
    }
}

fn client_with(provider: ScriptedProvider, nav: &NavLog) -> AuthClient {
    let config = AuthConfig::new(
        "provider.test",
        "client-123",
        "https://localhost:3000",
        nav.navigate(),
    );
    AuthClient::with_provider(config, Arc::new(provider))
}

const CALLBACK: &str = "https://localhost:3000/auth/callback#tokens";

#[tokio::test]
async fn login_marks_flow_and_navigates_to_provider() {
    let nav = NavLog::default();
    let client = client_with(ScriptedProvider::new(), &nav);

    client.login().unwrap();

    assert!(client.is_authenticating());
    assert!(!client.is_authenticated());
    assert_eq!(nav.last().as_deref(), Some("https://provider.test/authorize"));
}

#[tokio::test]
async fn signup_navigates_to_signup_screen() {
    let nav = NavLog::default();
    let client = client_with(ScriptedProvider::new(), &nav);

    client.signup().unwrap();

    assert_eq!(
        nav.last().as_deref(),
        Some("https://provider.test/authorize?screen_hint=signup")
    );
}

#[tokio::test]
async fn second_login_is_rejected_while_pending() {
    let nav = NavLog::default();
    let client = client_with(ScriptedProvider::new(), &nav);

    client.login().unwrap();
    assert_eq!(client.login().unwrap_err(), AuthError::FlowInProgress);
    assert_eq!(client.signup().unwrap_err(), AuthError::FlowInProgress);
    assert_eq!(nav.len(), 1, "rejected flows must not navigate");
}

#[tokio::test]
async fn handle_authentication_establishes_session() {
    let nav = NavLog::default();
    let provider =
        ScriptedProvider::new().on_callback(CALLBACK, Ok(Some(token_result(3600))));
    let client = client_with(provider, &nav);

    let before = Utc::now();
    let ok = client
        .handle_authentication(
            CALLBACK,
            HandleAuthentication {
                post_login_route: Some("/dashboard".to_string()),
            },
        )
        .await
        .unwrap();

    assert!(ok);
    let state = client.snapshot();
    assert!(!state.is_authenticating);
    assert!(state.is_authenticated());
    assert_eq!(state.user_id(), Some("provider|abc123"));
    assert!(state.auth_result.is_some());

    let expected = before + Duration::seconds(3600);
    let drift = (state.expires_at.unwrap() - expected).num_seconds().abs();
    assert!(drift < 5, "expiry should be ~3600s out, drift {}s", drift);

    assert_eq!(nav.last().as_deref(), Some("/dashboard"));
}

#[tokio::test]
async fn handle_authentication_defaults_post_login_route() {
    let nav = NavLog::default();
    let provider =
        ScriptedProvider::new().on_callback(CALLBACK, Ok(Some(token_result(3600))));
    let client = client_with(provider, &nav);

    let ok = client
        .handle_authentication(CALLBACK, HandleAuthentication::default())
        .await
        .unwrap();

    assert!(ok);
    assert_eq!(nav.last().as_deref(), Some("/"));
}

#[tokio::test]
async fn handle_authentication_failure_keeps_prior_session() {
    let nav = NavLog::default();
    let provider = ScriptedProvider::new().on_callback(
        CALLBACK,
        Err(AuthError::ProviderError {
            code: "access_denied".to_string(),
            description: None,
        }),
    );
    let client = client_with(provider, &nav);

    // Install a prior session directly through the event channel.
    let prior_expiry = Utc::now() + Duration::hours(1);
    client.dispatch(AuthEvent::LoginSucceeded {
        user: UserProfile {
            sub: Some("provider|prior".to_string()),
            ..UserProfile::default()
        },
        auth_result: token_result(3600),
        expires_at: prior_expiry,
    });

    let ok = client
        .handle_authentication(CALLBACK, HandleAuthentication::default())
        .await
        .unwrap();

    assert!(!ok);
    let state = client.snapshot();
    assert!(!state.is_authenticating);
    assert_eq!(state.expires_at, Some(prior_expiry), "expiry unchanged");
    assert_eq!(state.error_type(), Some("provider_error"));
    assert_eq!(nav.len(), 0, "failed callbacks must not navigate");
}

#[tokio::test]
async fn handle_authentication_without_auth_params_fails() {
    let nav = NavLog::default();
    let client = client_with(ScriptedProvider::new(), &nav);

    let ok = client
        .handle_authentication(
            "https://localhost:3000/auth/callback",
            HandleAuthentication::default(),
        )
        .await
        .unwrap();

    assert!(!ok);
    assert_eq!(client.error_type(), Some("missing_auth_result"));
    assert!(!client.is_authenticating());
}

#[tokio::test]
async fn handle_authentication_rejects_foreign_callback_domain() {
    let nav = NavLog::default();
    let client = client_with(ScriptedProvider::new(), &nav);

    let ok = client
        .handle_authentication(
            "https://evil.example/auth/callback#access_token=at",
            HandleAuthentication::default(),
        )
        .await
        .unwrap();

    assert!(!ok);
    assert_eq!(client.error_type(), Some("callback_domain_mismatch"));
}

#[tokio::test]
async fn overlapping_handle_authentication_is_rejected() {
    let nav = NavLog::default();
    let gate = Arc::new(Notify::new());
    let mut provider =
        ScriptedProvider::new().on_callback(CALLBACK, Ok(Some(token_result(3600))));
    provider.gate = Some(gate.clone());
    let client = client_with(provider, &nav);

    let pending = {
        let client = client.clone();
        tokio::spawn(async move {
            client
                .handle_authentication(CALLBACK, HandleAuthentication::default())
                .await
        })
    };
    tokio::task::yield_now().await;

    let second = client
        .handle_authentication(CALLBACK, HandleAuthentication::default())
        .await;
    assert_eq!(second.unwrap_err(), AuthError::FlowInProgress);

    gate.notify_one();
    let first = pending.await.unwrap().unwrap();
    assert!(first, "gated flow should still succeed");
}

#[tokio::test]
async fn logout_resets_state_and_navigates_to_provider() {
    let nav = NavLog::default();
    let provider =
        ScriptedProvider::new().on_callback(CALLBACK, Ok(Some(token_result(3600))));
    let client = client_with(provider, &nav);

    client
        .handle_authentication(CALLBACK, HandleAuthentication::default())
        .await
        .unwrap();
    assert!(client.is_authenticated());

    client.logout();

    let state = client.snapshot();
    assert!(!state.is_authenticated());
    assert!(state.user.sub.is_none());
    assert!(state.auth_result.is_none());
    assert!(state.expires_at.is_none());
    assert_eq!(
        nav.last().as_deref(),
        Some("https://provider.test/v2/logout?returnTo=https://localhost:3000")
    );
}

#[tokio::test]
async fn roles_resolve_under_configured_namespace() {
    let nav = NavLog::default();
    let provider =
        ScriptedProvider::new().on_callback(CALLBACK, Ok(Some(token_result(3600))));
    let client = client_with(provider, &nav);

    client
        .handle_authentication(CALLBACK, HandleAuthentication::default())
        .await
        .unwrap();

    // The default namespace is the callback domain.
    assert!(client.is_authorized(["admin"]));
    assert!(!client.is_authorized(["viewer"]));
    assert!(client.is_authorized(["viewer", "editor"]));
}

#[tokio::test]
async fn subscribers_observe_dispatched_snapshots() {
    let nav = NavLog::default();
    let provider =
        ScriptedProvider::new().on_callback(CALLBACK, Ok(Some(token_result(3600))));
    let client = client_with(provider, &nav);
    let mut updates = client.subscribe();

    client
        .handle_authentication(CALLBACK, HandleAuthentication::default())
        .await
        .unwrap();

    updates.changed().await.unwrap();
    let state = updates.borrow_and_update().clone();
    assert!(state.is_authenticated());
    assert_eq!(state.user_id(), Some("provider|abc123"));
}
