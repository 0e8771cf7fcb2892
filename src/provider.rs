//! Identity provider seam and the redirect-flow client

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::Rng;
use std::collections::HashMap;
use url::Url;

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::types::{AuthResult, UserProfile};

/// Which provider screen a redirect should land on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenHint {
    Login,
    Signup,
}

/// The external identity provider, treated as an opaque collaborator.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// URL of the provider's hosted login or signup page.
    fn authorize_url(&self, hint: ScreenHint) -> String;

    /// URL that terminates the provider-side session and redirects back.
    fn logout_url(&self, return_to: &str) -> String;

    /// Parse a callback URL into a decoded authentication result.
    ///
    /// Resolves to `Ok(None)` when the URL carries no authentication
    /// parameters at all, and to `Err` when the provider reported an error
    /// or the response is malformed.
    async fn parse_callback(&self, callback_url: &str) -> Result<Option<AuthResult>, AuthError>;

    /// Resolve the user identity for a decoded authentication result.
    async fn user_profile(&self, auth_result: &AuthResult) -> Result<UserProfile, AuthError>;
}

const DEFAULT_SCOPE: &str = "openid profile email";

/// Redirect-flow client for hosted-page identity providers.
pub struct RedirectProvider {
    domain: String,
    client_id: String,
    redirect_uri: String,
    audience: Option<String>,
    params: HashMap<String, String>,
}

impl RedirectProvider {
    /// Build a provider client from boundary configuration.
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            domain: config.domain.clone(),
            client_id: config.client_id.clone(),
            redirect_uri: config.callback_url(),
            audience: config.audience.clone(),
            params: config.params.clone(),
        }
    }
}

#[async_trait]
impl IdentityProvider for RedirectProvider {
    fn authorize_url(&self, hint: ScreenHint) -> String {
        let mut params = vec![
            ("response_type", "token id_token".to_string()),
            ("client_id", self.client_id.clone()),
            ("redirect_uri", self.redirect_uri.clone()),
            ("scope", DEFAULT_SCOPE.to_string()),
            ("state", random_token(16)),
            ("nonce", random_token(16)),
        ];

        if let Some(audience) = &self.audience {
            params.push(("audience", audience.clone()));
        }

        if hint == ScreenHint::Signup {
            params.push(("screen_hint", "signup".to_string()));
        }

        for (key, value) in &self.params {
            params.push((key.as_str(), value.clone()));
        }

        let query_string = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        format!("https://{}/authorize?{}", self.domain, query_string)
    }

    fn logout_url(&self, return_to: &str) -> String {
        format!(
            "https://{}/v2/logout?client_id={}&returnTo={}",
            self.domain,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(return_to)
        )
    }

    async fn parse_callback(&self, callback_url: &str) -> Result<Option<AuthResult>, AuthError> {
        let url = Url::parse(callback_url)
            .map_err(|e| AuthError::CallbackParse(format!("Invalid callback URL: {}", e)))?;

        // Tokens arrive in the fragment for redirect flows; some providers
        // fall back to the query string.
        let raw = url
            .fragment()
            .filter(|f| !f.is_empty())
            .map(str::to_string)
            .or_else(|| url.query().map(str::to_string));

        let raw = match raw {
            Some(raw) => raw,
            None => return Ok(None),
        };

        let pairs: HashMap<String, String> = url::form_urlencoded::parse(raw.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        if let Some(code) = pairs.get("error") {
            return Err(AuthError::ProviderError {
                code: code.clone(),
                description: pairs.get("error_description").cloned(),
            });
        }

        if !pairs.contains_key("access_token") && !pairs.contains_key("id_token") {
            return Ok(None);
        }

        Ok(Some(AuthResult {
            access_token: pairs.get("access_token").cloned(),
            id_token: pairs.get("id_token").cloned(),
            expires_in: pairs.get("expires_in").and_then(|v| v.parse().ok()),
            token_type: pairs.get("token_type").cloned(),
            state: pairs.get("state").cloned(),
            scope: pairs.get("scope").cloned(),
        }))
    }

    async fn user_profile(&self, auth_result: &AuthResult) -> Result<UserProfile, AuthError> {
        let id_token = auth_result.id_token.as_deref().ok_or_else(|| {
            AuthError::ProfileDecode("authentication result has no identity token".to_string())
        })?;

        decode_id_token_claims(id_token)
    }
}

/// Decode the claims segment of an identity token in JWS compact form.
///
/// The signature is not verified here; verification happened on the
/// provider's side of the redirect.
pub fn decode_id_token_claims(id_token: &str) -> Result<UserProfile, AuthError> {
    let mut segments = id_token.split('.');
    let payload = match (segments.next(), segments.next()) {
        (Some(_), Some(payload)) if !payload.is_empty() => payload,
        _ => {
            return Err(AuthError::ProfileDecode(
                "identity token is not in JWS compact form".to_string(),
            ))
        }
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| AuthError::ProfileDecode(format!("Failed to decode claims segment: {}", e)))?;

    serde_json::from_slice(&bytes)
        .map_err(|e| AuthError::ProfileDecode(format!("Failed to parse claims: {}", e)))
}

fn random_token(len: usize) -> String {
    let bytes: Vec<u8> = (0..len).map(|_| rand::thread_rng().gen()).collect();
    URL_SAFE_NO_PAD.encode(&bytes)
}
