use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Decoded result of a provider callback exchange: the tokens, lifetime
/// and flow parameters the provider handed back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,

    /// Access token lifetime in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,

    /// Opaque flow state echoed back by the provider.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// User identity assembled from identity token claims.
///
/// Standard claims get typed fields; anything else, including custom
/// namespaced claims, lands in `extra`. The unauthenticated user is the
/// default value with every field absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserProfile {
    /// Subject identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,

    /// Non-standard claims, keyed by their full claim name.
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl UserProfile {
    /// Roles listed under the namespaced roles claim
    /// (`<namespace>roles`, with the namespace normalized to end in `/`).
    /// Empty when the claim is missing or not an array of strings.
    pub fn roles(&self, namespace: &str) -> Vec<String> {
        let key = if namespace.ends_with('/') {
            format!("{}roles", namespace)
        } else {
            format!("{}/roles", namespace)
        };

        match self.extra.get(&key) {
            Some(Value::Array(values)) => values
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        }
    }
}
