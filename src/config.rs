use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Navigation callback supplied by the hosting application.
///
/// Invoked with a destination URL or application route. What navigation
/// means is the host's business: assigning `window.location` in a wasm
/// app, pushing onto a router in a desktop shell.
pub type Navigate = Arc<dyn Fn(&str) + Send + Sync>;

/// Settings for one authentication boundary, immutable after construction.
#[derive(Clone)]
pub struct AuthConfig {
    /// Identity provider domain, e.g. `example.identity.com`.
    pub domain: String,

    /// Client identifier issued by the provider.
    pub client_id: String,

    /// Optional audience domain for API access tokens.
    pub audience: Option<String>,

    /// Origin the provider redirects back to, e.g. `https://localhost:3000`.
    pub callback_domain: String,

    /// Namespace prefix under which custom claims (roles, metadata) are
    /// nested in the identity token. Defaults to the callback domain.
    pub custom_property_namespace: String,

    /// Route navigated to after a successful login when the caller does
    /// not override it.
    pub post_login_route: String,

    /// Extra provider-specific authorize parameters.
    pub params: HashMap<String, String>,

    /// Navigation callback supplied by the hosting application.
    pub navigate: Navigate,
}

impl AuthConfig {
    /// Create a configuration with the required fields. The claim
    /// namespace defaults to the callback domain and the post-login route
    /// to `/`.
    pub fn new(
        domain: impl Into<String>,
        client_id: impl Into<String>,
        callback_domain: impl Into<String>,
        navigate: Navigate,
    ) -> Self {
        let callback_domain = callback_domain.into();
        Self {
            domain: domain.into(),
            client_id: client_id.into(),
            audience: None,
            custom_property_namespace: callback_domain.clone(),
            callback_domain,
            post_login_route: "/".to_string(),
            params: HashMap::new(),
            navigate,
        }
    }

    /// Set the audience domain for API access tokens.
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    /// Override the custom claim namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.custom_property_namespace = namespace.into();
        self
    }

    /// Override the default post-login route.
    pub fn with_post_login_route(mut self, route: impl Into<String>) -> Self {
        self.post_login_route = route.into();
        self
    }

    /// Add a provider-specific authorize parameter.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Redirect URI the provider sends the browser back to.
    pub fn callback_url(&self) -> String {
        format!("{}/auth/callback", self.callback_domain.trim_end_matches('/'))
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("domain", &self.domain)
            .field("client_id", &self.client_id)
            .field("audience", &self.audience)
            .field("callback_domain", &self.callback_domain)
            .field("custom_property_namespace", &self.custom_property_namespace)
            .field("post_login_route", &self.post_login_route)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}
