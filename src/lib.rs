//! authflow: redirect-based authentication session management
//!
//! Wraps an external redirect-based identity provider behind a typed
//! session state machine for Rust UI applications:
//!
//! - [`AuthClient`] owns the canonical [`AuthState`] for one boundary and
//!   exposes the consumer surface: `login`/`signup`/`logout` redirects,
//!   callback processing, and read accessors for session and roles.
//! - [`AuthState`] changes only through the closed [`AuthEvent`] reducer.
//! - [`IdentityProvider`] is the seam to the external provider;
//!   [`RedirectProvider`] is the stock hosted-page implementation.
//!
//! Credential verification, token signature checks and token persistence
//! stay with the provider and the hosting application.

pub mod client;
pub mod config;
pub mod error;
pub mod provider;
pub mod session;
pub mod state;
pub mod types;

#[cfg(test)]
mod tests_flow;

pub use client::{AuthClient, HandleAuthentication};
pub use config::{AuthConfig, Navigate};
pub use error::AuthError;
pub use provider::{decode_id_token_claims, IdentityProvider, RedirectProvider, ScreenHint};
pub use session::{handle_auth_result, set_session};
pub use state::{AuthEvent, AuthState};
pub use types::{AuthResult, UserProfile};
