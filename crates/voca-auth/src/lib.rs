//! Federated sign-in capability contracts.
//!
//! The shell talks to two identity providers through these traits. The
//! platform-specific SDK calls live in the host; this crate only fixes the
//! shapes the bridge depends on. Adapters never see bridge messages: the
//! caller marshals the outbound `*_oauth_app_callback` itself.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Sign-in failure taxonomy shared by both providers.
#[derive(Debug, Error)]
pub enum SignInError {
    /// The user backed out. Callers resolve this silently.
    #[error("sign-in cancelled by the user")]
    Cancelled,

    /// A sign-in is already running.
    #[error("sign-in already in progress")]
    InProgress,

    /// Platform auth services are missing or outdated.
    #[error("platform sign-in services unavailable")]
    ServicesUnavailable,

    /// Client id / entitlement misconfiguration.
    #[error("sign-in configuration error")]
    Configuration,

    #[error("sign-in failed: {0}")]
    Other(String),
}

/// Result of a successful Google sign-in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleIdentity {
    pub google_id: String,
    pub email: String,
    pub name: String,
    /// Token the web application authenticates with.
    pub id_token: String,
    /// One-time code exchangeable server-side for a refresh token.
    pub server_auth_code: String,
}

/// Result of a successful Apple sign-in.
///
/// Apple only discloses email and full name on the first authorization for
/// an app, so both are optional.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppleIdentity {
    /// Stable Apple user identifier.
    pub user: String,
    pub identity_token: String,
    pub email: Option<String>,
    pub full_name: Option<String>,
}

#[async_trait]
pub trait GoogleSignIn: Send + Sync {
    async fn sign_in(&self) -> Result<GoogleIdentity, SignInError>;
    async fn sign_out(&self) -> Result<(), SignInError>;
    /// Mint a fresh access token for the current account.
    async fn refresh_access_token(&self) -> Result<String, SignInError>;
    /// Forced re-consent: drop cached credentials and run sign-in again.
    async fn request_permissions(&self) -> Result<GoogleIdentity, SignInError>;
}

#[async_trait]
pub trait AppleSignIn: Send + Sync {
    async fn sign_in(&self) -> Result<AppleIdentity, SignInError>;
}
