//! Bearer token verification against an external identity provider.
//!
//! Handlers never see raw tokens. The `CurrentUser` extractor hands the
//! token to an [`IdentityVerifier`] and gets back an [`IdentityClaim`],
//! which the user directory turns into a [`User`](crate::models::User).
//!
//! # Verifiers
//!
//! - [`FirebaseVerifier`] - Firebase Identity Toolkit `accounts:lookup`
//! - [`StaticTokenVerifier`] - fixed token table for local development and tests

mod firebase;
mod static_tokens;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use stocksavvy_core::Email;

pub use firebase::{DEFAULT_BASE_URL, FirebaseVerifier};
pub use static_tokens::StaticTokenVerifier;

/// Verified identity assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityClaim {
    /// Stable subject id issued by the provider.
    pub subject_id: String,
    pub email: Email,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    /// Whether the provider has confirmed the caller owns `email`. Static
    /// token tables are operator-written, so entries default to verified.
    #[serde(default = "verified")]
    pub email_verified: bool,
}

const fn verified() -> bool {
    true
}

/// Errors that can occur while verifying a token.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// Token is malformed, expired, revoked or unknown.
    #[error("invalid or expired token")]
    InvalidToken,

    /// The provider could not be reached or answered unexpectedly.
    #[error("identity provider error: {0}")]
    Provider(String),
}

// The lookup URL carries the API key in its query string.
impl From<reqwest::Error> for IdentityError {
    fn from(err: reqwest::Error) -> Self {
        Self::Provider(err.without_url().to_string())
    }
}

/// Turns a bearer token into a verified claim.
#[async_trait]
pub trait IdentityVerifier: Send + Sync + 'static {
    /// Verify a raw bearer token (without the `Bearer ` prefix).
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::InvalidToken` for tokens the provider rejects,
    /// `IdentityError::Provider` when verification itself failed.
    async fn verify(&self, token: &str) -> Result<IdentityClaim, IdentityError>;
}
