//! Firebase Identity Toolkit verifier.
//!
//! Tokens are checked by asking the provider to look the account up:
//! `POST {base}/v1/accounts:lookup?key={api_key}` with `{"idToken": ..}`.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use url::Url;

use stocksavvy_core::Email;

use super::{IdentityClaim, IdentityError, IdentityVerifier};

/// Production identity endpoint.
pub const DEFAULT_BASE_URL: &str = "https://identitytoolkit.googleapis.com";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LookupRequest<'a> {
    id_token: &'a str,
}

#[derive(Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    photo_url: Option<String>,
    #[serde(default)]
    email_verified: bool,
}

/// Verifies Firebase ID tokens over HTTP.
pub struct FirebaseVerifier {
    client: reqwest::Client,
    lookup_url: Url,
    api_key: SecretString,
}

impl std::fmt::Debug for FirebaseVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirebaseVerifier")
            .field("lookup_url", &self.lookup_url.as_str())
            .field("api_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl FirebaseVerifier {
    /// Build a verifier against `base_url` (the production endpoint or an emulator).
    ///
    /// # Errors
    ///
    /// Returns the URL parse error if `base_url` cannot be joined with the lookup path.
    pub fn new(
        client: reqwest::Client,
        base_url: &Url,
        api_key: SecretString,
    ) -> Result<Self, url::ParseError> {
        let mut base = base_url.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let lookup_url = base.join("v1/accounts:lookup")?;
        Ok(Self {
            client,
            lookup_url,
            api_key,
        })
    }

    #[must_use]
    pub const fn lookup_url(&self) -> &Url {
        &self.lookup_url
    }
}

fn claim_from_lookup(body: LookupResponse) -> Result<IdentityClaim, IdentityError> {
    let user = body
        .users
        .into_iter()
        .next()
        .ok_or(IdentityError::InvalidToken)?;

    // Accounts without an email cannot be matched to invites or admins.
    let email = user
        .email
        .as_deref()
        .map(Email::parse)
        .transpose()
        .map_err(|_| IdentityError::InvalidToken)?
        .ok_or(IdentityError::InvalidToken)?;

    Ok(IdentityClaim {
        subject_id: user.local_id,
        email,
        display_name: user.display_name.filter(|n| !n.trim().is_empty()),
        avatar_url: user.photo_url.filter(|u| !u.trim().is_empty()),
        email_verified: user.email_verified,
    })
}

#[async_trait]
impl IdentityVerifier for FirebaseVerifier {
    #[instrument(skip_all)]
    async fn verify(&self, token: &str) -> Result<IdentityClaim, IdentityError> {
        let mut url = self.lookup_url.clone();
        url.query_pairs_mut()
            .append_pair("key", self.api_key.expose_secret());

        let response = self
            .client
            .post(url)
            .json(&LookupRequest { id_token: token })
            .send()
            .await?;

        let status = response.status();
        if status.is_client_error() {
            tracing::debug!(%status, "identity provider rejected token");
            return Err(IdentityError::InvalidToken);
        }
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(IdentityError::Provider(format!("HTTP {status}: {error_text}")));
        }

        let body: LookupResponse = response.json().await?;
        claim_from_lookup(body)
    }
}
