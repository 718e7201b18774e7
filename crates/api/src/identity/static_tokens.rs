//! Fixed token table verifier.

use std::collections::HashMap;

use async_trait::async_trait;

use super::{IdentityClaim, IdentityError, IdentityVerifier};

/// Accepts exactly the tokens it was built with.
///
/// ```
/// use stocksavvy_api::identity::StaticTokenVerifier;
///
/// let verifier = StaticTokenVerifier::from_json(
///     r#"{"tok-owner": {"subject_id": "uid-owner", "email": "owner@shop.io"}}"#,
/// )
/// .unwrap();
/// assert_eq!(verifier.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticTokenVerifier {
    tokens: HashMap<String, IdentityClaim>,
}

impl StaticTokenVerifier {
    #[must_use]
    pub const fn new(tokens: HashMap<String, IdentityClaim>) -> Self {
        Self { tokens }
    }

    /// Parse a `{"token": {"subject_id": .., "email": ..}}` table.
    ///
    /// # Errors
    ///
    /// Returns the JSON error if the table is malformed or an email is invalid.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw).map(Self::new)
    }

    /// Add or replace a token.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>, claim: IdentityClaim) -> Self {
        self.tokens.insert(token.into(), claim);
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[async_trait]
impl IdentityVerifier for StaticTokenVerifier {
    async fn verify(&self, token: &str) -> Result<IdentityClaim, IdentityError> {
        self.tokens
            .get(token)
            .cloned()
            .ok_or(IdentityError::InvalidToken)
    }
}
