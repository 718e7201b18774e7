//! User domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stocksavvy_core::{Email, Role, UserId};

/// Prefix of the external identity assigned to users created by an invite
/// before they have ever signed in.
pub const PLACEHOLDER_IDENTITY_PREFIX: &str = "placeholder-";

/// A user of the inventory system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    /// Subject id issued by the identity provider. Unique, never changes
    /// once a real identity has been attached.
    pub external_identity_id: String,
    pub email: Email,
    pub display_name: Option<String>,
    pub role: Role,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// True for rows created by an invite that no one has signed in as yet.
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.external_identity_id
            .starts_with(PLACEHOLDER_IDENTITY_PREFIX)
    }

    /// Display name, falling back to the email local part.
    #[must_use]
    pub fn name(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| self.email.local_part())
    }
}

/// Fields required to insert a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub external_identity_id: String,
    pub email: Email,
    pub display_name: Option<String>,
    pub role: Role,
    pub avatar_url: Option<String>,
}

impl NewUser {
    /// A placeholder row for an invited email with no identity yet.
    #[must_use]
    pub fn placeholder(email: Email) -> Self {
        Self {
            external_identity_id: format!("{PLACEHOLDER_IDENTITY_PREFIX}{}", uuid::Uuid::new_v4()),
            email,
            display_name: None,
            role: Role::Worker,
            avatar_url: None,
        }
    }

    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.external_identity_id
            .starts_with(PLACEHOLDER_IDENTITY_PREFIX)
    }
}

/// Self-service profile edit. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

impl ProfileUpdate {
    /// Drop blank values so they count as "unset".
    #[must_use]
    pub fn normalized(self) -> Self {
        let keep = |v: Option<String>| {
            v.map(|s| s.trim().to_owned())
                .filter(|s| !s.is_empty())
        };
        Self {
            display_name: keep(self.display_name),
            avatar_url: keep(self.avatar_url),
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.display_name.is_none() && self.avatar_url.is_none()
    }
}
