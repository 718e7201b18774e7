//! User roles and store grant roles.

use serde::{Deserialize, Serialize};

/// Error returned when a role string is not recognised.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid role: {0} (expected admin, owner or worker)")]
pub struct RoleParseError(pub String);

/// Global role of a user.
///
/// Admins see and mutate everything. Owners act on the stores they own
/// (and stores they were granted). Workers act only on granted stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Owner,
    #[default]
    Worker,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Owner => "owner",
            Self::Worker => "worker",
        }
    }

    /// Whether this role may create stores, invite workers and delete products.
    #[must_use]
    pub const fn can_mutate(self) -> bool {
        matches!(self, Self::Admin | Self::Owner)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "owner" => Ok(Self::Owner),
            "worker" => Ok(Self::Worker),
            _ => Err(RoleParseError(s.to_owned())),
        }
    }
}

/// Role carried by a store access grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GrantRole {
    Owner,
    #[default]
    Worker,
}

impl GrantRole {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Worker => "worker",
        }
    }
}

impl std::fmt::Display for GrantRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for GrantRole {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "owner" => Ok(Self::Owner),
            "worker" => Ok(Self::Worker),
            _ => Err(RoleParseError(s.to_owned())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse_and_display() {
        for role in [Role::Admin, Role::Owner, Role::Worker] {
            assert_eq!(role.to_string().parse::<Role>().unwrap(), role);
        }
        assert_eq!(" OWNER ".parse::<Role>().unwrap(), Role::Owner);
        assert!("superuser".parse::<Role>().is_err());
    }

    #[test]
    fn test_default_role_is_worker() {
        assert_eq!(Role::default(), Role::Worker);
    }

    #[test]
    fn test_can_mutate() {
        assert!(Role::Admin.can_mutate());
        assert!(Role::Owner.can_mutate());
        assert!(!Role::Worker.can_mutate());
    }

    #[test]
    fn test_role_serde_is_snake_case() {
        assert_eq!(serde_json::to_string(&Role::Owner).unwrap(), "\"owner\"");
        let role: Role = serde_json::from_str("\"admin\"").unwrap();
        assert_eq!(role, Role::Admin);
    }

    #[test]
    fn test_grant_role_rejects_admin() {
        assert!("admin".parse::<GrantRole>().is_err());
        assert_eq!("worker".parse::<GrantRole>().unwrap(), GrantRole::Worker);
    }
}
