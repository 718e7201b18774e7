//! Store and store-access domain types.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stocksavvy_core::{GrantRole, StoreId, UserId};

/// A store (tenant) owning a set of products.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Store {
    pub id: StoreId,
    pub name: String,
    pub owner_id: UserId,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewStore {
    pub name: String,
    pub owner_id: UserId,
}

/// Permission for a user to act on a store they do not own.
///
/// Unique on `(user_id, store_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreAccessGrant {
    pub user_id: UserId,
    pub store_id: StoreId,
    pub role: GrantRole,
    pub created_at: DateTime<Utc>,
}

/// The set of stores an actor may see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreScope {
    /// Every store (admins).
    All,
    /// Exactly these stores. May be empty.
    Stores(BTreeSet<StoreId>),
}

impl StoreScope {
    #[must_use]
    pub fn contains(&self, store_id: StoreId) -> bool {
        match self {
            Self::All => true,
            Self::Stores(ids) => ids.contains(&store_id),
        }
    }

    /// True when no store can match.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Stores(ids) if ids.is_empty())
    }

    /// Narrow the scope to a single store, if it is visible.
    #[must_use]
    pub fn restrict_to(self, store_id: StoreId) -> Self {
        if self.contains(store_id) {
            Self::Stores(BTreeSet::from([store_id]))
        } else {
            Self::Stores(BTreeSet::new())
        }
    }
}

impl FromIterator<StoreId> for StoreScope {
    fn from_iter<I: IntoIterator<Item = StoreId>>(iter: I) -> Self {
        Self::Stores(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_contains() {
        let a = StoreId::new();
        let b = StoreId::new();
        let scope: StoreScope = [a].into_iter().collect();
        assert!(scope.contains(a));
        assert!(!scope.contains(b));
        assert!(StoreScope::All.contains(b));
    }

    #[test]
    fn test_restrict_to_hidden_store_is_empty() {
        let a = StoreId::new();
        let hidden = StoreId::new();
        let scope: StoreScope = [a].into_iter().collect();
        assert!(scope.clone().restrict_to(hidden).is_empty());
        assert_eq!(scope.restrict_to(a), StoreScope::Stores(BTreeSet::from([a])));
        assert!(!StoreScope::All.restrict_to(hidden).is_empty());
    }
}
