//! Application state shared across handlers.

use std::sync::Arc;

use stocksavvy_core::Email;

use crate::config::ApiConfig;
use crate::db::ResourceStore;
use crate::identity::IdentityVerifier;
use crate::services::{InventoryService, UserDirectory};

/// Application state shared across all handlers.
///
/// Cloning is cheap; everything lives behind one `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    store: Arc<dyn ResourceStore>,
    verifier: Arc<dyn IdentityVerifier>,
}

impl AppState {
    #[must_use]
    pub fn new(
        config: ApiConfig,
        store: Arc<dyn ResourceStore>,
        verifier: Arc<dyn IdentityVerifier>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                verifier,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn store(&self) -> &dyn ResourceStore {
        self.inner.store.as_ref()
    }

    #[must_use]
    pub fn verifier(&self) -> &dyn IdentityVerifier {
        self.inner.verifier.as_ref()
    }

    #[must_use]
    pub fn bootstrap_admin_email(&self) -> Option<&Email> {
        self.inner.config.bootstrap_admin_email.as_ref()
    }

    /// User directory bound to this state's store.
    #[must_use]
    pub fn directory(&self) -> UserDirectory<'_> {
        UserDirectory::new(self.store(), self.bootstrap_admin_email())
    }

    /// Inventory service bound to this state's store.
    #[must_use]
    pub fn inventory(&self) -> InventoryService<'_> {
        InventoryService::new(self.store())
    }
}
