//! Business logic services.
//!
//! Services borrow the shared [`ResourceStore`](crate::db::ResourceStore)
//! for the length of one request and receive the acting user explicitly.
//!
//! # Services
//!
//! - `access` - store-level authorization decisions
//! - `directory` - identity claims to users, roles and profiles
//! - `inventory` - stores, products, summaries and worker invitations

pub mod access;
pub mod directory;
mod error;
pub mod inventory;

pub use access::AccessResolver;
pub use directory::UserDirectory;
pub use error::ServiceError;
pub use inventory::{Invitation, InventoryService, ProductChanges, ProductDraft};
