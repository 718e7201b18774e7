//! Domain models for the inventory API.
//!
//! These are validated domain objects; storage backends convert their rows
//! into these types and handlers serialize them directly.

pub mod product;
pub mod store;
pub mod user;

pub use product::{
    CategoryTotals, InventorySummary, NewProduct, Product, ProductFilter, ProductPatch,
};
pub use store::{NewStore, Store, StoreAccessGrant, StoreScope};
pub use user::{NewUser, PLACEHOLDER_IDENTITY_PREFIX, ProfileUpdate, User};
