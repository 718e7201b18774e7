//! Core types for StockSavvy.
//!
//! This module provides type-safe wrappers for domain concepts.

pub mod email;
pub mod id;
pub mod price;
pub mod role;
pub mod stock;

pub use email::{Email, EmailError};
pub use id::*;
pub use price::{Price, PriceError};
pub use role::{GrantRole, Role, RoleParseError};
pub use stock::{LOW_STOCK_THRESHOLD, StockStatus};
