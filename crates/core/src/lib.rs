//! StockSavvy Core - Shared domain types.
//!
//! This crate provides the types used across StockSavvy components:
//! - `api` - Inventory HTTP API (users, stores, products)
//! - `cli` - Command-line tools for migrations and user management
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no
//! database access, no HTTP clients. Access decisions that need storage
//! live in the `api` crate.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, email, roles, prices and stock status

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
