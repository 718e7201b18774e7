//! Request extractors and middleware.
//!
//! - `auth` - bearer token authentication (`CurrentUser`)

pub mod auth;

pub use auth::CurrentUser;
