//! `warden-core`: primitives shared by the authorization and user crates.
//!
//! Nothing here performs IO beyond reading the process environment.

pub mod env;
pub mod id;
pub mod page;

pub use env::{EnvError, env_or, parse_env_or};
pub use id::{IdProvider, UuidProvider};
pub use page::{Page, PageMetadata};
