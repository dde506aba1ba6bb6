//! `warden-users`: user-management core.
//!
//! Registration, login, profile and password flows behind the [`Service`]
//! trait. Storage, hashing, email delivery and identity resolution are
//! injected through the contracts in [`ports`] and `warden-auth`.

pub mod config;
pub mod emailer;
pub mod error;
pub mod hasher;
pub mod memory;
pub mod ports;
pub mod service;
pub mod user;

pub use config::{ConfigError, DEFAULT_PASS_REGEX, UsersConfig};
pub use emailer::LogEmailer;
pub use error::{ErrorKind, UsersError, UsersResult};
pub use hasher::{Argon2Hasher, HashError};
pub use memory::InMemoryUserRepository;
pub use ports::{Emailer, Hasher, PageQuery, UserRepository};
pub use service::{Service, UsersService};
pub use user::{Metadata, User};
