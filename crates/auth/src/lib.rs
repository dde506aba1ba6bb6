//! `warden-auth`: relation-tuple authorization boundary.
//!
//! Holds the tuple model, the [`PolicyAgent`] contract with its remote and
//! in-memory backends, and the identity client contract consumed by the
//! user-management core. Decoupled from HTTP transport and user storage.

pub mod bearer;
pub mod claims;
pub mod identity;
pub mod keto;
pub mod local;
pub mod memory;
pub mod policies;
pub mod policy;
pub mod tuple;

pub use bearer::{BearerError, extract_bearer};
pub use claims::{KeyClaims, TokenValidationError, validate_claims};
pub use identity::{AuthError, AuthService, Identity, TokenKind};
pub use keto::{KetoConfig, KetoPolicyAgent};
pub use local::{KeyConfig, LocalAuthService};
pub use memory::InMemoryPolicyAgent;
pub use policies::CreatePoliciesRequest;
pub use policy::{AuthorizationError, Cause, PolicyAgent};
pub use tuple::{NAMESPACE, Object, PolicyRequest, Relation, RelationTuple, WILDCARD_SUBJECT};
