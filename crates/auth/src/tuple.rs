//! Relation-tuple model.
//!
//! Every authorization decision and grant is expressed as a
//! `(subject, object, relation)` triple inside the single [`NAMESPACE`].

use serde::{Deserialize, Serialize};

/// Namespace all tuples live in. Tuples are never compared across namespaces.
pub const NAMESPACE: &str = "members";

/// Reserved subject used for the bootstrap registration check.
///
/// Granting `WILDCARD_SUBJECT` the `create` relation on [`Object::User`] opens
/// registration to anonymous callers.
pub const WILDCARD_SUBJECT: &str = "*";

/// Closed vocabulary of relations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    Member,
    Create,
}

impl Relation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Relation::Member => "member",
            Relation::Create => "create",
        }
    }
}

/// Well-known objects referenced by the user-management flows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Object {
    /// Global collection every registered user is a member of.
    Users,
    /// Administrators allowed to register other users.
    Authorities,
    /// The user resource type, target of the bootstrap `create` check.
    User,
}

impl Object {
    pub fn as_str(&self) -> &'static str {
        match self {
            Object::Users => "users",
            Object::Authorities => "authorities",
            Object::User => "user",
        }
    }
}

macro_rules! impl_vocabulary {
    ($t:ty) => {
        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl From<$t> for String {
            fn from(value: $t) -> Self {
                value.as_str().to_string()
            }
        }
    };
}

impl_vocabulary!(Relation);
impl_vocabulary!(Object);

/// `subject` holds `relation` on `object`.
///
/// Subjects and objects are opaque: user ids, group ids or one of the
/// well-known [`Object`] names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelationTuple {
    pub subject: String,
    pub object: String,
    pub relation: String,
}

/// Checks and grants carry the same triple.
pub type PolicyRequest = RelationTuple;

impl RelationTuple {
    pub fn new(
        subject: impl Into<String>,
        object: impl Into<String>,
        relation: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            object: object.into(),
            relation: relation.into(),
        }
    }

    /// The bootstrap check: may anyone create users?
    pub fn bootstrap() -> Self {
        Self::new(WILDCARD_SUBJECT, Object::User, Relation::Create)
    }
}

impl core::fmt::Display for RelationTuple {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}:{}#{}@{}", NAMESPACE, self.object, self.relation, self.subject)
    }
}
