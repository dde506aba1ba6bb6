//! Batch policy grants.

use serde::{Deserialize, Serialize};

use crate::identity::AuthError;
use crate::tuple::RelationTuple;

/// Grant every listed relation on `object` to every listed subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePoliciesRequest {
    #[serde(rename = "subjects")]
    pub subject_ids: Vec<String>,
    pub policies: Vec<String>,
    pub object: String,
}

impl CreatePoliciesRequest {
    /// Reject anonymous callers and incomplete requests.
    pub fn validate(&self, token: &str) -> Result<(), AuthError> {
        if token.is_empty() {
            return Err(AuthError::Unauthorized);
        }

        if self.subject_ids.is_empty() {
            return Err(AuthError::MalformedEntity("no subjects".to_string()));
        }
        if self.policies.is_empty() {
            return Err(AuthError::MalformedEntity("no policies".to_string()));
        }
        if self.object.is_empty() {
            return Err(AuthError::MalformedEntity("empty object".to_string()));
        }

        Ok(())
    }

    /// Cartesian product of subjects and policies on the object.
    pub fn tuples(&self) -> impl Iterator<Item = RelationTuple> + '_ {
        self.subject_ids.iter().flat_map(move |subject| {
            self.policies
                .iter()
                .map(move |policy| RelationTuple::new(subject.as_str(), self.object.as_str(), policy.as_str()))
        })
    }
}
