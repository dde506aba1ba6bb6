//! Policy agent: the decision and mutation interface over relation tuples.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::tuple::PolicyRequest;

/// Boxed underlying failure, kept for diagnostics only.
pub type Cause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The single failure kind of a policy agent.
///
/// A denial and an unreachable backend are the same error: callers gate on
/// `Err` and must never treat an indeterminate answer as a grant. The cause,
/// when present, is only reachable through [`std::error::Error::source`].
#[derive(Debug, Error)]
#[error("failed to perform authorization over the entity")]
pub struct AuthorizationError {
    #[source]
    cause: Option<Cause>,
}

impl AuthorizationError {
    /// The backend answered, and the answer was no.
    pub fn denied() -> Self {
        Self { cause: None }
    }

    /// The backend could not answer.
    pub fn backend(cause: impl Into<Cause>) -> Self {
        Self {
            cause: Some(cause.into()),
        }
    }
}

/// Stateless decision/mutation interface over relation tuples.
///
/// Implementations must agree on observable behaviour: after `add_policy(t)`
/// succeeds, `check_policy(t)` succeeds; a tuple never added is denied.
#[async_trait]
pub trait PolicyAgent: Send + Sync {
    /// Succeeds exactly when a tuple matching all three fields exists.
    async fn check_policy(&self, req: &PolicyRequest) -> Result<(), AuthorizationError>;

    /// Inserts the tuple. Granting an existing tuple again is not an error.
    async fn add_policy(&self, req: &PolicyRequest) -> Result<(), AuthorizationError>;
}

#[async_trait]
impl<P> PolicyAgent for Arc<P>
where
    P: PolicyAgent + ?Sized,
{
    async fn check_policy(&self, req: &PolicyRequest) -> Result<(), AuthorizationError> {
        (**self).check_policy(req).await
    }

    async fn add_policy(&self, req: &PolicyRequest) -> Result<(), AuthorizationError> {
        (**self).add_policy(req).await
    }
}
