//! In-memory policy agent for tests/dev.

use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use crate::policy::{AuthorizationError, PolicyAgent};
use crate::tuple::{PolicyRequest, RelationTuple};

/// Map-based policy agent keyed by subject.
///
/// Each subject owns a set of `(object, relation)` pairs, so duplicate grants
/// collapse into one entry.
#[derive(Debug, Default)]
pub struct InMemoryPolicyAgent {
    tuples: RwLock<HashMap<String, HashSet<(String, String)>>>,
}

impl InMemoryPolicyAgent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a pre-populated tuple set.
    pub fn with_tuples(tuples: impl IntoIterator<Item = RelationTuple>) -> Self {
        let mut map: HashMap<String, HashSet<(String, String)>> = HashMap::new();
        for t in tuples {
            map.entry(t.subject).or_default().insert((t.object, t.relation));
        }
        Self {
            tuples: RwLock::new(map),
        }
    }

    /// Number of distinct tuples currently stored.
    pub fn len(&self) -> usize {
        self.tuples
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(HashSet::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl PolicyAgent for InMemoryPolicyAgent {
    async fn check_policy(&self, req: &PolicyRequest) -> Result<(), AuthorizationError> {
        let map = self
            .tuples
            .read()
            .map_err(|_| AuthorizationError::backend("lock poisoned"))?;

        let found = map
            .get(&req.subject)
            .is_some_and(|set| set.contains(&(req.object.clone(), req.relation.clone())));

        if found {
            Ok(())
        } else {
            Err(AuthorizationError::denied())
        }
    }

    async fn add_policy(&self, req: &PolicyRequest) -> Result<(), AuthorizationError> {
        let mut map = self
            .tuples
            .write()
            .map_err(|_| AuthorizationError::backend("lock poisoned"))?;

        map.entry(req.subject.clone())
            .or_default()
            .insert((req.object.clone(), req.relation.clone()));
        Ok(())
    }
}
