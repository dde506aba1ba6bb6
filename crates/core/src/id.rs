//! Identifier generation.

use uuid::Uuid;

/// Source of fresh, unique identifiers for new entities.
pub trait IdProvider: Send + Sync {
    fn id(&self) -> anyhow::Result<String>;
}

/// Random (v4) UUID identifiers.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidProvider;

impl UuidProvider {
    pub fn new() -> Self {
        Self
    }
}

impl IdProvider for UuidProvider {
    fn id(&self) -> anyhow::Result<String> {
        Ok(Uuid::new_v4().to_string())
    }
}
