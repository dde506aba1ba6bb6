//! Offset/limit pagination.

use serde::{Deserialize, Serialize};

/// Navigation metadata for a page of results.
///
/// `offset` and `limit` always carry what the caller asked for, even when the
/// page is empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMetadata {
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

impl PageMetadata {
    pub fn new(total: u64, offset: u64, limit: u64) -> Self {
        Self {
            total,
            offset,
            limit,
        }
    }
}

/// A page of items plus its metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(flatten)]
    pub metadata: PageMetadata,
    pub items: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(metadata: PageMetadata, items: Vec<T>) -> Self {
        Self { metadata, items }
    }

    /// An empty page that still echoes the requested window.
    pub fn empty(offset: u64, limit: u64) -> Self {
        Self {
            metadata: PageMetadata::new(0, offset, limit),
            items: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            metadata: self.metadata,
            items: self.items.into_iter().map(f).collect(),
        }
    }
}
