// Storage collaborator traits
// The application core only talks to these traits; the backends in
// memory.rs and dir.rs implement them

pub mod dir;
pub mod memory;

use thiserror::Error;

use crate::catalog::{Category, Software, Tutorial};
use crate::stats::UsageEvent;
use crate::votes::VoteDelta;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed record: {0}")]
    Malformed(String),
    #[error("backend rejected the request: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence for tutorial records and their categories
pub trait TutorialStore {
    fn list_tutorials(&self) -> StoreResult<Vec<Tutorial>>;
    fn get_tutorial(&self, id: &str) -> StoreResult<Tutorial>;
    fn save_tutorial(&self, tutorial: &Tutorial) -> StoreResult<()>;
    fn delete_tutorial(&self, id: &str) -> StoreResult<()>;
    /// Apply a counter delta as one atomic update, clamped at zero,
    /// and return the updated record
    fn apply_vote_delta(&self, id: &str, delta: VoteDelta) -> StoreResult<Tutorial>;
    fn list_tutorial_categories(&self) -> StoreResult<Vec<Category>>;
    fn save_tutorial_category(&self, category: &Category) -> StoreResult<()>;
}

/// Persistence for software records and their categories
pub trait SoftwareStore {
    fn list_software(&self) -> StoreResult<Vec<Software>>;
    fn get_software(&self, id: &str) -> StoreResult<Software>;
    fn save_software(&self, software: &Software) -> StoreResult<()>;
    fn delete_software(&self, id: &str) -> StoreResult<()>;
    fn list_software_categories(&self) -> StoreResult<Vec<Category>>;
    fn save_software_category(&self, category: &Category) -> StoreResult<()>;
}

/// Binary object storage addressed by bucket and key
pub trait ObjectStorage {
    fn upload(&self, bucket: &str, key: &str, bytes: &[u8]) -> StoreResult<()>;
    /// Resolve the public URL for a stored object; purely computed,
    /// the object need not exist
    fn public_url(&self, bucket: &str, key: &str) -> String;
    /// Delete an object; deleting a missing object is not an error
    fn delete(&self, bucket: &str, key: &str) -> StoreResult<()>;
}

/// Local durable key/value storage for per-viewer state
///
/// Writes are best-effort: a backend that fails to persist logs the
/// failure and carries on, so callers never see an error here.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// Append-only log of usage events
pub trait UsageLog {
    fn record(&self, event: UsageEvent) -> StoreResult<()>;
    fn events(&self) -> StoreResult<Vec<UsageEvent>>;
}
