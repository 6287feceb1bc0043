//! Durable session attribute storage.
//!
//! Records are keyed by `(partition, user_id)`. Writes replace the whole
//! record, so two concurrent requests for the same user race with last write
//! wins; read-modify-write atomicity is the store's concern, not the caller's.

mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::response::Attributes;

pub use memory::InMemoryAttributesStore;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("attributes store unavailable: {message}")]
    Unavailable { message: String },
    #[error("attributes write rejected for {partition}/{user_id}: {message}")]
    Rejected {
        partition: String,
        user_id: String,
        message: String,
    },
    #[error("attributes could not be encoded: {message}")]
    Encoding { message: String },
    #[error("attributes store failed: {message}")]
    Other { message: String },
}

impl StoreError {
    pub fn unavailable<S: Into<String>>(message: S) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn rejected<P, U, M>(partition: P, user_id: U, message: M) -> Self
    where
        P: Into<String>,
        U: Into<String>,
        M: Into<String>,
    {
        Self::Rejected {
            partition: partition.into(),
            user_id: user_id.into(),
            message: message.into(),
        }
    }

    pub fn other<S: Into<String>>(message: S) -> Self {
        Self::Other {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Encoding {
            message: err.to_string(),
        }
    }
}

#[async_trait]
pub trait AttributesStore: Send + Sync {
    /// Loads the record for a user. Missing records read as an empty map.
    async fn get(&self, partition: &str, user_id: &str) -> Result<Attributes, StoreError>;

    /// Replaces the record for a user.
    async fn set(
        &self,
        partition: &str,
        user_id: &str,
        attributes: &Attributes,
    ) -> Result<(), StoreError>;
}
