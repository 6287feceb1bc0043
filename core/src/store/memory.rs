use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use super::{AttributesStore, StoreError};
use crate::response::Attributes;

type RecordKey = (String, String);

/// Process-local store. Records are kept as encoded JSON so a write detaches
/// the stored copy from the caller's map.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAttributesStore {
    records: Arc<Mutex<HashMap<RecordKey, String>>>,
}

impl InMemoryAttributesStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }

    fn key(partition: &str, user_id: &str) -> Result<RecordKey, StoreError> {
        if partition.trim().is_empty() {
            return Err(StoreError::rejected(partition, user_id, "partition is empty"));
        }
        if user_id.trim().is_empty() {
            return Err(StoreError::rejected(partition, user_id, "user id is empty"));
        }
        Ok((partition.to_string(), user_id.to_string()))
    }
}

#[async_trait]
impl AttributesStore for InMemoryAttributesStore {
    async fn get(&self, partition: &str, user_id: &str) -> Result<Attributes, StoreError> {
        let key = Self::key(partition, user_id)?;
        let records = self.records.lock().await;
        match records.get(&key) {
            Some(encoded) => Ok(serde_json::from_str(encoded)?),
            None => Ok(Attributes::new()),
        }
    }

    async fn set(
        &self,
        partition: &str,
        user_id: &str,
        attributes: &Attributes,
    ) -> Result<(), StoreError> {
        let key = Self::key(partition, user_id)?;
        let encoded = serde_json::to_string(attributes)?;
        debug!(target: "store", partition, user_id, bytes = encoded.len(), "writing attributes");
        self.records.lock().await.insert(key, encoded);
        Ok(())
    }
}
