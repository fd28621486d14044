//! In-memory registration store.
//!
//! Used by tests and when no DSN is configured. Data is lost on restart.

use async_trait::async_trait;
use std::collections::{hash_map::Entry, HashMap};
use tokio::sync::RwLock;
use tracing::info;

use super::{RecordKey, RegistrationRecord, RegistrationStore, StoreError};

#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<RecordKey, RegistrationRecord>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl RegistrationStore for MemoryStore {
    async fn upsert(
        &self,
        key: &RecordKey,
        record: &RegistrationRecord,
    ) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        match records.entry(key.clone()) {
            Entry::Occupied(mut existing) => {
                existing.get_mut().endpoint.clone_from(&record.endpoint);
                info!(identity = %existing.get().identity, "Updated registration");
            }
            Entry::Vacant(slot) => {
                info!(identity = %record.identity, "Created registration");
                slot.insert(record.clone());
            }
        }
        Ok(())
    }

    async fn fetch(&self, key: &RecordKey) -> Result<Option<RegistrationRecord>, StoreError> {
        Ok(self.records.read().await.get(key).cloned())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrol::store::{Identity, KeyStrategy};
    use anyhow::Result;
    use secrecy::SecretString;

    fn record(identity: &str, endpoint: &str) -> RegistrationRecord {
        RegistrationRecord {
            identity: Identity::new(identity),
            endpoint: endpoint.to_string(),
        }
    }

    #[tokio::test]
    async fn upsert_creates_then_replaces_endpoint() -> Result<()> {
        let store = MemoryStore::new();
        let key = KeyStrategy::Identity.record_key(
            &Identity::new("42"),
            &SecretString::from("t".to_string()),
        );

        store.upsert(&key, &record("42", "https://host/cb")).await?;
        assert_eq!(
            store.fetch(&key).await?,
            Some(record("42", "https://host/cb"))
        );

        store.upsert(&key, &record("42", "https://host/cb2")).await?;
        assert_eq!(
            store.fetch(&key).await?,
            Some(record("42", "https://host/cb2"))
        );
        assert_eq!(store.len().await, 1);
        Ok(())
    }

    #[tokio::test]
    async fn update_keeps_original_identity() -> Result<()> {
        let store = MemoryStore::new();
        let credential = SecretString::from("gho_token".to_string());
        let key = KeyStrategy::Credential.record_key(&Identity::new("1"), &credential);

        store.upsert(&key, &record("1", "https://a")).await?;
        store.upsert(&key, &record("2", "https://b")).await?;

        let stored = store.fetch(&key).await?;
        assert_eq!(stored, Some(record("1", "https://b")));
        Ok(())
    }

    #[tokio::test]
    async fn fetch_missing_returns_none() -> Result<()> {
        let store = MemoryStore::new();
        let key = KeyStrategy::Identity.record_key(
            &Identity::new("404"),
            &SecretString::from("t".to_string()),
        );
        assert_eq!(store.fetch(&key).await?, None);
        assert!(store.is_empty().await);
        Ok(())
    }
}
