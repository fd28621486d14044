//! Registration persistence.
//!
//! A registration binds an external identity to a caller-supplied endpoint.
//! Writes are idempotent upserts on the record key; re-registering replaces the
//! endpoint and keeps the identity that created the record.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use std::{fmt, str::FromStr};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// External account identifier resolved from a credential.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Identity(String);

impl Identity {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stable key a registration is stored under.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RecordKey(String);

impl RecordKey {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Which value registrations are keyed by.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum KeyStrategy {
    /// Key by the resolved identity; one record per account.
    #[default]
    Identity,
    /// Key by the credential; one record per login. Only the SHA-256 digest of
    /// the credential is stored.
    Credential,
}

impl KeyStrategy {
    #[must_use]
    pub fn record_key(self, identity: &Identity, credential: &SecretString) -> RecordKey {
        match self {
            Self::Identity => RecordKey(identity.as_str().to_string()),
            Self::Credential => {
                let digest = Sha256::digest(credential.expose_secret().as_bytes());
                RecordKey(format!("{digest:x}"))
            }
        }
    }
}

impl FromStr for KeyStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "identity" => Ok(Self::Identity),
            "credential" => Ok(Self::Credential),
            other => Err(format!(
                "invalid registration key {other:?}, expected identity or credential"
            )),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegistrationRecord {
    pub identity: Identity,
    pub endpoint: String,
}

/// Storage backend for registrations.
///
/// Implementations must serialize concurrent writes to the same key.
#[async_trait]
pub trait RegistrationStore: Send + Sync + fmt::Debug {
    /// Create the record or replace its endpoint. The stored identity is never
    /// rewritten by an update.
    async fn upsert(&self, key: &RecordKey, record: &RegistrationRecord)
        -> Result<(), StoreError>;

    async fn fetch(&self, key: &RecordKey) -> Result<Option<RegistrationRecord>, StoreError>;

    /// Cheap liveness check used by `/health`.
    async fn ping(&self) -> Result<(), StoreError>;

    fn backend(&self) -> &'static str;
}
