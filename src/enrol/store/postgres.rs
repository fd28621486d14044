//! `PostgreSQL` registration store. Schema lives in `sql/schema.sql`.

use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, Connection, PgPool, Row};
use std::time::Duration;
use tracing::{info_span, Instrument};

use super::{Identity, RecordKey, RegistrationRecord, RegistrationStore, StoreError};

// identity is never part of the UPDATE list
const UPSERT_REGISTRATION: &str = r"
    INSERT INTO registrations (record_key, identity, endpoint)
    VALUES ($1, $2, $3)
    ON CONFLICT (record_key) DO UPDATE SET
        endpoint = EXCLUDED.endpoint,
        updated_at = NOW()
";

const SELECT_REGISTRATION: &str =
    "SELECT identity, endpoint FROM registrations WHERE record_key = $1";

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Build a pool for `dsn`. The pool connects lazily, so an unreachable
    /// database surfaces as a per-request store error instead of a startup
    /// failure.
    ///
    /// # Errors
    /// Returns an error if the DSN cannot be parsed.
    pub fn connect_lazy(dsn: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .min_connections(1)
            .max_connections(5)
            .max_lifetime(Duration::from_secs(60 * 2))
            .test_before_acquire(true)
            .connect_lazy(dsn)?;

        Ok(Self::new(pool))
    }
}

#[async_trait]
impl RegistrationStore for PostgresStore {
    async fn upsert(
        &self,
        key: &RecordKey,
        record: &RegistrationRecord,
    ) -> Result<(), StoreError> {
        let span = info_span!(
            "db.upsert",
            db.system = "postgresql",
            db.operation = "INSERT",
            identity = %record.identity
        );

        sqlx::query(UPSERT_REGISTRATION)
            .bind(key.as_str())
            .bind(record.identity.as_str())
            .bind(&record.endpoint)
            .execute(&self.pool)
            .instrument(span)
            .await?;

        Ok(())
    }

    async fn fetch(&self, key: &RecordKey) -> Result<Option<RegistrationRecord>, StoreError> {
        let span = info_span!("db.select", db.system = "postgresql", db.operation = "SELECT");

        let row = sqlx::query(SELECT_REGISTRATION)
            .bind(key.as_str())
            .fetch_optional(&self.pool)
            .instrument(span)
            .await?;

        Ok(row.map(|row| RegistrationRecord {
            identity: Identity::new(row.get::<String, _>("identity")),
            endpoint: row.get("endpoint"),
        }))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let span = info_span!("db.ping", db.system = "postgresql", db.operation = "PING");

        async {
            let mut conn = self.pool.acquire().await?;
            conn.ping().await?;
            Ok::<(), StoreError>(())
        }
        .instrument(span)
        .await
    }

    fn backend(&self) -> &'static str {
        "postgresql"
    }
}
