//! PostgreSQL implementation of EntitlementStore.
//!
//! Every mutating operation takes a transaction-scoped advisory lock on its
//! business key (`pg_advisory_xact_lock(hashtext(key))`). The lock is released
//! by PostgreSQL itself on commit or rollback, so an abandoned transaction
//! can never leave a key locked. Waiting is bounded by `lock_timeout`, set
//! per transaction.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgConnection;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::entitlement::{
    Email, Entitlement, Plan, RecurringSchedule, SubscriptionId, SubscriptionStatus,
};
use crate::domain::foundation::{DomainError, EntitlementId, ErrorCode, Timestamp};
use crate::ports::{EntitlementStore, EntitlementTransaction};

/// SQLSTATE raised when `lock_timeout` elapses.
const LOCK_NOT_AVAILABLE: &str = "55P03";
/// SQLSTATE raised when `statement_timeout` elapses.
const QUERY_CANCELED: &str = "57014";

const SELECT_COLUMNS: &str = "id, email, name, plan, expires_at, subscription_id, \
     subscription_status, last_paid_amount, created_at, updated_at";

/// PostgreSQL implementation of the EntitlementStore port.
pub struct PostgresEntitlementStore {
    pool: PgPool,
    lock_timeout: Duration,
}

impl PostgresEntitlementStore {
    /// Creates a store whose transactions wait at most `lock_timeout` for a key lock.
    pub fn new(pool: PgPool, lock_timeout: Duration) -> Self {
        Self { pool, lock_timeout }
    }
}

/// Database row representation of an entitlement.
#[derive(Debug, sqlx::FromRow)]
struct EntitlementRow {
    id: Uuid,
    email: String,
    name: String,
    plan: String,
    expires_at: DateTime<Utc>,
    subscription_id: Option<String>,
    subscription_status: Option<String>,
    last_paid_amount: f64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<EntitlementRow> for Entitlement {
    type Error = DomainError;

    fn try_from(row: EntitlementRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid email in row: {}", e))
        })?;
        let plan: Plan = row.plan.parse().map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid plan in row: {}", e))
        })?;
        let schedule = row
            .subscription_id
            .as_deref()
            .and_then(|raw| SubscriptionId::parse(raw).ok())
            .map(|id| RecurringSchedule {
                id,
                status: SubscriptionStatus::from_provider(
                    row.subscription_status.as_deref().unwrap_or_default(),
                ),
            });

        Ok(Entitlement {
            id: EntitlementId::from_uuid(row.id),
            email,
            name: row.name,
            plan,
            expires_at: Timestamp::from_datetime(row.expires_at),
            schedule,
            last_paid_amount: row.last_paid_amount,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

fn email_lock_key(email: &Email) -> String {
    format!("email:{}", email)
}

fn subscription_lock_key(subscription_id: &SubscriptionId) -> String {
    format!("subscription:{}", subscription_id)
}

fn map_db_error(context: &str, e: sqlx::Error) -> DomainError {
    if let sqlx::Error::Database(db_err) = &e {
        match db_err.code().as_deref() {
            Some(LOCK_NOT_AVAILABLE) | Some(QUERY_CANCELED) => {
                return DomainError::new(
                    ErrorCode::LockTimeout,
                    format!("{}: lock wait timed out", context),
                );
            }
            _ => {}
        }
    }
    DomainError::new(ErrorCode::DatabaseError, format!("{}: {}", context, e))
}

#[async_trait]
impl EntitlementStore for PostgresEntitlementStore {
    async fn begin(&self) -> Result<Box<dyn EntitlementTransaction>, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_db_error("Failed to begin transaction", e))?;

        sqlx::query("SELECT set_config('lock_timeout', $1, true)")
            .bind(format!("{}ms", self.lock_timeout.as_millis()))
            .execute(&mut *tx)
            .await
            .map_err(|e| map_db_error("Failed to set lock_timeout", e))?;

        Ok(Box::new(PostgresEntitlementTransaction {
            tx: Some(tx),
            locked: HashSet::new(),
        }))
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<Entitlement>, DomainError> {
        let row: Option<EntitlementRow> = sqlx::query_as(&format!(
            "SELECT {} FROM entitlements WHERE email = $1",
            SELECT_COLUMNS
        ))
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_db_error("Failed to find entitlement", e))?;

        row.map(Entitlement::try_from).transpose()
    }
}

struct PostgresEntitlementTransaction {
    tx: Option<Transaction<'static, Postgres>>,
    locked: HashSet<String>,
}

impl PostgresEntitlementTransaction {
    fn conn(&mut self) -> Result<&mut PgConnection, DomainError> {
        self.tx.as_deref_mut().ok_or_else(|| {
            DomainError::new(ErrorCode::DatabaseError, "Transaction already committed")
        })
    }

    /// Takes the advisory lock for `key` unless this transaction already holds it.
    async fn lock(&mut self, key: String) -> Result<(), DomainError> {
        if self.locked.contains(&key) {
            return Ok(());
        }
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(&key)
            .execute(self.conn()?)
            .await
            .map_err(|e| map_db_error("Failed to acquire key lock", e))?;
        tracing::trace!(key = %key, "Acquired advisory lock");
        self.locked.insert(key);
        Ok(())
    }

    async fn select_by_email(&mut self, email: &Email) -> Result<Option<Entitlement>, DomainError> {
        let row: Option<EntitlementRow> = sqlx::query_as(&format!(
            "SELECT {} FROM entitlements WHERE email = $1",
            SELECT_COLUMNS
        ))
        .bind(email.as_str())
        .fetch_optional(self.conn()?)
        .await
        .map_err(|e| map_db_error("Failed to find entitlement", e))?;

        row.map(Entitlement::try_from).transpose()
    }

    async fn insert(&mut self, record: &Entitlement) -> Result<Entitlement, DomainError> {
        let row: EntitlementRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO entitlements (
                id, email, name, plan, expires_at, subscription_id,
                subscription_status, last_paid_amount, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {}
            "#,
            SELECT_COLUMNS
        ))
        .bind(record.id.as_uuid())
        .bind(record.email.as_str())
        .bind(&record.name)
        .bind(record.plan.as_str())
        .bind(record.expires_at.as_datetime())
        .bind(record.subscription_id().map(|id| id.as_str()))
        .bind(record.subscription_status().map(|s| s.as_str()))
        .bind(record.last_paid_amount)
        .bind(record.created_at.as_datetime())
        .bind(record.updated_at.as_datetime())
        .fetch_one(self.conn()?)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.constraint() == Some("entitlements_email_key") {
                    return DomainError::new(
                        ErrorCode::EntitlementExists,
                        format!("Entitlement already exists for {}", record.email),
                    )
                    .with_detail("email", record.email.as_str());
                }
            }
            map_db_error("Failed to insert entitlement", e)
        })?;

        Entitlement::try_from(row)
    }
}

#[async_trait]
impl EntitlementTransaction for PostgresEntitlementTransaction {
    async fn find_by_email(&mut self, email: &Email) -> Result<Option<Entitlement>, DomainError> {
        self.select_by_email(email).await
    }

    async fn create(&mut self, record: &Entitlement) -> Result<Entitlement, DomainError> {
        self.insert(record).await
    }

    async fn find_or_create(&mut self, candidate: &Entitlement) -> Result<Entitlement, DomainError> {
        self.lock(email_lock_key(&candidate.email)).await?;
        if let Some(existing) = self.select_by_email(&candidate.email).await? {
            return Ok(existing);
        }
        self.insert(candidate).await
    }

    async fn replace_entitlement(&mut self, record: &Entitlement) -> Result<(), DomainError> {
        self.lock(email_lock_key(&record.email)).await?;

        let result = sqlx::query(
            r#"
            UPDATE entitlements SET
                name = $2,
                plan = $3,
                expires_at = $4,
                subscription_id = $5,
                subscription_status = $6,
                last_paid_amount = $7,
                updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(record.id.as_uuid())
        .bind(&record.name)
        .bind(record.plan.as_str())
        .bind(record.expires_at.as_datetime())
        .bind(record.subscription_id().map(|id| id.as_str()))
        .bind(record.subscription_status().map(|s| s.as_str()))
        .bind(record.last_paid_amount)
        .bind(record.updated_at.as_datetime())
        .execute(self.conn()?)
        .await
        .map_err(|e| map_db_error("Failed to replace entitlement", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::EntitlementNotFound,
                format!("Entitlement not found: {}", record.id),
            ));
        }

        Ok(())
    }

    async fn set_subscription_status(
        &mut self,
        subscription_id: &SubscriptionId,
        status: &SubscriptionStatus,
    ) -> Result<(), DomainError> {
        self.lock(subscription_lock_key(subscription_id)).await?;

        let result = sqlx::query(
            r#"
            UPDATE entitlements SET
                subscription_status = $2,
                updated_at = NOW()
            WHERE subscription_id = $1
            "#,
        )
        .bind(subscription_id.as_str())
        .bind(status.as_str())
        .execute(self.conn()?)
        .await
        .map_err(|e| map_db_error("Failed to update subscription status", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::SubscriptionNotFound,
                format!("No entitlement holds subscription {}", subscription_id),
            )
            .with_detail("subscription_id", subscription_id.as_str()));
        }

        Ok(())
    }

    async fn commit(&mut self) -> Result<(), DomainError> {
        let tx = self.tx.take().ok_or_else(|| {
            DomainError::new(ErrorCode::DatabaseError, "Transaction already committed")
        })?;
        tx.commit()
            .await
            .map_err(|e| map_db_error("Failed to commit transaction", e))?;
        self.locked.clear();
        Ok(())
    }
}
