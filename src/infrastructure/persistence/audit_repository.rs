use crate::domain::audit::AuditLogEntry;
use crate::shared::{AppResult, AuditLogEntryId, BusinessId, UserId};
use async_trait::async_trait;
use sqlx::{PgPool, Row};
use uuid::Uuid;

/// §3 AuditLogEntry, §4.10 — append-only, same as the ledger itself.
#[async_trait]
pub trait AuditRepositoryTrait: Send + Sync {
    async fn append(&self, entry: &AuditLogEntry) -> AppResult<()>;
    async fn list_for_business(&self, business_id: BusinessId, limit: i64) -> AppResult<Vec<AuditLogEntry>>;
    async fn list_for_entity(&self, entity_type: &str, entity_id: &str) -> AppResult<Vec<AuditLogEntry>>;
}

#[derive(Clone)]
pub struct AuditRepository {
    pool: PgPool,
}

impl AuditRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_entry(row: sqlx::postgres::PgRow) -> AuditLogEntry {
        AuditLogEntry {
            id: AuditLogEntryId::from_uuid(row.get::<Uuid, _>("id")),
            business_id: BusinessId::from_uuid(row.get::<Uuid, _>("business_id")),
            actor_id: UserId::from_uuid(row.get::<Uuid, _>("actor_id")),
            action: row.get("action"),
            entity_type: row.get("entity_type"),
            entity_id: row.get("entity_id"),
            detail: row.get("detail"),
            created_at: row.get("created_at"),
        }
    }
}

#[async_trait]
impl AuditRepositoryTrait for AuditRepository {
    async fn append(&self, entry: &AuditLogEntry) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_log_entries
                (id, business_id, actor_id, action, entity_type, entity_id, detail, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(entry.id.as_uuid())
        .bind(entry.business_id.as_uuid())
        .bind(entry.actor_id.as_uuid())
        .bind(&entry.action)
        .bind(&entry.entity_type)
        .bind(&entry.entity_id)
        .bind(&entry.detail)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_for_business(&self, business_id: BusinessId, limit: i64) -> AppResult<Vec<AuditLogEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, business_id, actor_id, action, entity_type, entity_id, detail, created_at
            FROM audit_log_entries WHERE business_id = $1
            ORDER BY created_at DESC LIMIT $2
            "#,
        )
        .bind(business_id.as_uuid())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Self::row_to_entry).collect())
    }

    async fn list_for_entity(&self, entity_type: &str, entity_id: &str) -> AppResult<Vec<AuditLogEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, business_id, actor_id, action, entity_type, entity_id, detail, created_at
            FROM audit_log_entries WHERE entity_type = $1 AND entity_id = $2
            ORDER BY created_at DESC
            "#,
        )
        .bind(entity_type)
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Self::row_to_entry).collect())
    }
}
