use crate::domain::{Business, BusinessName};
use crate::shared::{AppResult, BusinessId};
use async_trait::async_trait;
use sqlx::{PgPool, Row};
use time::OffsetDateTime;
use uuid::Uuid;

#[async_trait]
pub trait BusinessRepositoryTrait: Send + Sync {
    async fn create(&self, business: &Business) -> AppResult<()>;
    async fn find_by_id(&self, id: BusinessId) -> AppResult<Option<Business>>;
}

#[derive(Clone)]
pub struct BusinessRepository {
    pool: PgPool,
}

impl BusinessRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BusinessRepositoryTrait for BusinessRepository {
    async fn create(&self, business: &Business) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO businesses (id, name, created_at)
            VALUES ($1, $2, $3)
            "#
        )
        .bind(business.id.as_uuid())
        .bind(business.name.as_str())
        .bind(business.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: BusinessId) -> AppResult<Option<Business>> {
        let result = sqlx::query(
            r#"
            SELECT id, name, created_at
            FROM businesses
            WHERE id = $1
            "#
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(result.map(|row| {
            let id: Uuid = row.get("id");
            let name: String = row.get("name");
            let created_at: OffsetDateTime = row.get("created_at");

            Business::from_parts(
                BusinessId::from_uuid(id),
                BusinessName::new(name).unwrap(),
                created_at,
            )
        }))
    }
}
