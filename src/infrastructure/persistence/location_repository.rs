use crate::domain::Location;
use crate::shared::{AppResult, BusinessId, LocationId};
use async_trait::async_trait;
use sqlx::{PgPool, Row};
use time::OffsetDateTime;
use uuid::Uuid;

#[async_trait]
pub trait LocationRepositoryTrait: Send + Sync {
    async fn create(&self, location: &Location) -> AppResult<()>;
    async fn find_by_id(&self, id: LocationId) -> AppResult<Option<Location>>;
    async fn list_for_business(&self, business_id: BusinessId) -> AppResult<Vec<Location>>;
}

#[derive(Clone)]
pub struct LocationRepository {
    pool: PgPool,
}

impl LocationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_location(row: sqlx::postgres::PgRow) -> Location {
        let id: Uuid = row.get("id");
        let business_id: Uuid = row.get("business_id");
        let name: String = row.get("name");
        let timezone: String = row.get("timezone");
        let created_at: OffsetDateTime = row.get("created_at");

        Location::from_parts(
            LocationId::from_uuid(id),
            BusinessId::from_uuid(business_id),
            name,
            timezone,
            created_at,
        )
    }
}

#[async_trait]
impl LocationRepositoryTrait for LocationRepository {
    async fn create(&self, location: &Location) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO locations (id, business_id, name, timezone, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#
        )
        .bind(location.id.as_uuid())
        .bind(location.business_id.as_uuid())
        .bind(&location.name)
        .bind(&location.timezone)
        .bind(location.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: LocationId) -> AppResult<Option<Location>> {
        let result = sqlx::query(
            "SELECT id, business_id, name, timezone, created_at FROM locations WHERE id = $1"
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(result.map(Self::row_to_location))
    }

    async fn list_for_business(&self, business_id: BusinessId) -> AppResult<Vec<Location>> {
        let rows = sqlx::query(
            "SELECT id, business_id, name, timezone, created_at FROM locations WHERE business_id = $1 ORDER BY name"
        )
        .bind(business_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Self::row_to_location).collect())
    }
}
