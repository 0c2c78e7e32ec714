use crate::domain::{Role, RoleAssignments, UserLocationRole};
use crate::shared::{AppResult, LocationId, UserId};
use async_trait::async_trait;
use sqlx::{PgPool, Row};
use time::OffsetDateTime;
use uuid::Uuid;

#[async_trait]
pub trait RoleRepositoryTrait: Send + Sync {
    async fn grant(&self, grant: &UserLocationRole) -> AppResult<()>;
    async fn revoke(&self, user_id: UserId, location_id: Option<LocationId>) -> AppResult<()>;
    async fn assignments_for_user(&self, user_id: UserId) -> AppResult<RoleAssignments>;

    /// Users holding `minimum` or higher at `location_id`, either scoped
    /// directly to it or business-wide (`location_id IS NULL`) — the
    /// recipient list §4.9's alert dispatcher notifies.
    async fn users_with_role_at_least(&self, location_id: LocationId, minimum: Role) -> AppResult<Vec<UserId>>;
}

#[derive(Clone)]
pub struct RoleRepository {
    pool: PgPool,
}

impl RoleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_grant(row: sqlx::postgres::PgRow) -> AppResult<UserLocationRole> {
        let user_id: Uuid = row.get("user_id");
        let location_id: Option<Uuid> = row.get("location_id");
        let role: String = row.get("role");
        let granted_at: OffsetDateTime = row.get("granted_at");

        Ok(UserLocationRole {
            user_id: UserId::from_uuid(user_id),
            location_id: location_id.map(LocationId::from_uuid),
            role: Role::from_str(&role)?,
            granted_at,
        })
    }
}

#[async_trait]
impl RoleRepositoryTrait for RoleRepository {
    async fn grant(&self, grant: &UserLocationRole) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO user_location_roles (user_id, location_id, role, granted_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, location_id) DO UPDATE SET role = EXCLUDED.role, granted_at = EXCLUDED.granted_at
            "#
        )
        .bind(grant.user_id.as_uuid())
        .bind(grant.location_id.map(|id| *id.as_uuid()))
        .bind(grant.role.as_str())
        .bind(grant.granted_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn revoke(&self, user_id: UserId, location_id: Option<LocationId>) -> AppResult<()> {
        sqlx::query(
            "DELETE FROM user_location_roles WHERE user_id = $1 AND location_id IS NOT DISTINCT FROM $2"
        )
        .bind(user_id.as_uuid())
        .bind(location_id.map(|id| *id.as_uuid()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn assignments_for_user(&self, user_id: UserId) -> AppResult<RoleAssignments> {
        let rows = sqlx::query(
            "SELECT user_id, location_id, role, granted_at FROM user_location_roles WHERE user_id = $1"
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        let grants = rows
            .into_iter()
            .map(Self::row_to_grant)
            .collect::<AppResult<Vec<_>>>()?;

        Ok(RoleAssignments::new(grants))
    }

    async fn users_with_role_at_least(&self, location_id: LocationId, minimum: Role) -> AppResult<Vec<UserId>> {
        let rows = sqlx::query(
            "SELECT user_id, location_id, role, granted_at FROM user_location_roles
             WHERE location_id IS NULL OR location_id = $1",
        )
        .bind(location_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        let mut users: Vec<UserId> = rows
            .into_iter()
            .map(Self::row_to_grant)
            .collect::<AppResult<Vec<_>>>()?
            .into_iter()
            .filter(|grant| grant.role >= minimum)
            .map(|grant| grant.user_id)
            .collect();
        users.sort_by_key(|id| *id.as_uuid());
        users.dedup_by_key(|id| *id.as_uuid());
        Ok(users)
    }
}
