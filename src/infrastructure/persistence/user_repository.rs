use crate::domain::{DisplayName, Email, User};
use crate::shared::{AppResult, BusinessId, UserId};
use async_trait::async_trait;
use sqlx::{PgPool, Row};
use time::OffsetDateTime;
use uuid::Uuid;

#[async_trait]
pub trait UserRepositoryTrait: Send + Sync {
    async fn create(&self, user: &User) -> AppResult<()>;
    async fn find_by_id(&self, id: UserId) -> AppResult<Option<User>>;
    async fn find_by_email(&self, email: &Email) -> AppResult<Option<User>>;
    async fn exists_by_email(&self, email: &Email) -> AppResult<bool>;
    async fn update_login_stats(&self, user_id: UserId) -> AppResult<()>;
    async fn update_avatar_url(&self, user_id: UserId, avatar_url: &str) -> AppResult<()>;
}

#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_user(row: sqlx::postgres::PgRow) -> Option<User> {
        let id: Uuid = row.get("id");
        let business_id: Uuid = row.get("business_id");
        let email: String = row.get("email");
        let password_hash: String = row.get("password_hash");
        let display_name: Option<String> = row.get("display_name");
        let avatar_url: Option<String> = row.get("avatar_url");
        let created_at: OffsetDateTime = row.get("created_at");

        Some(User::from_parts(
            UserId::from_uuid(id),
            BusinessId::from_uuid(business_id),
            Email::new(email).ok()?,
            password_hash,
            display_name.and_then(|n| DisplayName::new(n).ok()),
            avatar_url,
            created_at,
        ))
    }
}

#[async_trait]
impl UserRepositoryTrait for UserRepository {
    async fn create(&self, user: &User) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, business_id, email, password_hash, display_name, avatar_url, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#
        )
        .bind(user.id.as_uuid())
        .bind(user.business_id.as_uuid())
        .bind(user.email.as_str())
        .bind(&user.password_hash)
        .bind(user.display_name.as_ref().map(|n| n.as_str()))
        .bind(&user.avatar_url)
        .bind(user.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: UserId) -> AppResult<Option<User>> {
        let result = sqlx::query(
            r#"
            SELECT id, business_id, email, password_hash, display_name, avatar_url, created_at
            FROM users
            WHERE id = $1
            "#
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(result.and_then(Self::row_to_user))
    }

    async fn find_by_email(&self, email: &Email) -> AppResult<Option<User>> {
        let result = sqlx::query(
            r#"
            SELECT id, business_id, email, password_hash, display_name, avatar_url, created_at
            FROM users
            WHERE email = $1
            "#
        )
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(result.and_then(Self::row_to_user))
    }

    async fn exists_by_email(&self, email: &Email) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            SELECT EXISTS(SELECT 1 FROM users WHERE email = $1) as exists
            "#
        )
        .bind(email.as_str())
        .fetch_one(&self.pool)
        .await?;

        let exists: bool = result.get("exists");
        Ok(exists)
    }

    async fn update_login_stats(&self, user_id: UserId) -> AppResult<()> {
        sqlx::query(
            "UPDATE users SET login_count = login_count + 1, last_login_at = NOW() WHERE id = $1"
        )
        .bind(user_id.as_uuid())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_avatar_url(&self, user_id: UserId, avatar_url: &str) -> AppResult<()> {
        sqlx::query("UPDATE users SET avatar_url = $1 WHERE id = $2")
            .bind(avatar_url)
            .bind(user_id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
