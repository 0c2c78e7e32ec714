use crate::domain::settings::{AutoLockPolicy, BusinessSettings, DepletionPrecedence};
use crate::shared::{AppResult, BusinessId};
use async_trait::async_trait;
use sqlx::{PgPool, Row};
use uuid::Uuid;

/// §3 Ownership (settings are business-scoped), §4.13 config document.
#[async_trait]
pub trait SettingsRepositoryTrait: Send + Sync {
    async fn upsert(&self, settings: &BusinessSettings) -> AppResult<()>;
    async fn find(&self, business_id: BusinessId) -> AppResult<Option<BusinessSettings>>;
}

#[derive(Clone)]
pub struct SettingsRepository {
    pool: PgPool,
}

impl SettingsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_settings(row: sqlx::postgres::PgRow) -> AppResult<BusinessSettings> {
        let depletion_precedence: String = row.get("depletion_precedence");
        let auto_lock_hours: Option<f64> = row.get("session_auto_lock_hours");

        Ok(BusinessSettings {
            business_id: BusinessId::from_uuid(row.get::<Uuid, _>("business_id")),
            default_variance_threshold_pct: row.get("default_variance_threshold_pct"),
            depletion_precedence: match depletion_precedence.as_str() {
                "prefer_pos" => DepletionPrecedence::PreferPos,
                _ => DepletionPrecedence::PreferTapMeter,
            },
            session_auto_lock: match auto_lock_hours {
                Some(hours) => AutoLockPolicy::AfterHours(hours),
                None => AutoLockPolicy::Disabled,
            },
        })
    }
}

#[async_trait]
impl SettingsRepositoryTrait for SettingsRepository {
    async fn upsert(&self, settings: &BusinessSettings) -> AppResult<()> {
        let auto_lock_hours = match settings.session_auto_lock {
            AutoLockPolicy::Disabled => None,
            AutoLockPolicy::AfterHours(hours) => Some(hours),
        };
        let precedence_str = match settings.depletion_precedence {
            DepletionPrecedence::PreferTapMeter => "prefer_tap_meter",
            DepletionPrecedence::PreferPos => "prefer_pos",
        };

        sqlx::query(
            r#"
            INSERT INTO business_settings
                (business_id, default_variance_threshold_pct, depletion_precedence, session_auto_lock_hours)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (business_id) DO UPDATE SET
                default_variance_threshold_pct = EXCLUDED.default_variance_threshold_pct,
                depletion_precedence = EXCLUDED.depletion_precedence,
                session_auto_lock_hours = EXCLUDED.session_auto_lock_hours
            "#,
        )
        .bind(settings.business_id.as_uuid())
        .bind(settings.default_variance_threshold_pct)
        .bind(precedence_str)
        .bind(auto_lock_hours)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find(&self, business_id: BusinessId) -> AppResult<Option<BusinessSettings>> {
        let row = sqlx::query(
            r#"
            SELECT business_id, default_variance_threshold_pct, depletion_precedence, session_auto_lock_hours
            FROM business_settings WHERE business_id = $1
            "#,
        )
        .bind(business_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        row.map(Self::row_to_settings).transpose()
    }
}
