use crate::domain::notification::{AlertRule, AlertRuleType, Notification};
use crate::shared::{AppResult, BusinessId, InventoryItemId, LocationId, NotificationId, UserId};
use async_trait::async_trait;
use sqlx::{PgPool, Row};
use uuid::Uuid;

/// §3 AlertRule / Notification, §4.9 Alert/Notification Dispatcher.
#[async_trait]
pub trait NotificationRepositoryTrait: Send + Sync {
    async fn upsert_rule(&self, rule: &AlertRule) -> AppResult<()>;
    async fn list_rules_for_business(&self, business_id: BusinessId) -> AppResult<Vec<AlertRule>>;

    async fn create_notification(&self, notification: &Notification) -> AppResult<()>;

    /// True if an unread notification already exists for this
    /// `(location, recipient, rule_type, item)` combination — the
    /// dispatcher's de-duplication check so a rule that stays true across
    /// repeated sweeps doesn't spam the same recipient (§4.9).
    async fn has_unread_for(
        &self,
        location_id: LocationId,
        recipient_id: UserId,
        rule_type: AlertRuleType,
        inventory_item_id: Option<InventoryItemId>,
    ) -> AppResult<bool>;

    async fn list_for_recipient(&self, recipient_id: UserId, unread_only: bool) -> AppResult<Vec<Notification>>;
    async fn mark_read(&self, id: NotificationId) -> AppResult<()>;
}

#[derive(Clone)]
pub struct NotificationRepository {
    pool: PgPool,
}

impl NotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_rule(row: sqlx::postgres::PgRow) -> AppResult<AlertRule> {
        let rule_type: String = row.get("rule_type");
        Ok(AlertRule {
            business_id: BusinessId::from_uuid(row.get::<Uuid, _>("business_id")),
            location_id: row.get::<Option<Uuid>, _>("location_id").map(LocationId::from_uuid),
            rule_type: AlertRuleType::from_str(&rule_type)?,
            threshold_pct: row.get("threshold_pct"),
            enabled: row.get("enabled"),
        })
    }

    fn row_to_notification(row: sqlx::postgres::PgRow) -> AppResult<Notification> {
        let rule_type: String = row.get("rule_type");
        Ok(Notification {
            id: NotificationId::from_uuid(row.get::<Uuid, _>("id")),
            location_id: LocationId::from_uuid(row.get::<Uuid, _>("location_id")),
            recipient_id: UserId::from_uuid(row.get::<Uuid, _>("recipient_id")),
            rule_type: AlertRuleType::from_str(&rule_type)?,
            inventory_item_id: row
                .get::<Option<Uuid>, _>("inventory_item_id")
                .map(InventoryItemId::from_uuid),
            message: row.get("message"),
            created_at: row.get("created_at"),
            read_at: row.get("read_at"),
        })
    }
}

#[async_trait]
impl NotificationRepositoryTrait for NotificationRepository {
    async fn upsert_rule(&self, rule: &AlertRule) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO alert_rules (business_id, location_id, rule_type, threshold_pct, enabled)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (business_id, location_id, rule_type) DO UPDATE SET
                threshold_pct = EXCLUDED.threshold_pct,
                enabled = EXCLUDED.enabled
            "#,
        )
        .bind(rule.business_id.as_uuid())
        .bind(rule.location_id.map(|id| *id.as_uuid()))
        .bind(rule.rule_type.as_str())
        .bind(rule.threshold_pct)
        .bind(rule.enabled)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_rules_for_business(&self, business_id: BusinessId) -> AppResult<Vec<AlertRule>> {
        let rows = sqlx::query(
            r#"
            SELECT business_id, location_id, rule_type, threshold_pct, enabled
            FROM alert_rules WHERE business_id = $1 AND enabled = true
            "#,
        )
        .bind(business_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Self::row_to_rule).collect()
    }

    async fn create_notification(&self, notification: &Notification) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO notifications
                (id, location_id, recipient_id, rule_type, inventory_item_id, message, created_at, read_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(notification.id.as_uuid())
        .bind(notification.location_id.as_uuid())
        .bind(notification.recipient_id.as_uuid())
        .bind(notification.rule_type.as_str())
        .bind(notification.inventory_item_id.map(|id| *id.as_uuid()))
        .bind(&notification.message)
        .bind(notification.created_at)
        .bind(notification.read_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn has_unread_for(
        &self,
        location_id: LocationId,
        recipient_id: UserId,
        rule_type: AlertRuleType,
        inventory_item_id: Option<InventoryItemId>,
    ) -> AppResult<bool> {
        let row = sqlx::query(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM notifications
                WHERE location_id = $1 AND recipient_id = $2 AND rule_type = $3
                    AND inventory_item_id IS NOT DISTINCT FROM $4 AND read_at IS NULL
            ) AS "exists"
            "#,
        )
        .bind(location_id.as_uuid())
        .bind(recipient_id.as_uuid())
        .bind(rule_type.as_str())
        .bind(inventory_item_id.map(|id| *id.as_uuid()))
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get("exists"))
    }

    async fn list_for_recipient(&self, recipient_id: UserId, unread_only: bool) -> AppResult<Vec<Notification>> {
        let rows = sqlx::query(
            r#"
            SELECT id, location_id, recipient_id, rule_type, inventory_item_id, message, created_at, read_at
            FROM notifications
            WHERE recipient_id = $1 AND ($2 = false OR read_at IS NULL)
            ORDER BY created_at DESC
            "#,
        )
        .bind(recipient_id.as_uuid())
        .bind(unread_only)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Self::row_to_notification).collect()
    }

    async fn mark_read(&self, id: NotificationId) -> AppResult<()> {
        sqlx::query("UPDATE notifications SET read_at = now() WHERE id = $1 AND read_at IS NULL")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
