use crate::domain::ledger::{ConfidenceLevel, ConsumptionEvent, EventType, SourceSystem};
use crate::domain::measurement::Uom;
use crate::domain::money::SignedQuantity;
use crate::shared::{
    AppResult, ConsumptionEventId, InventoryItemId, InventorySessionId, LocationId, RecipeId,
    SalesLineId,
};
use async_trait::async_trait;
use sqlx::{PgPool, Row};
use time::OffsetDateTime;
use uuid::Uuid;

/// §4.1 Ledger operations, plus the sales-dedupe write path §4.4 needs to
/// re-run idempotently. `void_seq` is not a domain field: it only exists to
/// let exactly one void-adjustment per sales line coexist with the
/// original depletion entry under the same dedupe key.
#[async_trait]
pub trait LedgerRepositoryTrait: Send + Sync {
    async fn append(&self, event: &ConsumptionEvent) -> AppResult<ConsumptionEventId>;

    /// Upserts keyed on `(sales_line_ref, inventory_item_id, void_seq)`; a
    /// conflicting insert returns the already-written row's id instead of
    /// duplicating (§4.4 idempotency).
    async fn append_deduped(
        &self,
        event: &ConsumptionEvent,
        void_seq: i32,
    ) -> AppResult<ConsumptionEventId>;

    async fn exists_for_sales_line(
        &self,
        sales_line_ref: SalesLineId,
        inventory_item_id: InventoryItemId,
        void_seq: i32,
    ) -> AppResult<bool>;

    async fn query(
        &self,
        item: InventoryItemId,
        from: OffsetDateTime,
        to: OffsetDateTime,
    ) -> AppResult<Vec<ConsumptionEvent>>;

    async fn sum_signed_delta(
        &self,
        item: InventoryItemId,
        from: OffsetDateTime,
        to: OffsetDateTime,
    ) -> AppResult<f64>;

    /// Timestamp of the most recent `inventory_count_adjustment` at or
    /// before `at` — every such entry already reconciles the running ledger
    /// sum to the physical count, so `sum_signed_delta` from the item's
    /// origin needs no separate baseline value (§4.6, §9 "a single
    /// summation").
    async fn last_count_ts(
        &self,
        item: InventoryItemId,
        at: OffsetDateTime,
    ) -> AppResult<Option<OffsetDateTime>>;

    /// Average signed daily depletion (negative deltas only) over the
    /// trailing window ending at `now` (§4.6 days-to-stockout, §4.7
    /// velocity).
    async fn avg_daily_depletion(
        &self,
        item: InventoryItemId,
        since: OffsetDateTime,
        now: OffsetDateTime,
    ) -> AppResult<f64>;

    /// True if any depletion-producing source (POS or tap) posted an entry
    /// for the item within the window — feeds confidence scoring.
    async fn has_depletion_source_in(
        &self,
        item: InventoryItemId,
        from: OffsetDateTime,
        to: OffsetDateTime,
    ) -> AppResult<bool>;
}

#[derive(Clone)]
pub struct LedgerRepository {
    pool: PgPool,
}

impl LedgerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_event(row: sqlx::postgres::PgRow) -> AppResult<ConsumptionEvent> {
        let id: Uuid = row.get("id");
        let location_id: Uuid = row.get("location_id");
        let event_ts: OffsetDateTime = row.get("event_ts");
        let created_ts: OffsetDateTime = row.get("created_ts");
        let event_type: String = row.get("event_type");
        let source_system: String = row.get("source_system");
        let inventory_item_id: Uuid = row.get("inventory_item_id");
        let quantity_delta: f64 = row.get("quantity_delta");
        let uom: String = row.get("uom");
        let confidence_level: String = row.get("confidence_level");
        let session_id: Option<Uuid> = row.get("session_id");
        let recipe_id: Option<Uuid> = row.get("recipe_id");
        let sales_line_ref: Option<Uuid> = row.get("sales_line_ref");
        let notes: Option<String> = row.get("notes");
        let variance_reason: Option<String> = row.get("variance_reason");

        Ok(ConsumptionEvent::from_parts(
            ConsumptionEventId::from_uuid(id),
            LocationId::from_uuid(location_id),
            event_ts,
            created_ts,
            EventType::from_str(&event_type)?,
            SourceSystem::from_str(&source_system)?,
            InventoryItemId::from_uuid(inventory_item_id),
            SignedQuantity::new(quantity_delta)?,
            Uom::from_str(&uom)?,
            confidence_level_from_str(&confidence_level),
            session_id.map(InventorySessionId::from_uuid),
            recipe_id.map(RecipeId::from_uuid),
            sales_line_ref.map(SalesLineId::from_uuid),
            notes,
            variance_reason,
        ))
    }
}

fn confidence_level_from_str(s: &str) -> ConfidenceLevel {
    match s {
        "measured" => ConfidenceLevel::Measured,
        "theoretical" => ConfidenceLevel::Theoretical,
        _ => ConfidenceLevel::Estimated,
    }
}

#[async_trait]
impl LedgerRepositoryTrait for LedgerRepository {
    async fn append(&self, event: &ConsumptionEvent) -> AppResult<ConsumptionEventId> {
        sqlx::query(
            r#"
            INSERT INTO consumption_events
                (id, location_id, event_ts, created_ts, event_type, source_system,
                 inventory_item_id, quantity_delta, uom, confidence_level,
                 session_id, recipe_id, sales_line_ref, notes, variance_reason, void_seq)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, 0)
            "#,
        )
        .bind(event.id.as_uuid())
        .bind(event.location_id.as_uuid())
        .bind(event.event_ts)
        .bind(event.created_ts)
        .bind(event.event_type.as_str())
        .bind(event.source_system.as_str())
        .bind(event.inventory_item_id.as_uuid())
        .bind(event.quantity_delta.value())
        .bind(event.uom.as_str())
        .bind(event.confidence_level.as_str())
        .bind(event.session_id.map(|id| *id.as_uuid()))
        .bind(event.recipe_id.map(|id| *id.as_uuid()))
        .bind(event.sales_line_ref.map(|id| *id.as_uuid()))
        .bind(&event.notes)
        .bind(&event.variance_reason)
        .execute(&self.pool)
        .await?;

        Ok(event.id)
    }

    async fn append_deduped(
        &self,
        event: &ConsumptionEvent,
        void_seq: i32,
    ) -> AppResult<ConsumptionEventId> {
        let row = sqlx::query(
            r#"
            INSERT INTO consumption_events
                (id, location_id, event_ts, created_ts, event_type, source_system,
                 inventory_item_id, quantity_delta, uom, confidence_level,
                 session_id, recipe_id, sales_line_ref, notes, variance_reason, void_seq)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            ON CONFLICT (sales_line_ref, inventory_item_id, void_seq)
            DO UPDATE SET sales_line_ref = EXCLUDED.sales_line_ref
            RETURNING id
            "#,
        )
        .bind(event.id.as_uuid())
        .bind(event.location_id.as_uuid())
        .bind(event.event_ts)
        .bind(event.created_ts)
        .bind(event.event_type.as_str())
        .bind(event.source_system.as_str())
        .bind(event.inventory_item_id.as_uuid())
        .bind(event.quantity_delta.value())
        .bind(event.uom.as_str())
        .bind(event.confidence_level.as_str())
        .bind(event.session_id.map(|id| *id.as_uuid()))
        .bind(event.recipe_id.map(|id| *id.as_uuid()))
        .bind(event.sales_line_ref.map(|id| *id.as_uuid()))
        .bind(&event.notes)
        .bind(&event.variance_reason)
        .bind(void_seq)
        .fetch_one(&self.pool)
        .await?;

        let id: Uuid = row.get("id");
        Ok(ConsumptionEventId::from_uuid(id))
    }

    async fn exists_for_sales_line(
        &self,
        sales_line_ref: SalesLineId,
        inventory_item_id: InventoryItemId,
        void_seq: i32,
    ) -> AppResult<bool> {
        let row = sqlx::query(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM consumption_events
                WHERE sales_line_ref = $1 AND inventory_item_id = $2 AND void_seq = $3
            ) as exists
            "#,
        )
        .bind(sales_line_ref.as_uuid())
        .bind(inventory_item_id.as_uuid())
        .bind(void_seq)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get("exists"))
    }

    async fn query(
        &self,
        item: InventoryItemId,
        from: OffsetDateTime,
        to: OffsetDateTime,
    ) -> AppResult<Vec<ConsumptionEvent>> {
        let rows = sqlx::query(
            r#"
            SELECT id, location_id, event_ts, created_ts, event_type, source_system,
                   inventory_item_id, quantity_delta, uom, confidence_level,
                   session_id, recipe_id, sales_line_ref, notes, variance_reason
            FROM consumption_events
            WHERE inventory_item_id = $1 AND event_ts > $2 AND event_ts <= $3
            ORDER BY event_ts, created_ts, id
            "#,
        )
        .bind(item.as_uuid())
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_event).collect()
    }

    async fn sum_signed_delta(
        &self,
        item: InventoryItemId,
        from: OffsetDateTime,
        to: OffsetDateTime,
    ) -> AppResult<f64> {
        let row = sqlx::query(
            r#"
            SELECT COALESCE(SUM(quantity_delta), 0.0) as total
            FROM consumption_events
            WHERE inventory_item_id = $1 AND event_ts > $2 AND event_ts <= $3
            "#,
        )
        .bind(item.as_uuid())
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get("total"))
    }

    async fn last_count_ts(
        &self,
        item: InventoryItemId,
        at: OffsetDateTime,
    ) -> AppResult<Option<OffsetDateTime>> {
        let row = sqlx::query(
            r#"
            SELECT event_ts
            FROM consumption_events
            WHERE inventory_item_id = $1
              AND event_type = 'inventory_count_adjustment'
              AND event_ts <= $2
            ORDER BY event_ts DESC, created_ts DESC
            LIMIT 1
            "#,
        )
        .bind(item.as_uuid())
        .bind(at)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.get("event_ts")))
    }

    async fn avg_daily_depletion(
        &self,
        item: InventoryItemId,
        since: OffsetDateTime,
        now: OffsetDateTime,
    ) -> AppResult<f64> {
        let row = sqlx::query(
            r#"
            SELECT COALESCE(SUM(quantity_delta), 0.0) as total
            FROM consumption_events
            WHERE inventory_item_id = $1 AND event_ts > $2 AND event_ts <= $3 AND quantity_delta < 0
            "#,
        )
        .bind(item.as_uuid())
        .bind(since)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        let total: f64 = row.get("total");
        let days = ((now - since).as_seconds_f64() / 86_400.0).max(1.0);
        Ok(total.abs() / days)
    }

    async fn has_depletion_source_in(
        &self,
        item: InventoryItemId,
        from: OffsetDateTime,
        to: OffsetDateTime,
    ) -> AppResult<bool> {
        let row = sqlx::query(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM consumption_events
                WHERE inventory_item_id = $1 AND event_ts > $2 AND event_ts <= $3
                  AND event_type IN ('pos_sale', 'tap_flow', 'receiving')
            ) as exists
            "#,
        )
        .bind(item.as_uuid())
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get("exists"))
    }
}
