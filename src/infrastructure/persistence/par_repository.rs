use crate::domain::measurement::Uom;
use crate::domain::money::Money;
use crate::domain::par::{ParLevel, ParUom, PoLine, PoStatus, PurchaseOrder};
use crate::shared::{
    AppResult, InventoryItemId, LocationId, ParLevelId, PoLineId, PurchaseOrderId, VendorId,
};
use async_trait::async_trait;
use sqlx::{PgPool, Row};
use time::OffsetDateTime;
use uuid::Uuid;

/// §3 ParLevel / PurchaseOrder / POLine, §4.7 reorder bundles.
#[async_trait]
pub trait ParRepositoryTrait: Send + Sync {
    async fn create_par_level(&self, par: &ParLevel) -> AppResult<()>;
    async fn find_par_level(&self, id: ParLevelId) -> AppResult<Option<ParLevel>>;
    async fn list_par_levels_for_location(&self, location_id: LocationId) -> AppResult<Vec<ParLevel>>;

    async fn create_purchase_order(&self, po: &PurchaseOrder) -> AppResult<()>;
    async fn find_purchase_order(&self, id: PurchaseOrderId) -> AppResult<Option<PurchaseOrder>>;
    async fn list_purchase_orders_for_location(
        &self,
        location_id: LocationId,
    ) -> AppResult<Vec<PurchaseOrder>>;
    async fn update_purchase_order(&self, po: &PurchaseOrder) -> AppResult<()>;

    async fn create_po_line(&self, line: &PoLine) -> AppResult<()>;
    async fn list_po_lines(&self, purchase_order_id: PurchaseOrderId) -> AppResult<Vec<PoLine>>;
    async fn update_po_line(&self, line: &PoLine) -> AppResult<()>;
}

#[derive(Clone)]
pub struct ParRepository {
    pool: PgPool,
}

impl ParRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_par_level(row: sqlx::postgres::PgRow) -> AppResult<ParLevel> {
        let par_uom: String = row.get("par_uom");
        Ok(ParLevel {
            id: ParLevelId::from_uuid(row.get::<Uuid, _>("id")),
            location_id: LocationId::from_uuid(row.get::<Uuid, _>("location_id")),
            inventory_item_id: InventoryItemId::from_uuid(row.get::<Uuid, _>("inventory_item_id")),
            vendor_id: VendorId::from_uuid(row.get::<Uuid, _>("vendor_id")),
            par_level: row.get("par_level"),
            min_level: row.get("min_level"),
            reorder_qty_override: row.get("reorder_qty_override"),
            par_uom: ParUom::from_str(&par_uom)?,
            package_size: row.get("package_size"),
            lead_time_days: row.get("lead_time_days"),
            safety_stock_days: row.get("safety_stock_days"),
        })
    }

    fn row_to_purchase_order(row: sqlx::postgres::PgRow) -> AppResult<PurchaseOrder> {
        let status: String = row.get("status");
        Ok(PurchaseOrder {
            id: PurchaseOrderId::from_uuid(row.get::<Uuid, _>("id")),
            location_id: LocationId::from_uuid(row.get::<Uuid, _>("location_id")),
            vendor_id: VendorId::from_uuid(row.get::<Uuid, _>("vendor_id")),
            status: PoStatus::from_str(&status)?,
            created_at: row.get("created_at"),
            sent_at: row.get("sent_at"),
            closed_at: row.get("closed_at"),
        })
    }

    fn row_to_po_line(row: sqlx::postgres::PgRow) -> AppResult<PoLine> {
        let uom: String = row.get("uom");
        let unit_cost_cents: i64 = row.get("unit_cost_cents");
        Ok(PoLine {
            id: PoLineId::from_uuid(row.get::<Uuid, _>("id")),
            purchase_order_id: PurchaseOrderId::from_uuid(row.get::<Uuid, _>("purchase_order_id")),
            inventory_item_id: InventoryItemId::from_uuid(row.get::<Uuid, _>("inventory_item_id")),
            quantity_ordered: row.get("quantity_ordered"),
            quantity_received: row.get("quantity_received"),
            uom: Uom::from_str(&uom)?,
            unit_cost: Money::from_cents(unit_cost_cents)?,
        })
    }
}

#[async_trait]
impl ParRepositoryTrait for ParRepository {
    async fn create_par_level(&self, par: &ParLevel) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO par_levels
                (id, location_id, inventory_item_id, vendor_id, par_level, min_level,
                 reorder_qty_override, par_uom, package_size, lead_time_days, safety_stock_days)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(par.id.as_uuid())
        .bind(par.location_id.as_uuid())
        .bind(par.inventory_item_id.as_uuid())
        .bind(par.vendor_id.as_uuid())
        .bind(par.par_level)
        .bind(par.min_level)
        .bind(par.reorder_qty_override)
        .bind(par.par_uom.as_str())
        .bind(par.package_size)
        .bind(par.lead_time_days)
        .bind(par.safety_stock_days)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_par_level(&self, id: ParLevelId) -> AppResult<Option<ParLevel>> {
        let row = sqlx::query(
            r#"
            SELECT id, location_id, inventory_item_id, vendor_id, par_level, min_level,
                   reorder_qty_override, par_uom, package_size, lead_time_days, safety_stock_days
            FROM par_levels WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        row.map(Self::row_to_par_level).transpose()
    }

    async fn list_par_levels_for_location(&self, location_id: LocationId) -> AppResult<Vec<ParLevel>> {
        let rows = sqlx::query(
            r#"
            SELECT id, location_id, inventory_item_id, vendor_id, par_level, min_level,
                   reorder_qty_override, par_uom, package_size, lead_time_days, safety_stock_days
            FROM par_levels WHERE location_id = $1
            "#,
        )
        .bind(location_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Self::row_to_par_level).collect()
    }

    async fn create_purchase_order(&self, po: &PurchaseOrder) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO purchase_orders (id, location_id, vendor_id, status, created_at, sent_at, closed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(po.id.as_uuid())
        .bind(po.location_id.as_uuid())
        .bind(po.vendor_id.as_uuid())
        .bind(po.status.as_str())
        .bind(po.created_at)
        .bind(po.sent_at)
        .bind(po.closed_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_purchase_order(&self, id: PurchaseOrderId) -> AppResult<Option<PurchaseOrder>> {
        let row = sqlx::query(
            r#"
            SELECT id, location_id, vendor_id, status, created_at, sent_at, closed_at
            FROM purchase_orders WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        row.map(Self::row_to_purchase_order).transpose()
    }

    async fn list_purchase_orders_for_location(
        &self,
        location_id: LocationId,
    ) -> AppResult<Vec<PurchaseOrder>> {
        let rows = sqlx::query(
            r#"
            SELECT id, location_id, vendor_id, status, created_at, sent_at, closed_at
            FROM purchase_orders WHERE location_id = $1 ORDER BY created_at DESC
            "#,
        )
        .bind(location_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Self::row_to_purchase_order).collect()
    }

    async fn update_purchase_order(&self, po: &PurchaseOrder) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE purchase_orders SET status = $2, sent_at = $3, closed_at = $4
            WHERE id = $1
            "#,
        )
        .bind(po.id.as_uuid())
        .bind(po.status.as_str())
        .bind(po.sent_at)
        .bind(po.closed_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn create_po_line(&self, line: &PoLine) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO po_lines
                (id, purchase_order_id, inventory_item_id, quantity_ordered, quantity_received, uom, unit_cost_cents)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(line.id.as_uuid())
        .bind(line.purchase_order_id.as_uuid())
        .bind(line.inventory_item_id.as_uuid())
        .bind(line.quantity_ordered)
        .bind(line.quantity_received)
        .bind(line.uom.as_str())
        .bind(line.unit_cost.as_cents())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_po_lines(&self, purchase_order_id: PurchaseOrderId) -> AppResult<Vec<PoLine>> {
        let rows = sqlx::query(
            r#"
            SELECT id, purchase_order_id, inventory_item_id, quantity_ordered, quantity_received, uom, unit_cost_cents
            FROM po_lines WHERE purchase_order_id = $1
            "#,
        )
        .bind(purchase_order_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Self::row_to_po_line).collect()
    }

    async fn update_po_line(&self, line: &PoLine) -> AppResult<()> {
        sqlx::query("UPDATE po_lines SET quantity_received = $2 WHERE id = $1")
            .bind(line.id.as_uuid())
            .bind(line.quantity_received)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
