use crate::domain::{
    BottleTemplate, Category, CountingMethod, InventoryItem, Money, PriceHistory, Uom, Vendor,
};
use crate::shared::{
    AppResult, BottleTemplateId, BusinessId, CategoryId, InventoryItemId, LocationId,
    PriceHistoryId, VendorId,
};
use async_trait::async_trait;
use sqlx::{PgPool, Row};
use time::OffsetDateTime;
use uuid::Uuid;

#[async_trait]
pub trait CatalogRepositoryTrait: Send + Sync {
    async fn create_category(&self, category: &Category) -> AppResult<()>;
    async fn list_categories(&self, business_id: BusinessId) -> AppResult<Vec<Category>>;
    async fn find_category(&self, id: CategoryId) -> AppResult<Option<Category>>;

    async fn create_vendor(&self, vendor: &Vendor) -> AppResult<()>;
    async fn list_vendors(&self, business_id: BusinessId) -> AppResult<Vec<Vendor>>;

    async fn create_item(&self, item: &InventoryItem) -> AppResult<()>;
    async fn find_item(&self, id: InventoryItemId) -> AppResult<Option<InventoryItem>>;
    async fn find_item_by_barcode(
        &self,
        location_id: LocationId,
        barcode: &str,
    ) -> AppResult<Option<InventoryItem>>;
    async fn list_items_for_location(&self, location_id: LocationId) -> AppResult<Vec<InventoryItem>>;
    async fn deactivate_item(&self, id: InventoryItemId) -> AppResult<()>;

    async fn create_bottle_template(&self, template: &BottleTemplate) -> AppResult<()>;
    async fn find_bottle_template_for_item(
        &self,
        item_id: InventoryItemId,
    ) -> AppResult<Option<BottleTemplate>>;

    async fn insert_price(&self, price: &PriceHistory) -> AppResult<()>;
    async fn close_open_price(&self, item_id: InventoryItemId, closed_at: OffsetDateTime) -> AppResult<()>;
    async fn current_price(&self, item_id: InventoryItemId) -> AppResult<Option<PriceHistory>>;
}

#[derive(Clone)]
pub struct CatalogRepository {
    pool: PgPool,
}

impl CatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_category(row: sqlx::postgres::PgRow) -> AppResult<Category> {
        let id: Uuid = row.get("id");
        let business_id: Uuid = row.get("business_id");
        let name: String = row.get("name");
        let counting_method: String = row.get("counting_method");
        let default_density_g_per_ml: Option<f64> = row.get("default_density_g_per_ml");

        Ok(Category {
            id: CategoryId::from_uuid(id),
            business_id: BusinessId::from_uuid(business_id),
            name,
            counting_method: CountingMethod::from_str(&counting_method)?,
            default_density_g_per_ml,
        })
    }

    fn row_to_item(row: sqlx::postgres::PgRow) -> AppResult<InventoryItem> {
        let id: Uuid = row.get("id");
        let location_id: Uuid = row.get("location_id");
        let name: String = row.get("name");
        let barcode: Option<String> = row.get("barcode");
        let category_id: Uuid = row.get("category_id");
        let base_uom: String = row.get("base_uom");
        let container_size_ml: Option<f64> = row.get("container_size_ml");
        let pack_size: Option<i32> = row.get("pack_size");
        let vendor_id: Option<Uuid> = row.get("vendor_id");
        let active: bool = row.get("active");
        let created_at: OffsetDateTime = row.get("created_at");

        Ok(InventoryItem {
            id: InventoryItemId::from_uuid(id),
            location_id: LocationId::from_uuid(location_id),
            name,
            barcode,
            category_id: CategoryId::from_uuid(category_id),
            base_uom: Uom::from_str(&base_uom)?,
            container_size_ml,
            pack_size,
            vendor_id: vendor_id.map(VendorId::from_uuid),
            active,
            created_at,
        })
    }

    fn row_to_template(row: sqlx::postgres::PgRow) -> BottleTemplate {
        let id: Uuid = row.get("id");
        let inventory_item_id: Uuid = row.get("inventory_item_id");
        BottleTemplate {
            id: BottleTemplateId::from_uuid(id),
            inventory_item_id: InventoryItemId::from_uuid(inventory_item_id),
            container_size_ml: row.get("container_size_ml"),
            empty_weight_g: row.get("empty_weight_g"),
            full_weight_g: row.get("full_weight_g"),
            measured_density_g_per_ml: row.get("measured_density_g_per_ml"),
        }
    }

    fn row_to_price(row: sqlx::postgres::PgRow) -> AppResult<PriceHistory> {
        let id: Uuid = row.get("id");
        let inventory_item_id: Uuid = row.get("inventory_item_id");
        let unit_cost_cents: i64 = row.get("unit_cost_cents");
        Ok(PriceHistory {
            id: PriceHistoryId::from_uuid(id),
            inventory_item_id: InventoryItemId::from_uuid(inventory_item_id),
            unit_cost: Money::from_cents(unit_cost_cents)?,
            effective_from: row.get("effective_from"),
            effective_to: row.get("effective_to"),
            currency: row.get("currency"),
        })
    }
}

#[async_trait]
impl CatalogRepositoryTrait for CatalogRepository {
    async fn create_category(&self, category: &Category) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO categories (id, business_id, name, counting_method, default_density_g_per_ml)
            VALUES ($1, $2, $3, $4, $5)
            "#
        )
        .bind(category.id.as_uuid())
        .bind(category.business_id.as_uuid())
        .bind(&category.name)
        .bind(category.counting_method.as_str())
        .bind(category.default_density_g_per_ml)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_categories(&self, business_id: BusinessId) -> AppResult<Vec<Category>> {
        let rows = sqlx::query(
            "SELECT id, business_id, name, counting_method, default_density_g_per_ml FROM categories WHERE business_id = $1 ORDER BY name"
        )
        .bind(business_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_category).collect()
    }

    async fn find_category(&self, id: CategoryId) -> AppResult<Option<Category>> {
        let row = sqlx::query(
            "SELECT id, business_id, name, counting_method, default_density_g_per_ml FROM categories WHERE id = $1"
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_category).transpose()
    }

    async fn create_vendor(&self, vendor: &Vendor) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO vendors (id, business_id, name, contact_email, contact_phone, notes)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#
        )
        .bind(vendor.id.as_uuid())
        .bind(vendor.business_id.as_uuid())
        .bind(&vendor.name)
        .bind(&vendor.contact_email)
        .bind(&vendor.contact_phone)
        .bind(&vendor.notes)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_vendors(&self, business_id: BusinessId) -> AppResult<Vec<Vendor>> {
        let rows = sqlx::query(
            "SELECT id, business_id, name, contact_email, contact_phone, notes FROM vendors WHERE business_id = $1 ORDER BY name"
        )
        .bind(business_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let id: Uuid = row.get("id");
                let business_id: Uuid = row.get("business_id");
                Vendor {
                    id: VendorId::from_uuid(id),
                    business_id: BusinessId::from_uuid(business_id),
                    name: row.get("name"),
                    contact_email: row.get("contact_email"),
                    contact_phone: row.get("contact_phone"),
                    notes: row.get("notes"),
                }
            })
            .collect())
    }

    async fn create_item(&self, item: &InventoryItem) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO inventory_items
                (id, location_id, name, barcode, category_id, base_uom, container_size_ml, pack_size, vendor_id, active, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#
        )
        .bind(item.id.as_uuid())
        .bind(item.location_id.as_uuid())
        .bind(&item.name)
        .bind(&item.barcode)
        .bind(item.category_id.as_uuid())
        .bind(item.base_uom.as_str())
        .bind(item.container_size_ml)
        .bind(item.pack_size)
        .bind(item.vendor_id.map(|id| *id.as_uuid()))
        .bind(item.active)
        .bind(item.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_item(&self, id: InventoryItemId) -> AppResult<Option<InventoryItem>> {
        let row = sqlx::query(
            r#"
            SELECT id, location_id, name, barcode, category_id, base_uom, container_size_ml, pack_size, vendor_id, active, created_at
            FROM inventory_items WHERE id = $1
            "#
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_item).transpose()
    }

    async fn find_item_by_barcode(
        &self,
        location_id: LocationId,
        barcode: &str,
    ) -> AppResult<Option<InventoryItem>> {
        let row = sqlx::query(
            r#"
            SELECT id, location_id, name, barcode, category_id, base_uom, container_size_ml, pack_size, vendor_id, active, created_at
            FROM inventory_items WHERE location_id = $1 AND barcode = $2
            "#
        )
        .bind(location_id.as_uuid())
        .bind(barcode)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_item).transpose()
    }

    async fn list_items_for_location(&self, location_id: LocationId) -> AppResult<Vec<InventoryItem>> {
        let rows = sqlx::query(
            r#"
            SELECT id, location_id, name, barcode, category_id, base_uom, container_size_ml, pack_size, vendor_id, active, created_at
            FROM inventory_items WHERE location_id = $1 ORDER BY name
            "#
        )
        .bind(location_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_item).collect()
    }

    async fn deactivate_item(&self, id: InventoryItemId) -> AppResult<()> {
        sqlx::query("UPDATE inventory_items SET active = false WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn create_bottle_template(&self, template: &BottleTemplate) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO bottle_templates
                (id, inventory_item_id, container_size_ml, empty_weight_g, full_weight_g, measured_density_g_per_ml)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (inventory_item_id) DO UPDATE SET
                container_size_ml = EXCLUDED.container_size_ml,
                empty_weight_g = EXCLUDED.empty_weight_g,
                full_weight_g = EXCLUDED.full_weight_g,
                measured_density_g_per_ml = EXCLUDED.measured_density_g_per_ml
            "#
        )
        .bind(template.id.as_uuid())
        .bind(template.inventory_item_id.as_uuid())
        .bind(template.container_size_ml)
        .bind(template.empty_weight_g)
        .bind(template.full_weight_g)
        .bind(template.measured_density_g_per_ml)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_bottle_template_for_item(
        &self,
        item_id: InventoryItemId,
    ) -> AppResult<Option<BottleTemplate>> {
        let row = sqlx::query(
            r#"
            SELECT id, inventory_item_id, container_size_ml, empty_weight_g, full_weight_g, measured_density_g_per_ml
            FROM bottle_templates WHERE inventory_item_id = $1
            "#
        )
        .bind(item_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Self::row_to_template))
    }

    async fn insert_price(&self, price: &PriceHistory) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO price_history (id, inventory_item_id, unit_cost_cents, effective_from, effective_to, currency)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#
        )
        .bind(price.id.as_uuid())
        .bind(price.inventory_item_id.as_uuid())
        .bind(price.unit_cost.as_cents())
        .bind(price.effective_from)
        .bind(price.effective_to)
        .bind(&price.currency)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn close_open_price(&self, item_id: InventoryItemId, closed_at: OffsetDateTime) -> AppResult<()> {
        sqlx::query(
            "UPDATE price_history SET effective_to = $1 WHERE inventory_item_id = $2 AND effective_to IS NULL"
        )
        .bind(closed_at)
        .bind(item_id.as_uuid())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn current_price(&self, item_id: InventoryItemId) -> AppResult<Option<PriceHistory>> {
        let row = sqlx::query(
            r#"
            SELECT id, inventory_item_id, unit_cost_cents, effective_from, effective_to, currency
            FROM price_history WHERE inventory_item_id = $1 AND effective_to IS NULL
            "#
        )
        .bind(item_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_price).transpose()
    }
}
