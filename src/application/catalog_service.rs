use crate::domain::catalog::{BottleTemplate, Category, CountingMethod, InventoryItem, PriceHistory, Vendor};
use crate::domain::measurement::Uom;
use crate::domain::money::Money;
use crate::infrastructure::{CatalogRepository, CatalogRepositoryTrait};
use crate::shared::{
    AppError, AppResult, BusinessId, CategoryId, InventoryItemId, LocationId, VendorId,
};
use time::OffsetDateTime;

/// Item, category, vendor, bottle-template, and price-history CRUD (§4.2
/// Catalog & Mapping's catalog half). Barcode lookup misses are not
/// errors: the caller decides whether to prompt for manual entry.
#[derive(Clone)]
pub struct CatalogService {
    catalog_repo: CatalogRepository,
}

impl CatalogService {
    pub fn new(catalog_repo: CatalogRepository) -> Self {
        Self { catalog_repo }
    }

    pub async fn create_category(
        &self,
        business_id: BusinessId,
        name: String,
        counting_method: CountingMethod,
        default_density_g_per_ml: Option<f64>,
    ) -> AppResult<Category> {
        let category = Category::new(business_id, name, counting_method, default_density_g_per_ml)?;
        self.catalog_repo.create_category(&category).await?;
        Ok(category)
    }

    pub async fn list_categories(&self, business_id: BusinessId) -> AppResult<Vec<Category>> {
        self.catalog_repo.list_categories(business_id).await
    }

    pub async fn create_vendor(&self, business_id: BusinessId, name: String) -> AppResult<Vendor> {
        let vendor = Vendor::new(business_id, name)?;
        self.catalog_repo.create_vendor(&vendor).await?;
        Ok(vendor)
    }

    pub async fn list_vendors(&self, business_id: BusinessId) -> AppResult<Vec<Vendor>> {
        self.catalog_repo.list_vendors(business_id).await
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create_item(
        &self,
        location_id: LocationId,
        name: String,
        barcode: Option<String>,
        category_id: CategoryId,
        base_uom: Uom,
        container_size_ml: Option<f64>,
        pack_size: Option<i32>,
        vendor_id: Option<VendorId>,
    ) -> AppResult<InventoryItem> {
        if self.catalog_repo.find_category(category_id).await?.is_none() {
            return Err(AppError::not_found("Category not found"));
        }
        let item = InventoryItem::new(
            location_id,
            name,
            barcode,
            category_id,
            base_uom,
            container_size_ml,
            pack_size,
            vendor_id,
        )?;
        self.catalog_repo.create_item(&item).await?;
        Ok(item)
    }

    pub async fn find_item(&self, id: InventoryItemId) -> AppResult<InventoryItem> {
        self.catalog_repo
            .find_item(id)
            .await?
            .ok_or_else(|| AppError::not_found("Inventory item not found"))
    }

    /// Per §4.2, a barcode miss is not an error — it tells the caller to
    /// fall back to manual item selection or creation.
    pub async fn find_item_by_barcode(
        &self,
        location_id: LocationId,
        barcode: &str,
    ) -> AppResult<Option<InventoryItem>> {
        self.catalog_repo.find_item_by_barcode(location_id, barcode).await
    }

    pub async fn list_items(&self, location_id: LocationId) -> AppResult<Vec<InventoryItem>> {
        self.catalog_repo.list_items_for_location(location_id).await
    }

    pub async fn deactivate_item(&self, id: InventoryItemId) -> AppResult<()> {
        self.catalog_repo.deactivate_item(id).await
    }

    pub async fn create_bottle_template(
        &self,
        inventory_item_id: InventoryItemId,
        container_size_ml: f64,
        empty_weight_g: f64,
        full_weight_g: f64,
        measured_density_g_per_ml: Option<f64>,
    ) -> AppResult<BottleTemplate> {
        let template = BottleTemplate::new(
            inventory_item_id,
            container_size_ml,
            empty_weight_g,
            full_weight_g,
            measured_density_g_per_ml,
        )?;
        self.catalog_repo.create_bottle_template(&template).await?;
        Ok(template)
    }

    pub async fn find_bottle_template(
        &self,
        item_id: InventoryItemId,
    ) -> AppResult<Option<BottleTemplate>> {
        self.catalog_repo.find_bottle_template_for_item(item_id).await
    }

    /// Closes any currently-open price row and opens a new one, per §3
    /// PriceHistory's effective-range invariant. Not a single SQL
    /// statement because "close the prior row" and "insert the new row"
    /// are two distinct writes the repository sequences for us.
    pub async fn record_price(
        &self,
        item_id: InventoryItemId,
        unit_cost_cents: i64,
        currency: String,
        effective_from: OffsetDateTime,
    ) -> AppResult<PriceHistory> {
        let unit_cost = Money::from_cents(unit_cost_cents)?;
        self.catalog_repo.close_open_price(item_id, effective_from).await?;
        let price = PriceHistory::new(item_id, unit_cost, effective_from, currency);
        self.catalog_repo.insert_price(&price).await?;
        Ok(price)
    }

    pub async fn current_price(&self, item_id: InventoryItemId) -> AppResult<Option<PriceHistory>> {
        self.catalog_repo.current_price(item_id).await
    }
}
