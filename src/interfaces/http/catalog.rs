use crate::application::CatalogService;
use crate::domain::catalog::CountingMethod;
use crate::domain::measurement::Uom;
use crate::domain::Role;
use crate::infrastructure::RoleRepository;
use crate::interfaces::http::authz::{require_business_role_at_least, require_role_at_least};
use crate::interfaces::http::middleware::AuthUser;
use crate::shared::{AppError, BottleTemplateId, CategoryId, InventoryItemId, LocationId, VendorId};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Clone)]
pub struct CatalogState {
    pub catalog_service: CatalogService,
    pub role_repo: RoleRepository,
}

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    pub counting_method: String,
    pub default_density_g_per_ml: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct CategoryResponse {
    pub id: String,
    pub name: String,
    pub counting_method: String,
    pub default_density_g_per_ml: Option<f64>,
}

impl From<crate::domain::catalog::Category> for CategoryResponse {
    fn from(c: crate::domain::catalog::Category) -> Self {
        Self {
            id: c.id.to_string(),
            name: c.name,
            counting_method: c.counting_method.as_str().to_string(),
            default_density_g_per_ml: c.default_density_g_per_ml,
        }
    }
}

/// §4.10: managing the catalog's taxonomy is curator-and-up, one tier
/// above the `manager` floor that governs day-to-day session work.
pub async fn create_category_handler(
    auth_user: AuthUser,
    State(state): State<CatalogState>,
    Json(req): Json<CreateCategoryRequest>,
) -> Result<Json<CategoryResponse>, AppError> {
    require_business_role_at_least(&state.role_repo, auth_user.user_id, Role::Curator).await?;
    let counting_method = CountingMethod::from_str(&req.counting_method)?;
    let category = state
        .catalog_service
        .create_category(auth_user.business_id, req.name, counting_method, req.default_density_g_per_ml)
        .await?;
    Ok(Json(category.into()))
}

pub async fn list_categories_handler(
    auth_user: AuthUser,
    State(state): State<CatalogState>,
) -> Result<Json<Vec<CategoryResponse>>, AppError> {
    let categories = state.catalog_service.list_categories(auth_user.business_id).await?;
    Ok(Json(categories.into_iter().map(Into::into).collect()))
}

#[derive(Debug, Deserialize)]
pub struct CreateVendorRequest {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct VendorResponse {
    pub id: String,
    pub name: String,
}

impl From<crate::domain::catalog::Vendor> for VendorResponse {
    fn from(v: crate::domain::catalog::Vendor) -> Self {
        Self {
            id: v.id.to_string(),
            name: v.name,
        }
    }
}

pub async fn create_vendor_handler(
    auth_user: AuthUser,
    State(state): State<CatalogState>,
    Json(req): Json<CreateVendorRequest>,
) -> Result<Json<VendorResponse>, AppError> {
    require_business_role_at_least(&state.role_repo, auth_user.user_id, Role::Curator).await?;
    let vendor = state.catalog_service.create_vendor(auth_user.business_id, req.name).await?;
    Ok(Json(vendor.into()))
}

pub async fn list_vendors_handler(
    auth_user: AuthUser,
    State(state): State<CatalogState>,
) -> Result<Json<Vec<VendorResponse>>, AppError> {
    let vendors = state.catalog_service.list_vendors(auth_user.business_id).await?;
    Ok(Json(vendors.into_iter().map(Into::into).collect()))
}

#[derive(Debug, Deserialize)]
pub struct CreateItemRequest {
    pub location_id: LocationId,
    pub name: String,
    pub barcode: Option<String>,
    pub category_id: CategoryId,
    pub base_uom: String,
    pub container_size_ml: Option<f64>,
    pub pack_size: Option<i32>,
    pub vendor_id: Option<VendorId>,
}

#[derive(Debug, Serialize)]
pub struct ItemResponse {
    pub id: String,
    pub location_id: String,
    pub name: String,
    pub barcode: Option<String>,
    pub category_id: String,
    pub base_uom: String,
    pub container_size_ml: Option<f64>,
    pub pack_size: Option<i32>,
    pub vendor_id: Option<String>,
    pub active: bool,
}

impl From<crate::domain::catalog::InventoryItem> for ItemResponse {
    fn from(i: crate::domain::catalog::InventoryItem) -> Self {
        Self {
            id: i.id.to_string(),
            location_id: i.location_id.to_string(),
            name: i.name,
            barcode: i.barcode,
            category_id: i.category_id.to_string(),
            base_uom: i.base_uom.as_str().to_string(),
            container_size_ml: i.container_size_ml,
            pack_size: i.pack_size,
            vendor_id: i.vendor_id.map(|v| v.to_string()),
            active: i.active,
        }
    }
}

pub async fn create_item_handler(
    auth_user: AuthUser,
    State(state): State<CatalogState>,
    Json(req): Json<CreateItemRequest>,
) -> Result<Json<ItemResponse>, AppError> {
    require_role_at_least(&state.role_repo, auth_user.user_id, req.location_id, Role::Curator).await?;
    let base_uom = Uom::from_str(&req.base_uom)?;
    let item = state
        .catalog_service
        .create_item(
            req.location_id,
            req.name,
            req.barcode,
            req.category_id,
            base_uom,
            req.container_size_ml,
            req.pack_size,
            req.vendor_id,
        )
        .await?;
    Ok(Json(item.into()))
}

pub async fn get_item_handler(
    auth_user: AuthUser,
    State(state): State<CatalogState>,
    Path(item_id): Path<InventoryItemId>,
) -> Result<Json<ItemResponse>, AppError> {
    let item = state.catalog_service.find_item(item_id).await?;
    require_role_at_least(&state.role_repo, auth_user.user_id, item.location_id, Role::Staff).await?;
    Ok(Json(item.into()))
}

#[derive(Debug, Deserialize)]
pub struct ListItemsQuery {
    pub location_id: LocationId,
}

pub async fn list_items_handler(
    auth_user: AuthUser,
    State(state): State<CatalogState>,
    Query(query): Query<ListItemsQuery>,
) -> Result<Json<Vec<ItemResponse>>, AppError> {
    require_role_at_least(&state.role_repo, auth_user.user_id, query.location_id, Role::Staff).await?;
    let items = state.catalog_service.list_items(query.location_id).await?;
    Ok(Json(items.into_iter().map(Into::into).collect()))
}

#[derive(Debug, Deserialize)]
pub struct BarcodeQuery {
    pub location_id: LocationId,
    pub barcode: String,
}

/// A barcode miss returns `200 {"item": null}`, not `404` — per §4.2 a
/// miss is a normal branch of the scan flow, not an error.
pub async fn find_item_by_barcode_handler(
    auth_user: AuthUser,
    State(state): State<CatalogState>,
    Query(query): Query<BarcodeQuery>,
) -> Result<Json<Option<ItemResponse>>, AppError> {
    require_role_at_least(&state.role_repo, auth_user.user_id, query.location_id, Role::Staff).await?;
    let item = state
        .catalog_service
        .find_item_by_barcode(query.location_id, &query.barcode)
        .await?;
    Ok(Json(item.map(Into::into)))
}

pub async fn deactivate_item_handler(
    auth_user: AuthUser,
    State(state): State<CatalogState>,
    Path(item_id): Path<InventoryItemId>,
) -> Result<Json<serde_json::Value>, AppError> {
    let item = state.catalog_service.find_item(item_id).await?;
    require_role_at_least(&state.role_repo, auth_user.user_id, item.location_id, Role::Curator).await?;
    state.catalog_service.deactivate_item(item_id).await?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

#[derive(Debug, Deserialize)]
pub struct CreateBottleTemplateRequest {
    pub inventory_item_id: InventoryItemId,
    pub container_size_ml: f64,
    pub empty_weight_g: f64,
    pub full_weight_g: f64,
    pub measured_density_g_per_ml: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct BottleTemplateResponse {
    pub id: String,
    pub inventory_item_id: String,
    pub container_size_ml: f64,
    pub empty_weight_g: f64,
    pub full_weight_g: f64,
    pub density_g_per_ml: f64,
}

impl From<crate::domain::catalog::BottleTemplate> for BottleTemplateResponse {
    fn from(t: crate::domain::catalog::BottleTemplate) -> Self {
        let density = t.density_g_per_ml();
        Self {
            id: t.id.to_string(),
            inventory_item_id: t.inventory_item_id.to_string(),
            container_size_ml: t.container_size_ml,
            empty_weight_g: t.empty_weight_g,
            full_weight_g: t.full_weight_g,
            density_g_per_ml: density,
        }
    }
}

pub async fn create_bottle_template_handler(
    auth_user: AuthUser,
    State(state): State<CatalogState>,
    Json(req): Json<CreateBottleTemplateRequest>,
) -> Result<Json<BottleTemplateResponse>, AppError> {
    let item = state.catalog_service.find_item(req.inventory_item_id).await?;
    require_role_at_least(&state.role_repo, auth_user.user_id, item.location_id, Role::Curator).await?;
    let template = state
        .catalog_service
        .create_bottle_template(
            req.inventory_item_id,
            req.container_size_ml,
            req.empty_weight_g,
            req.full_weight_g,
            req.measured_density_g_per_ml,
        )
        .await?;
    Ok(Json(template.into()))
}

pub async fn get_bottle_template_handler(
    auth_user: AuthUser,
    State(state): State<CatalogState>,
    Path(item_id): Path<InventoryItemId>,
) -> Result<Json<Option<BottleTemplateResponse>>, AppError> {
    let item = state.catalog_service.find_item(item_id).await?;
    require_role_at_least(&state.role_repo, auth_user.user_id, item.location_id, Role::Staff).await?;
    let template = state.catalog_service.find_bottle_template(item_id).await?;
    Ok(Json(template.map(Into::into)))
}

#[derive(Debug, Deserialize)]
pub struct RecordPriceRequest {
    pub unit_cost_cents: i64,
    pub currency: String,
}

#[derive(Debug, Serialize)]
pub struct PriceResponse {
    pub id: String,
    pub unit_cost_cents: i64,
    pub currency: String,
    pub effective_from: String,
}

impl From<crate::domain::catalog::PriceHistory> for PriceResponse {
    fn from(p: crate::domain::catalog::PriceHistory) -> Self {
        Self {
            id: p.id.to_string(),
            unit_cost_cents: p.unit_cost.as_cents(),
            currency: p.currency,
            effective_from: p.effective_from.to_string(),
        }
    }
}

pub async fn record_price_handler(
    auth_user: AuthUser,
    State(state): State<CatalogState>,
    Path(item_id): Path<InventoryItemId>,
    Json(req): Json<RecordPriceRequest>,
) -> Result<Json<PriceResponse>, AppError> {
    let item = state.catalog_service.find_item(item_id).await?;
    require_role_at_least(&state.role_repo, auth_user.user_id, item.location_id, Role::Accounting).await?;
    let price = state
        .catalog_service
        .record_price(item_id, req.unit_cost_cents, req.currency, OffsetDateTime::now_utc())
        .await?;
    Ok(Json(price.into()))
}

pub async fn current_price_handler(
    auth_user: AuthUser,
    State(state): State<CatalogState>,
    Path(item_id): Path<InventoryItemId>,
) -> Result<Json<Option<PriceResponse>>, AppError> {
    let item = state.catalog_service.find_item(item_id).await?;
    require_role_at_least(&state.role_repo, auth_user.user_id, item.location_id, Role::Staff).await?;
    let price = state.catalog_service.current_price(item_id).await?;
    Ok(Json(price.map(Into::into)))
}

#[derive(Debug, Deserialize)]
pub struct BottleTemplateIdParam {
    #[allow(dead_code)]
    pub id: BottleTemplateId,
}
