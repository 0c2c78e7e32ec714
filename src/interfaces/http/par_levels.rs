use crate::application::{ParService, VendorReorderBundle};
use crate::domain::par::{ParLevel, ParUom};
use crate::domain::Role;
use crate::infrastructure::RoleRepository;
use crate::interfaces::http::authz::require_role_at_least;
use crate::interfaces::http::middleware::AuthUser;
use crate::shared::{AppError, InventoryItemId, LocationId, VendorId};
use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

#[derive(Clone)]
pub struct ParLevelsState {
    pub par_service: ParService,
    pub role_repo: RoleRepository,
}

#[derive(Debug, Deserialize)]
pub struct CreateParLevelRequest {
    pub location_id: LocationId,
    pub inventory_item_id: InventoryItemId,
    pub vendor_id: VendorId,
    pub par_level: f64,
    pub min_level: f64,
    pub reorder_qty_override: Option<f64>,
    pub par_uom: String,
    pub package_size: Option<f64>,
    pub lead_time_days: f64,
    pub safety_stock_days: f64,
}

#[derive(Debug, Serialize)]
pub struct ParLevelResponse {
    pub id: String,
    pub location_id: String,
    pub inventory_item_id: String,
    pub vendor_id: String,
    pub par_level: f64,
    pub min_level: f64,
    pub par_uom: String,
    pub lead_time_days: f64,
    pub safety_stock_days: f64,
}

impl From<ParLevel> for ParLevelResponse {
    fn from(p: ParLevel) -> Self {
        Self {
            id: p.id.to_string(),
            location_id: p.location_id.to_string(),
            inventory_item_id: p.inventory_item_id.to_string(),
            vendor_id: p.vendor_id.to_string(),
            par_level: p.par_level,
            min_level: p.min_level,
            par_uom: p.par_uom.as_str().to_string(),
            lead_time_days: p.lead_time_days,
            safety_stock_days: p.safety_stock_days,
        }
    }
}

/// Setting a par level is manager territory (§4.10: same tier that
/// governs mapping management, since both shape how reorders and
/// depletion behave going forward).
pub async fn create_par_level_handler(
    auth_user: AuthUser,
    State(state): State<ParLevelsState>,
    Json(req): Json<CreateParLevelRequest>,
) -> Result<Json<ParLevelResponse>, AppError> {
    require_role_at_least(&state.role_repo, auth_user.user_id, req.location_id, Role::Manager).await?;
    let par_uom = ParUom::from_str(&req.par_uom)?;
    let par = state
        .par_service
        .create_par_level(
            req.location_id,
            req.inventory_item_id,
            req.vendor_id,
            req.par_level,
            req.min_level,
            req.reorder_qty_override,
            par_uom,
            req.package_size,
            req.lead_time_days,
            req.safety_stock_days,
        )
        .await?;
    Ok(Json(par.into()))
}

#[derive(Debug, Deserialize)]
pub struct SuggestReordersQuery {
    pub location_id: LocationId,
}

pub async fn suggest_reorders_handler(
    auth_user: AuthUser,
    State(state): State<ParLevelsState>,
    Query(query): Query<SuggestReordersQuery>,
) -> Result<Json<Vec<VendorReorderBundle>>, AppError> {
    require_role_at_least(&state.role_repo, auth_user.user_id, query.location_id, Role::Manager).await?;
    let bundles = state.par_service.suggest_reorders(query.location_id).await?;
    Ok(Json(bundles))
}
