use crate::application::CatalogService;
use crate::domain::Role;
use crate::infrastructure::RoleRepository;
use crate::interfaces::http::authz::require_role_at_least;
use crate::interfaces::http::middleware::AuthUser;
use crate::shared::{AppError, InventoryItemId, LocationId};
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

#[derive(Clone)]
pub struct ScaleState {
    pub catalog_service: CatalogService,
    pub role_repo: RoleRepository,
}

#[derive(Debug, Deserialize)]
pub struct WeighReadingRequest {
    pub location_id: LocationId,
    pub inventory_item_id: InventoryItemId,
    pub gross_weight_g: f64,
}

#[derive(Debug, Serialize)]
pub struct WeighReadingResponse {
    pub remaining_ml: f64,
}

/// Converts a bottle's gross scale reading into a remaining-volume figure
/// (§4.1 weigh-in capture), using the item's bottle template if one
/// exists. No template means the scale capture can't be interpreted —
/// this is a `404`, not a zero reading.
pub async fn convert_weigh_reading_handler(
    auth_user: AuthUser,
    State(state): State<ScaleState>,
    Json(req): Json<WeighReadingRequest>,
) -> Result<Json<WeighReadingResponse>, AppError> {
    require_role_at_least(&state.role_repo, auth_user.user_id, req.location_id, Role::Staff).await?;
    let template = state
        .catalog_service
        .find_bottle_template(req.inventory_item_id)
        .await?
        .ok_or_else(|| AppError::not_found("No bottle template for this item"))?;
    let remaining_ml = template.gross_weight_to_ml(req.gross_weight_g)?;
    Ok(Json(WeighReadingResponse { remaining_ml }))
}
