use crate::application::MappingService;
use crate::domain::ledger::SourceSystem;
use crate::domain::mapping::MappingMode;
use crate::domain::measurement::Uom;
use crate::domain::Role;
use crate::infrastructure::RoleRepository;
use crate::interfaces::http::authz::require_role_at_least;
use crate::interfaces::http::middleware::AuthUser;
use crate::shared::{
    AppError, InventoryItemId, KegInstanceId, LocationId, RecipeId, TapLineId,
};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Clone)]
pub struct MappingState {
    pub mapping_service: MappingService,
    pub role_repo: RoleRepository,
}

fn mapping_response(m: crate::domain::mapping::PosItemMapping) -> serde_json::Value {
    serde_json::json!({
        "id": m.id.to_string(),
        "location_id": m.location_id.to_string(),
        "source_system": m.source_system.as_str(),
        "pos_item_id": m.pos_item_id,
        "mode": m.mode.as_str(),
        "direct_item_id": m.direct_item_id.map(|v| v.to_string()),
        "pour_oz": m.pour_oz,
        "tap_line_id": m.tap_line_id.map(|v| v.to_string()),
        "recipe_id": m.recipe_id.map(|v| v.to_string()),
        "effective_from_ts": m.effective_from_ts.to_string(),
        "effective_to_ts": m.effective_to_ts.map(|v| v.to_string()),
    })
}

#[derive(Debug, Deserialize)]
pub struct CreateDirectMappingRequest {
    pub location_id: LocationId,
    pub source_system: String,
    pub pos_item_id: String,
    pub direct_item_id: InventoryItemId,
    pub pour_oz: f64,
    pub effective_from_ts: Option<OffsetDateTime>,
}

pub async fn create_direct_mapping_handler(
    auth_user: AuthUser,
    State(state): State<MappingState>,
    Json(req): Json<CreateDirectMappingRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    require_role_at_least(&state.role_repo, auth_user.user_id, req.location_id, Role::Manager).await?;
    let source_system = SourceSystem::from_str(&req.source_system)?;
    let mapping = state
        .mapping_service
        .create_direct_mapping(
            req.location_id,
            source_system,
            req.pos_item_id,
            req.direct_item_id,
            req.pour_oz,
            req.effective_from_ts.unwrap_or_else(OffsetDateTime::now_utc),
        )
        .await?;
    Ok(Json(mapping_response(mapping)))
}

#[derive(Debug, Deserialize)]
pub struct CreateDraftByTapMappingRequest {
    pub location_id: LocationId,
    pub source_system: String,
    pub pos_item_id: String,
    pub tap_line_id: TapLineId,
    pub pour_oz: f64,
    pub effective_from_ts: Option<OffsetDateTime>,
}

pub async fn create_draft_by_tap_mapping_handler(
    auth_user: AuthUser,
    State(state): State<MappingState>,
    Json(req): Json<CreateDraftByTapMappingRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    require_role_at_least(&state.role_repo, auth_user.user_id, req.location_id, Role::Manager).await?;
    let source_system = SourceSystem::from_str(&req.source_system)?;
    let mapping = state
        .mapping_service
        .create_draft_by_tap_mapping(
            req.location_id,
            source_system,
            req.pos_item_id,
            req.tap_line_id,
            req.pour_oz,
            req.effective_from_ts.unwrap_or_else(OffsetDateTime::now_utc),
        )
        .await?;
    Ok(Json(mapping_response(mapping)))
}

#[derive(Debug, Deserialize)]
pub struct CreateRecipeMappingRequest {
    pub location_id: LocationId,
    pub source_system: String,
    pub pos_item_id: String,
    pub mode: String,
    pub recipe_id: RecipeId,
    pub effective_from_ts: Option<OffsetDateTime>,
}

pub async fn create_recipe_mapping_handler(
    auth_user: AuthUser,
    State(state): State<MappingState>,
    Json(req): Json<CreateRecipeMappingRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    require_role_at_least(&state.role_repo, auth_user.user_id, req.location_id, Role::Manager).await?;
    let source_system = SourceSystem::from_str(&req.source_system)?;
    let mode = MappingMode::from_str(&req.mode)?;
    let mapping = state
        .mapping_service
        .create_recipe_mapping(
            req.location_id,
            source_system,
            req.pos_item_id,
            mode,
            req.recipe_id,
            req.effective_from_ts.unwrap_or_else(OffsetDateTime::now_utc),
        )
        .await?;
    Ok(Json(mapping_response(mapping)))
}

#[derive(Debug, Deserialize)]
pub struct ListMappingsQuery {
    pub location_id: LocationId,
}

pub async fn list_mappings_handler(
    auth_user: AuthUser,
    State(state): State<MappingState>,
    Query(query): Query<ListMappingsQuery>,
) -> Result<Json<Vec<serde_json::Value>>, AppError> {
    require_role_at_least(&state.role_repo, auth_user.user_id, query.location_id, Role::Staff).await?;
    let mappings = state.mapping_service.list_mappings_for_location(query.location_id).await?;
    Ok(Json(mappings.into_iter().map(mapping_response).collect()))
}

#[derive(Debug, Deserialize)]
pub struct CreateRecipeRequest {
    pub name: String,
    pub is_split_ratio: bool,
}

#[derive(Debug, Serialize)]
pub struct RecipeResponse {
    pub id: String,
    pub name: String,
    pub is_split_ratio: bool,
}

impl From<crate::domain::mapping::Recipe> for RecipeResponse {
    fn from(r: crate::domain::mapping::Recipe) -> Self {
        Self {
            id: r.id.to_string(),
            name: r.name,
            is_split_ratio: r.is_split_ratio,
        }
    }
}

/// Recipes live at the business level (§4.3), so creating one needs only
/// a business-wide manager grant, not a location-scoped one.
pub async fn create_recipe_handler(
    auth_user: AuthUser,
    State(state): State<MappingState>,
    Json(req): Json<CreateRecipeRequest>,
) -> Result<Json<RecipeResponse>, AppError> {
    crate::interfaces::http::authz::require_business_role_at_least(&state.role_repo, auth_user.user_id, Role::Manager)
        .await?;
    let recipe = state
        .mapping_service
        .create_recipe(auth_user.business_id, req.name, req.is_split_ratio)
        .await?;
    Ok(Json(recipe.into()))
}

#[derive(Debug, Deserialize)]
pub struct AddIngredientRequest {
    pub inventory_item_id: InventoryItemId,
    pub uom: String,
    pub quantity: Option<f64>,
    pub ratio: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct RecipeIngredientResponse {
    pub id: String,
    pub recipe_id: String,
    pub inventory_item_id: String,
    pub quantity: f64,
    pub ratio: Option<f64>,
    pub uom: String,
}

impl From<crate::domain::mapping::RecipeIngredient> for RecipeIngredientResponse {
    fn from(i: crate::domain::mapping::RecipeIngredient) -> Self {
        Self {
            id: i.id.to_string(),
            recipe_id: i.recipe_id.to_string(),
            inventory_item_id: i.inventory_item_id.to_string(),
            quantity: i.quantity,
            ratio: i.ratio,
            uom: i.uom.as_str().to_string(),
        }
    }
}

pub async fn add_ingredient_handler(
    auth_user: AuthUser,
    State(state): State<MappingState>,
    Path(recipe_id): Path<RecipeId>,
    Json(req): Json<AddIngredientRequest>,
) -> Result<Json<RecipeIngredientResponse>, AppError> {
    crate::interfaces::http::authz::require_business_role_at_least(&state.role_repo, auth_user.user_id, Role::Manager)
        .await?;
    let uom = Uom::from_str(&req.uom)?;
    let ingredient = match (req.quantity, req.ratio) {
        (Some(quantity), None) => {
            state
                .mapping_service
                .add_fixed_ingredient(recipe_id, req.inventory_item_id, quantity, uom)
                .await?
        }
        (None, Some(ratio)) => {
            state
                .mapping_service
                .add_ratio_ingredient(recipe_id, req.inventory_item_id, ratio, uom)
                .await?
        }
        _ => {
            return Err(AppError::validation(
                "exactly one of quantity or ratio must be provided",
            ))
        }
    };
    Ok(Json(ingredient.into()))
}

pub async fn list_ingredients_handler(
    auth_user: AuthUser,
    State(state): State<MappingState>,
    Path(recipe_id): Path<RecipeId>,
) -> Result<Json<Vec<RecipeIngredientResponse>>, AppError> {
    crate::interfaces::http::authz::require_business_role_at_least(&state.role_repo, auth_user.user_id, Role::Staff)
        .await?;
    let ingredients = state.mapping_service.list_ingredients_for_recipe(recipe_id).await?;
    Ok(Json(ingredients.into_iter().map(Into::into).collect()))
}

#[derive(Debug, Deserialize)]
pub struct CreateTapLineRequest {
    pub location_id: LocationId,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct TapLineResponse {
    pub id: String,
    pub location_id: String,
    pub name: String,
}

impl From<crate::domain::mapping::TapLine> for TapLineResponse {
    fn from(t: crate::domain::mapping::TapLine) -> Self {
        Self {
            id: t.id.to_string(),
            location_id: t.location_id.to_string(),
            name: t.name,
        }
    }
}

pub async fn create_tap_line_handler(
    auth_user: AuthUser,
    State(state): State<MappingState>,
    Json(req): Json<CreateTapLineRequest>,
) -> Result<Json<TapLineResponse>, AppError> {
    require_role_at_least(&state.role_repo, auth_user.user_id, req.location_id, Role::Manager).await?;
    let tap_line = state.mapping_service.create_tap_line(req.location_id, req.name).await?;
    Ok(Json(tap_line.into()))
}

#[derive(Debug, Deserialize)]
pub struct ListTapLinesQuery {
    pub location_id: LocationId,
}

pub async fn list_tap_lines_handler(
    auth_user: AuthUser,
    State(state): State<MappingState>,
    Query(query): Query<ListTapLinesQuery>,
) -> Result<Json<Vec<TapLineResponse>>, AppError> {
    require_role_at_least(&state.role_repo, auth_user.user_id, query.location_id, Role::Staff).await?;
    let tap_lines = state.mapping_service.list_tap_lines_for_location(query.location_id).await?;
    Ok(Json(tap_lines.into_iter().map(Into::into).collect()))
}

#[derive(Debug, Deserialize)]
pub struct CreateKegInstanceRequest {
    pub location_id: LocationId,
    pub inventory_item_id: InventoryItemId,
    pub starting_volume_ml: f64,
}

#[derive(Debug, Serialize)]
pub struct KegInstanceResponse {
    pub id: String,
    pub location_id: String,
    pub inventory_item_id: String,
    pub starting_volume_ml: f64,
    pub tapped_at: Option<String>,
}

impl From<crate::domain::mapping::KegInstance> for KegInstanceResponse {
    fn from(k: crate::domain::mapping::KegInstance) -> Self {
        Self {
            id: k.id.to_string(),
            location_id: k.location_id.to_string(),
            inventory_item_id: k.inventory_item_id.to_string(),
            starting_volume_ml: k.starting_volume_ml,
            tapped_at: k.tapped_at.map(|t| t.to_string()),
        }
    }
}

pub async fn create_keg_instance_handler(
    auth_user: AuthUser,
    State(state): State<MappingState>,
    Json(req): Json<CreateKegInstanceRequest>,
) -> Result<Json<KegInstanceResponse>, AppError> {
    require_role_at_least(&state.role_repo, auth_user.user_id, req.location_id, Role::Manager).await?;
    let keg = state
        .mapping_service
        .create_keg_instance(req.location_id, req.inventory_item_id, req.starting_volume_ml)
        .await?;
    Ok(Json(keg.into()))
}

#[derive(Debug, Deserialize)]
pub struct AssignKegRequest {
    pub location_id: LocationId,
    pub keg_instance_id: KegInstanceId,
    pub started_ts: Option<OffsetDateTime>,
}

#[derive(Debug, Serialize)]
pub struct TapAssignmentResponse {
    pub id: String,
    pub tap_line_id: String,
    pub keg_instance_id: String,
    pub started_ts: String,
    pub ended_ts: Option<String>,
}

impl From<crate::domain::mapping::TapAssignment> for TapAssignmentResponse {
    fn from(a: crate::domain::mapping::TapAssignment) -> Self {
        Self {
            id: a.id.to_string(),
            tap_line_id: a.tap_line_id.to_string(),
            keg_instance_id: a.keg_instance_id.to_string(),
            started_ts: a.started_ts.to_string(),
            ended_ts: a.ended_ts.map(|t| t.to_string()),
        }
    }
}

pub async fn assign_keg_to_tap_handler(
    auth_user: AuthUser,
    State(state): State<MappingState>,
    Path(tap_line_id): Path<TapLineId>,
    Json(req): Json<AssignKegRequest>,
) -> Result<Json<TapAssignmentResponse>, AppError> {
    require_role_at_least(&state.role_repo, auth_user.user_id, req.location_id, Role::Manager).await?;
    let assignment = state
        .mapping_service
        .assign_keg_to_tap(
            tap_line_id,
            req.keg_instance_id,
            req.started_ts.unwrap_or_else(OffsetDateTime::now_utc),
        )
        .await?;
    Ok(Json(assignment.into()))
}
