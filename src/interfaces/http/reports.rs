use crate::application::{ExpectedService, ExpectedSnapshot, PatternService, SettingsService};
use crate::domain::pattern::{ShrinkageSuspect, VarianceSnapshot};
use crate::domain::Role;
use crate::infrastructure::RoleRepository;
use crate::interfaces::http::authz::require_role_at_least;
use crate::interfaces::http::middleware::AuthUser;
use crate::shared::{AppError, InventoryItemId, LocationId};
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use time::OffsetDateTime;

#[derive(Clone)]
pub struct ReportsState {
    pub expected_service: ExpectedService,
    pub pattern_service: PatternService,
    pub settings_service: SettingsService,
    pub role_repo: RoleRepository,
}

impl ReportsState {
    async fn threshold_for(&self, business_id: crate::shared::BusinessId) -> Result<f64, AppError> {
        Ok(self.settings_service.get(business_id).await?.default_variance_threshold_pct)
    }
}

pub async fn expected_snapshot_handler(
    auth_user: AuthUser,
    State(state): State<ReportsState>,
    Path((location_id, item_id)): Path<(LocationId, InventoryItemId)>,
) -> Result<Json<ExpectedSnapshot>, AppError> {
    require_role_at_least(&state.role_repo, auth_user.user_id, location_id, Role::Staff).await?;
    let snapshot = state.expected_service.snapshot(item_id, OffsetDateTime::now_utc()).await?;
    Ok(Json(snapshot))
}

pub async fn variance_snapshot_handler(
    auth_user: AuthUser,
    State(state): State<ReportsState>,
    Path((location_id, item_id)): Path<(LocationId, InventoryItemId)>,
) -> Result<Json<VarianceSnapshot>, AppError> {
    require_role_at_least(&state.role_repo, auth_user.user_id, location_id, Role::Staff).await?;
    let snapshot = state
        .pattern_service
        .snapshot_for_item(location_id, item_id, OffsetDateTime::now_utc())
        .await?;
    Ok(Json(snapshot))
}

pub async fn location_variance_report_handler(
    auth_user: AuthUser,
    State(state): State<ReportsState>,
    Path(location_id): Path<LocationId>,
) -> Result<Json<Vec<VarianceSnapshot>>, AppError> {
    require_role_at_least(&state.role_repo, auth_user.user_id, location_id, Role::Staff).await?;
    let snapshots = state.pattern_service.snapshot_location(location_id, OffsetDateTime::now_utc()).await?;
    Ok(Json(snapshots))
}

#[derive(Debug, Deserialize)]
pub struct ThresholdOverrideQuery {
    pub threshold_pct: Option<f64>,
}

pub async fn shrinkage_suspects_handler(
    auth_user: AuthUser,
    State(state): State<ReportsState>,
    Path(location_id): Path<LocationId>,
    Query(query): Query<ThresholdOverrideQuery>,
) -> Result<Json<Vec<ShrinkageSuspect>>, AppError> {
    require_role_at_least(&state.role_repo, auth_user.user_id, location_id, Role::Manager).await?;
    let threshold = match query.threshold_pct {
        Some(t) => t,
        None => state.threshold_for(auth_user.business_id).await?,
    };
    let suspects = state
        .pattern_service
        .confirmed_shrinkage_suspects(location_id, threshold, OffsetDateTime::now_utc())
        .await?;
    Ok(Json(suspects))
}
