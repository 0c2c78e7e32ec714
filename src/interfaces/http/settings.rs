use crate::application::SettingsService;
use crate::domain::settings::{AutoLockPolicy, BusinessSettings, DepletionPrecedence};
use crate::domain::Role;
use crate::infrastructure::RoleRepository;
use crate::interfaces::http::authz::require_business_role_at_least;
use crate::interfaces::http::middleware::AuthUser;
use crate::shared::AppError;
use axum::{extract::State, Json};
use serde::Deserialize;

#[derive(Clone)]
pub struct SettingsState {
    pub settings_service: SettingsService,
    pub role_repo: RoleRepository,
}

pub async fn get_settings_handler(
    auth_user: AuthUser,
    State(state): State<SettingsState>,
) -> Result<Json<BusinessSettings>, AppError> {
    let settings = state.settings_service.get(auth_user.business_id).await?;
    Ok(Json(settings))
}

#[derive(Debug, Deserialize)]
pub struct UpdateVarianceThresholdRequest {
    pub threshold_pct: f64,
}

/// §4.10: business-wide settings are business-admin territory ("business_admin
/// may edit settings and invite users").
pub async fn update_variance_threshold_handler(
    auth_user: AuthUser,
    State(state): State<SettingsState>,
    Json(req): Json<UpdateVarianceThresholdRequest>,
) -> Result<Json<BusinessSettings>, AppError> {
    require_business_role_at_least(&state.role_repo, auth_user.user_id, Role::BusinessAdmin).await?;
    let settings = state
        .settings_service
        .update_variance_threshold(auth_user.business_id, req.threshold_pct)
        .await?;
    Ok(Json(settings))
}

#[derive(Debug, Deserialize)]
pub struct UpdateDepletionPrecedenceRequest {
    pub precedence: DepletionPrecedence,
}

pub async fn update_depletion_precedence_handler(
    auth_user: AuthUser,
    State(state): State<SettingsState>,
    Json(req): Json<UpdateDepletionPrecedenceRequest>,
) -> Result<Json<BusinessSettings>, AppError> {
    require_business_role_at_least(&state.role_repo, auth_user.user_id, Role::BusinessAdmin).await?;
    let settings = state
        .settings_service
        .update_depletion_precedence(auth_user.business_id, req.precedence)
        .await?;
    Ok(Json(settings))
}

#[derive(Debug, Deserialize)]
pub struct UpdateAutoLockRequest {
    pub policy: AutoLockPolicy,
}

pub async fn update_auto_lock_handler(
    auth_user: AuthUser,
    State(state): State<SettingsState>,
    Json(req): Json<UpdateAutoLockRequest>,
) -> Result<Json<BusinessSettings>, AppError> {
    require_business_role_at_least(&state.role_repo, auth_user.user_id, Role::BusinessAdmin).await?;
    let settings = state
        .settings_service
        .update_auto_lock(auth_user.business_id, req.policy)
        .await?;
    Ok(Json(settings))
}
