use crate::application::LocationService;
use crate::domain::Role;
use crate::infrastructure::RoleRepository;
use crate::interfaces::http::authz::require_business_role_at_least;
use crate::interfaces::http::middleware::AuthUser;
use crate::shared::{AppError, LocationId};
use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

#[derive(Clone)]
pub struct LocationsState {
    pub location_service: LocationService,
    pub role_repo: RoleRepository,
}

#[derive(Debug, Serialize)]
pub struct LocationResponse {
    pub id: String,
    pub business_id: String,
    pub name: String,
    pub timezone: String,
    pub created_at: String,
}

impl From<crate::domain::Location> for LocationResponse {
    fn from(l: crate::domain::Location) -> Self {
        Self {
            id: l.id.to_string(),
            business_id: l.business_id.to_string(),
            name: l.name,
            timezone: l.timezone,
            created_at: l.created_at.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateLocationRequest {
    pub name: String,
    pub timezone: String,
}

/// Creating a new bar location is business-admin territory (§4.10
/// "business_admin may edit settings and invite users" — standing up a
/// location is the same tier of ownership change).
pub async fn create_location_handler(
    auth_user: AuthUser,
    State(state): State<LocationsState>,
    Json(req): Json<CreateLocationRequest>,
) -> Result<Json<LocationResponse>, AppError> {
    require_business_role_at_least(&state.role_repo, auth_user.user_id, Role::BusinessAdmin).await?;
    let location = state
        .location_service
        .create(auth_user.business_id, req.name, req.timezone)
        .await?;
    Ok(Json(location.into()))
}

pub async fn list_locations_handler(
    auth_user: AuthUser,
    State(state): State<LocationsState>,
) -> Result<Json<Vec<LocationResponse>>, AppError> {
    let locations = state.location_service.list_for_business(auth_user.business_id).await?;
    Ok(Json(locations.into_iter().map(Into::into).collect()))
}

pub async fn get_location_handler(
    auth_user: AuthUser,
    State(state): State<LocationsState>,
    Path(location_id): Path<LocationId>,
) -> Result<Json<LocationResponse>, AppError> {
    let location = state
        .location_service
        .find(location_id)
        .await?
        .ok_or_else(|| AppError::not_found("Location not found"))?;
    if location.business_id != auth_user.business_id {
        return Err(AppError::not_found("Location not found"));
    }
    Ok(Json(location.into()))
}
