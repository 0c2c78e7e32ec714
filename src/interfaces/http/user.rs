use crate::application::{AuditService, UserService};
use crate::domain::Role;
use crate::infrastructure::RoleRepository;
use crate::interfaces::http::authz::require_business_role_at_least;
use crate::interfaces::http::middleware::AuthUser;
use crate::shared::{LocationId, UserId};
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: UserResponse,
    pub business: BusinessResponse,
    pub roles: Vec<RoleGrantResponse>,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub business_id: String,
    pub email: String,
    pub display_name: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
pub struct BusinessResponse {
    pub id: String,
    pub name: String,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
pub struct RoleGrantResponse {
    pub location_id: Option<String>,
    pub role: Role,
}

pub async fn me_handler(
    auth_user: AuthUser,
    State(user_service): State<UserService>,
) -> Result<Json<MeResponse>, crate::shared::AppError> {
    let with_business = user_service.get_user_with_business(auth_user.user_id).await?;

    let roles = with_business
        .roles
        .location_ids()
        .into_iter()
        .filter_map(|loc| {
            with_business
                .roles
                .role_at(loc)
                .map(|role| RoleGrantResponse {
                    location_id: Some(loc.to_string()),
                    role,
                })
        })
        .collect();

    Ok(Json(MeResponse {
        user: UserResponse {
            id: with_business.user.id.to_string(),
            business_id: with_business.user.business_id.to_string(),
            email: with_business.user.email.to_string(),
            display_name: with_business.user.display_name.map(|n| n.to_string()),
            created_at: with_business.user.created_at.to_string(),
        },
        business: BusinessResponse {
            id: with_business.business.id.to_string(),
            name: with_business.business.name.to_string(),
            created_at: with_business.business.created_at.to_string(),
        },
        roles,
    }))
}

#[derive(Debug, Deserialize)]
pub struct UpdateAvatarRequest {
    pub avatar_url: String,
}

pub async fn update_avatar_handler(
    auth_user: AuthUser,
    State(user_service): State<UserService>,
    Json(req): Json<UpdateAvatarRequest>,
) -> Result<Json<serde_json::Value>, crate::shared::AppError> {
    user_service
        .update_avatar_url(auth_user.user_id, req.avatar_url)
        .await?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

#[derive(Clone)]
pub struct UserRolesState {
    pub user_service: UserService,
    pub role_repo: RoleRepository,
    pub audit_service: AuditService,
}

#[derive(Debug, Deserialize)]
pub struct GrantRoleRequest {
    pub user_id: UserId,
    pub location_id: Option<LocationId>,
    pub role: Role,
}

/// §4.10: "business_admin may invite users" — granting or changing a role
/// is itself business-admin-gated and, per §4.10's own audit expectation,
/// recorded against the business the grant was made in.
pub async fn grant_role_handler(
    auth_user: AuthUser,
    State(state): State<UserRolesState>,
    Json(req): Json<GrantRoleRequest>,
) -> Result<Json<RoleGrantResponse>, crate::shared::AppError> {
    require_business_role_at_least(&state.role_repo, auth_user.user_id, Role::BusinessAdmin).await?;
    let grant = state
        .user_service
        .grant_role(req.user_id, req.location_id, req.role)
        .await?;

    state
        .audit_service
        .record(
            auth_user.business_id,
            auth_user.user_id,
            "role.grant",
            "user",
            req.user_id.to_string(),
            Some(serde_json::json!({
                "location_id": req.location_id.map(|l| l.to_string()),
                "role": req.role,
            })),
        )
        .await?;

    Ok(Json(RoleGrantResponse {
        location_id: grant.location_id.map(|l| l.to_string()),
        role: grant.role,
    }))
}

#[derive(Debug, Deserialize)]
pub struct RevokeRoleRequest {
    pub user_id: UserId,
    pub location_id: Option<LocationId>,
}

pub async fn revoke_role_handler(
    auth_user: AuthUser,
    State(state): State<UserRolesState>,
    Json(req): Json<RevokeRoleRequest>,
) -> Result<Json<serde_json::Value>, crate::shared::AppError> {
    require_business_role_at_least(&state.role_repo, auth_user.user_id, Role::BusinessAdmin).await?;
    state.user_service.revoke_role(req.user_id, req.location_id).await?;

    state
        .audit_service
        .record(
            auth_user.business_id,
            auth_user.user_id,
            "role.revoke",
            "user",
            req.user_id.to_string(),
            Some(serde_json::json!({ "location_id": req.location_id.map(|l| l.to_string()) })),
        )
        .await?;

    Ok(Json(serde_json::json!({ "ok": true })))
}
