use crate::application::AuditService;
use crate::domain::audit::AuditLogEntry;
use crate::domain::Role;
use crate::infrastructure::RoleRepository;
use crate::interfaces::http::authz::require_business_role_at_least;
use crate::interfaces::http::middleware::AuthUser;
use crate::shared::AppError;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

#[derive(Clone)]
pub struct AuditState {
    pub audit_service: AuditService,
    pub role_repo: RoleRepository,
}

#[derive(Debug, Deserialize)]
pub struct ListAuditQuery {
    pub limit: Option<i64>,
}

/// §4.10: the audit trail itself is accounting/business-admin territory —
/// it's a review surface, not an operational one.
pub async fn list_for_business_handler(
    auth_user: AuthUser,
    State(state): State<AuditState>,
    Query(query): Query<ListAuditQuery>,
) -> Result<Json<Vec<AuditLogEntry>>, AppError> {
    require_business_role_at_least(&state.role_repo, auth_user.user_id, Role::Accounting).await?;
    let entries = state
        .audit_service
        .list_for_business(auth_user.business_id, query.limit.unwrap_or(200))
        .await?;
    Ok(Json(entries))
}

pub async fn list_for_entity_handler(
    auth_user: AuthUser,
    State(state): State<AuditState>,
    Path((entity_type, entity_id)): Path<(String, String)>,
) -> Result<Json<Vec<AuditLogEntry>>, AppError> {
    require_business_role_at_least(&state.role_repo, auth_user.user_id, Role::Accounting).await?;
    let entries = state.audit_service.list_for_entity(&entity_type, &entity_id).await?;
    Ok(Json(entries))
}
