use crate::application::AlertService;
use crate::domain::notification::{AlertRule, AlertRuleType, Notification};
use crate::domain::Role;
use crate::infrastructure::{NotificationRepository, NotificationRepositoryTrait, RoleRepository};
use crate::interfaces::http::authz::{require_business_role_at_least, require_role_at_least};
use crate::interfaces::http::middleware::AuthUser;
use crate::shared::{AppError, LocationId, NotificationId};
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

#[derive(Clone)]
pub struct NotificationsState {
    pub alert_service: AlertService,
    pub notification_repo: NotificationRepository,
    pub role_repo: RoleRepository,
}

#[derive(Debug, Deserialize)]
pub struct UpsertAlertRuleRequest {
    pub location_id: Option<LocationId>,
    pub rule_type: String,
    pub threshold_pct: Option<f64>,
    pub enabled: bool,
}

/// Alert rule configuration is business-admin territory (§4.10), since it
/// shapes who gets paged and for what across the whole business.
pub async fn upsert_rule_handler(
    auth_user: AuthUser,
    State(state): State<NotificationsState>,
    Json(req): Json<UpsertAlertRuleRequest>,
) -> Result<Json<AlertRule>, AppError> {
    require_business_role_at_least(&state.role_repo, auth_user.user_id, Role::BusinessAdmin).await?;
    let rule_type = AlertRuleType::from_str(&req.rule_type)?;
    let rule = AlertRule {
        business_id: auth_user.business_id,
        location_id: req.location_id,
        rule_type,
        threshold_pct: req.threshold_pct,
        enabled: req.enabled,
    };
    state.alert_service.upsert_rule(rule.clone()).await?;
    Ok(Json(rule))
}

/// Manually triggers the same evaluation the `/cron/evaluate-alerts` sweep
/// runs on a schedule, scoped to one location (§4.9).
pub async fn evaluate_location_handler(
    auth_user: AuthUser,
    State(state): State<NotificationsState>,
    Path(location_id): Path<LocationId>,
) -> Result<Json<Vec<Notification>>, AppError> {
    require_role_at_least(&state.role_repo, auth_user.user_id, location_id, Role::Manager).await?;
    let dispatched = state.alert_service.evaluate_location(auth_user.business_id, location_id).await?;
    Ok(Json(dispatched))
}

pub async fn evaluate_business_handler(
    auth_user: AuthUser,
    State(state): State<NotificationsState>,
) -> Result<Json<Vec<Notification>>, AppError> {
    require_business_role_at_least(&state.role_repo, auth_user.user_id, Role::BusinessAdmin).await?;
    let dispatched = state.alert_service.evaluate_business(auth_user.business_id).await?;
    Ok(Json(dispatched))
}

#[derive(Debug, Deserialize)]
pub struct ListNotificationsQuery {
    #[serde(default)]
    pub unread_only: bool,
}

/// A user's own notification inbox — no role floor beyond authentication,
/// since a recipient is always entitled to see alerts addressed to them.
pub async fn list_my_notifications_handler(
    auth_user: AuthUser,
    State(state): State<NotificationsState>,
    Query(query): Query<ListNotificationsQuery>,
) -> Result<Json<Vec<Notification>>, AppError> {
    let notifications = state
        .notification_repo
        .list_for_recipient(auth_user.user_id, query.unread_only)
        .await?;
    Ok(Json(notifications))
}

pub async fn mark_read_handler(
    _auth_user: AuthUser,
    State(state): State<NotificationsState>,
    Path(notification_id): Path<NotificationId>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.notification_repo.mark_read(notification_id).await?;
    Ok(Json(serde_json::json!({ "ok": true })))
}
