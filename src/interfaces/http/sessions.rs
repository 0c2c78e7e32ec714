use crate::application::{AddLineCommand, AuditService, SessionCloseSummary, SessionService};
use crate::domain::session::{
    InventorySession, InventorySessionLine, QuantityForm, SessionParticipant, SessionType,
    VarianceReason, VarianceReasonEntry,
};
use crate::domain::Role;
use crate::infrastructure::RoleRepository;
use crate::interfaces::http::authz::require_role_at_least;
use crate::interfaces::http::middleware::AuthUser;
use crate::shared::{AppError, InventoryItemId, InventorySessionId, LocationId};
use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures_util::stream::Stream;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use tokio_stream::{wrappers::errors::BroadcastStreamRecvError, wrappers::BroadcastStream, StreamExt};

#[derive(Clone)]
pub struct SessionsState {
    pub session_service: SessionService,
    pub role_repo: RoleRepository,
    pub audit_service: AuditService,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub id: String,
    pub location_id: String,
    pub session_type: String,
    pub status: String,
    pub opened_by: String,
    pub opened_at: String,
    pub closed_by: Option<String>,
    pub closed_at: Option<String>,
}

impl From<InventorySession> for SessionResponse {
    fn from(s: InventorySession) -> Self {
        Self {
            id: s.id.to_string(),
            location_id: s.location_id.to_string(),
            session_type: s.session_type.as_str().to_string(),
            status: s.status.as_str().to_string(),
            opened_by: s.opened_by.to_string(),
            opened_at: s.opened_at.to_string(),
            closed_by: s.closed_by.map(|u| u.to_string()),
            closed_at: s.closed_at.map(|t| t.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub location_id: LocationId,
    pub session_type: String,
}

/// Opening a session is a staff-level action (§4.10: "staff may add
/// session lines" implies they may also start the count they will add
/// lines to).
pub async fn create_session_handler(
    auth_user: AuthUser,
    State(state): State<SessionsState>,
    Json(req): Json<CreateSessionRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    require_role_at_least(&state.role_repo, auth_user.user_id, req.location_id, Role::Staff).await?;
    let session_type = SessionType::from_str(&req.session_type)?;
    let session = state
        .session_service
        .create_session(req.location_id, session_type, auth_user.user_id)
        .await?;
    Ok(Json(session.into()))
}

#[derive(Debug, Deserialize)]
pub struct JoinParticipantRequest {
    pub location_id: LocationId,
    pub sub_area: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ParticipantResponse {
    pub id: String,
    pub session_id: String,
    pub user_id: String,
    pub sub_area: Option<String>,
}

impl From<SessionParticipant> for ParticipantResponse {
    fn from(p: SessionParticipant) -> Self {
        Self {
            id: p.id.to_string(),
            session_id: p.session_id.to_string(),
            user_id: p.user_id.to_string(),
            sub_area: p.sub_area,
        }
    }
}

pub async fn join_participant_handler(
    auth_user: AuthUser,
    State(state): State<SessionsState>,
    Path(session_id): Path<InventorySessionId>,
    Json(req): Json<JoinParticipantRequest>,
) -> Result<Json<ParticipantResponse>, AppError> {
    require_role_at_least(&state.role_repo, auth_user.user_id, req.location_id, Role::Staff).await?;
    let participant = state
        .session_service
        .join_participant(session_id, auth_user.user_id, req.sub_area)
        .await?;
    Ok(Json(participant.into()))
}

pub async fn list_participants_handler(
    _auth_user: AuthUser,
    State(state): State<SessionsState>,
    Path(session_id): Path<InventorySessionId>,
) -> Result<Json<Vec<ParticipantResponse>>, AppError> {
    let participants = state.session_service.list_participants(session_id).await?;
    Ok(Json(participants.into_iter().map(Into::into).collect()))
}

#[derive(Debug, Deserialize)]
pub struct AddLineRequest {
    pub location_id: LocationId,
    pub inventory_item_id: InventoryItemId,
    pub sub_area: Option<String>,
    pub raw_form: QuantityForm,
}

#[derive(Debug, Serialize)]
pub struct SessionLineResponse {
    pub id: String,
    pub session_id: String,
    pub inventory_item_id: String,
    pub sub_area: Option<String>,
    pub counted_quantity: f64,
    pub counted_by: String,
    pub counted_at: String,
}

impl From<InventorySessionLine> for SessionLineResponse {
    fn from(l: InventorySessionLine) -> Self {
        Self {
            id: l.id.to_string(),
            session_id: l.session_id.to_string(),
            inventory_item_id: l.inventory_item_id.to_string(),
            sub_area: l.sub_area,
            counted_quantity: l.counted_quantity,
            counted_by: l.counted_by.to_string(),
            counted_at: l.counted_at.to_string(),
        }
    }
}

pub async fn add_line_handler(
    auth_user: AuthUser,
    State(state): State<SessionsState>,
    Path(session_id): Path<InventorySessionId>,
    Json(req): Json<AddLineRequest>,
) -> Result<Json<SessionLineResponse>, AppError> {
    require_role_at_least(&state.role_repo, auth_user.user_id, req.location_id, Role::Staff).await?;
    let line = state
        .session_service
        .add_line(AddLineCommand {
            session_id,
            inventory_item_id: req.inventory_item_id,
            sub_area: req.sub_area,
            raw_form: req.raw_form,
            counted_by: auth_user.user_id,
        })
        .await?;
    Ok(Json(line.into()))
}

pub async fn list_lines_handler(
    _auth_user: AuthUser,
    State(state): State<SessionsState>,
    Path(session_id): Path<InventorySessionId>,
) -> Result<Json<Vec<SessionLineResponse>>, AppError> {
    let lines = state.session_service.list_lines(session_id).await?;
    Ok(Json(lines.into_iter().map(Into::into).collect()))
}

#[derive(Debug, Deserialize)]
pub struct AddVarianceReasonRequest {
    pub location_id: LocationId,
    pub inventory_item_id: InventoryItemId,
    pub reason: String,
    pub note: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VarianceReasonResponse {
    pub id: String,
    pub session_id: String,
    pub inventory_item_id: String,
    pub reason: String,
    pub note: Option<String>,
}

impl From<VarianceReasonEntry> for VarianceReasonResponse {
    fn from(e: VarianceReasonEntry) -> Self {
        Self {
            id: e.id.to_string(),
            session_id: e.session_id.to_string(),
            inventory_item_id: e.inventory_item_id.to_string(),
            reason: e.reason.as_str().to_string(),
            note: e.note,
        }
    }
}

pub async fn add_variance_reason_handler(
    auth_user: AuthUser,
    State(state): State<SessionsState>,
    Path(session_id): Path<InventorySessionId>,
    Json(req): Json<AddVarianceReasonRequest>,
) -> Result<Json<VarianceReasonResponse>, AppError> {
    require_role_at_least(&state.role_repo, auth_user.user_id, req.location_id, Role::Staff).await?;
    let reason = VarianceReason::from_str(&req.reason)?;
    let entry = state
        .session_service
        .add_variance_reason(session_id, req.inventory_item_id, reason, req.note, auth_user.user_id)
        .await?;
    Ok(Json(entry.into()))
}

#[derive(Debug, Deserialize)]
pub struct CloseSessionRequest {
    pub location_id: LocationId,
}

/// Closing a session reconciles the count into the ledger (§4.5 step 5),
/// so it sits a tier above adding lines — only a manager may trigger it
/// (§4.10: "manager may close sessions").
pub async fn close_session_handler(
    auth_user: AuthUser,
    State(state): State<SessionsState>,
    Path(session_id): Path<InventorySessionId>,
    Json(req): Json<CloseSessionRequest>,
) -> Result<Json<SessionCloseSummary>, AppError> {
    require_role_at_least(&state.role_repo, auth_user.user_id, req.location_id, Role::Manager).await?;
    let summary = state.session_service.close(session_id, auth_user.user_id).await?;

    state
        .audit_service
        .record(
            auth_user.business_id,
            auth_user.user_id,
            "session.close",
            "inventory_session",
            session_id.to_string(),
            Some(serde_json::json!({ "location_id": req.location_id.to_string() })),
        )
        .await?;

    Ok(Json(summary))
}

/// §6 "A subscription-style endpoint exists for live session updates
/// (server pushes `SessionEvent` records to subscribers until they
/// disconnect)" / §9 "Implemented as a pub/sub channel per session id;
/// subscribers get events until they disconnect. Backpressure: slow
/// subscribers drop."
///
/// Any participant of the location may watch — this is read-only and
/// carries nothing a `staff` counter isn't already entitled to see (the
/// same participant rows and line writes are visible via `GET
/// /sessions/:id/lines`, just without the poll).
pub async fn subscribe_events_handler(
    auth_user: AuthUser,
    State(state): State<SessionsState>,
    Path(session_id): Path<InventorySessionId>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let session = state
        .session_service
        .find_session(session_id)
        .await?
        .ok_or_else(|| AppError::not_found("Session not found"))?;
    require_role_at_least(&state.role_repo, auth_user.user_id, session.location_id, Role::Staff).await?;

    let receiver = state.session_service.events().subscribe(session_id);
    let stream = BroadcastStream::new(receiver).filter_map(|item| match item {
        Ok(event) => serde_json::to_string(&event).ok().map(|json| Ok(Event::default().data(json))),
        // A lagged receiver dropped events (§9 "slow subscribers drop");
        // skip the gap rather than surfacing it as a stream error, since
        // the client can always reconcile against `GET .../lines`.
        Err(BroadcastStreamRecvError::Lagged(_)) => None,
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
