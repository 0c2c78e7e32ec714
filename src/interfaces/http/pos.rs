use crate::application::{AuditService, DepletionService};
use crate::domain::ledger::SourceSystem;
use crate::domain::mapping::SalesLine;
use crate::domain::Role;
use crate::infrastructure::RoleRepository;
use crate::interfaces::http::authz::require_role_at_least;
use crate::interfaces::http::middleware::AuthUser;
use crate::shared::{AppError, InventoryItemId, LocationId, SalesLineId, TapLineId};
use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Clone)]
pub struct PosState {
    pub depletion_service: DepletionService,
    pub role_repo: RoleRepository,
    pub audit_service: AuditService,
}

#[derive(Debug, Deserialize)]
pub struct IngestSalesLineRequest {
    pub location_id: LocationId,
    pub source_system: String,
    pub source_location_id: String,
    pub business_date: time::Date,
    pub sold_at: OffsetDateTime,
    pub receipt_id: String,
    pub line_id: String,
    pub pos_item_id: String,
    pub pos_item_name: String,
    pub quantity: f64,
    pub is_voided: bool,
    pub is_refunded: bool,
    pub size_modifier_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SalesLineResponse {
    pub id: String,
    pub receipt_id: String,
    pub line_id: String,
    pub pos_item_id: String,
}

impl From<SalesLine> for SalesLineResponse {
    fn from(l: SalesLine) -> Self {
        Self {
            id: l.id.to_string(),
            receipt_id: l.receipt_id,
            line_id: l.line_id,
            pos_item_id: l.pos_item_id,
        }
    }
}

fn into_domain(req: IngestSalesLineRequest) -> Result<SalesLine, AppError> {
    let source_system = SourceSystem::from_str(&req.source_system)?;
    Ok(SalesLine {
        id: SalesLineId::new(),
        location_id: req.location_id,
        source_system,
        source_location_id: req.source_location_id,
        business_date: req.business_date,
        sold_at: req.sold_at,
        receipt_id: req.receipt_id,
        line_id: req.line_id,
        pos_item_id: req.pos_item_id,
        pos_item_name: req.pos_item_name,
        quantity: req.quantity,
        is_voided: req.is_voided,
        is_refunded: req.is_refunded,
        size_modifier_id: req.size_modifier_id,
    })
}

/// §6 sales-line ingest contract: idempotent upsert keyed on
/// `(source_system, source_location_id, business_date, receipt_id,
/// line_id)`, enforced by the repository rather than here.
pub async fn ingest_sales_line_handler(
    auth_user: AuthUser,
    State(state): State<PosState>,
    Json(req): Json<IngestSalesLineRequest>,
) -> Result<Json<SalesLineResponse>, AppError> {
    require_role_at_least(&state.role_repo, auth_user.user_id, req.location_id, Role::Manager).await?;
    let line = into_domain(req)?;
    let saved = state.depletion_service.ingest_sales_line(line).await?;
    Ok(Json(saved.into()))
}

/// Bulk CSV-import path (§6): a POS export lands as an array of the same
/// rows the single-line endpoint accepts, ingested one at a time so a bad
/// row in the middle of a file doesn't roll back the rows before it.
pub async fn import_sales_lines_handler(
    auth_user: AuthUser,
    State(state): State<PosState>,
    Json(reqs): Json<Vec<IngestSalesLineRequest>>,
) -> Result<Json<CsvImportSummary>, AppError> {
    let mut summary = CsvImportSummary::default();
    for req in reqs {
        require_role_at_least(&state.role_repo, auth_user.user_id, req.location_id, Role::Manager).await?;
        let line = match into_domain(req) {
            Ok(l) => l,
            Err(_) => {
                summary.rejected += 1;
                continue;
            }
        };
        match state.depletion_service.ingest_sales_line(line).await {
            Ok(_) => summary.ingested += 1,
            Err(_) => summary.rejected += 1,
        }
    }
    Ok(Json(summary))
}

#[derive(Debug, Default, Serialize)]
pub struct CsvImportSummary {
    pub ingested: usize,
    pub rejected: usize,
}

#[derive(Debug, Deserialize)]
pub struct TapMeterReadingRequest {
    pub location_id: LocationId,
    pub tap_line_id: TapLineId,
    pub at_ts: Option<OffsetDateTime>,
    pub volume_ml_delta: f64,
}

pub async fn ingest_tap_meter_reading_handler(
    auth_user: AuthUser,
    State(state): State<PosState>,
    Json(req): Json<TapMeterReadingRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    require_role_at_least(&state.role_repo, auth_user.user_id, req.location_id, Role::Manager).await?;
    let event_id = state
        .depletion_service
        .ingest_tap_meter_reading(
            req.location_id,
            req.tap_line_id,
            req.at_ts.unwrap_or_else(OffsetDateTime::now_utc),
            req.volume_ml_delta,
        )
        .await?;
    Ok(Json(serde_json::json!({ "consumption_event_id": event_id.to_string() })))
}

#[derive(Debug, Deserialize)]
pub struct RunDepletionPassRequest {
    pub from_ts: OffsetDateTime,
    pub to_ts: OffsetDateTime,
}

pub async fn run_depletion_pass_handler(
    auth_user: AuthUser,
    State(state): State<PosState>,
    Path(location_id): Path<LocationId>,
    Json(req): Json<RunDepletionPassRequest>,
) -> Result<Json<crate::application::DepletionPassSummary>, AppError> {
    require_role_at_least(&state.role_repo, auth_user.user_id, location_id, Role::Manager).await?;
    let summary = state
        .depletion_service
        .run_depletion_pass(auth_user.business_id, location_id, req.from_ts, req.to_ts)
        .await?;
    Ok(Json(summary))
}

#[derive(Debug, Deserialize)]
pub struct ManualDepletionRequest {
    pub location_id: LocationId,
    pub inventory_item_id: InventoryItemId,
    pub quantity: f64,
    pub uom: String,
}

pub async fn append_manual_depletion_handler(
    auth_user: AuthUser,
    State(state): State<PosState>,
    Json(req): Json<ManualDepletionRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    require_role_at_least(&state.role_repo, auth_user.user_id, req.location_id, Role::Manager).await?;
    let uom = crate::domain::measurement::Uom::from_str(&req.uom)?;
    let event_id = state
        .depletion_service
        .append_manual_depletion(req.location_id, req.inventory_item_id, req.quantity, uom)
        .await?;

    state
        .audit_service
        .record(
            auth_user.business_id,
            auth_user.user_id,
            "ledger.manual_adjustment",
            "inventory_item",
            req.inventory_item_id.to_string(),
            Some(serde_json::json!({
                "location_id": req.location_id.to_string(),
                "quantity": req.quantity,
                "uom": req.uom,
            })),
        )
        .await?;

    Ok(Json(serde_json::json!({ "consumption_event_id": event_id.to_string() })))
}
