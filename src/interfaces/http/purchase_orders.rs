use crate::application::{NewPoLine, ParService};
use crate::domain::measurement::Uom;
use crate::domain::par::{PoLine, PurchaseOrder};
use crate::domain::Role;
use crate::infrastructure::{ParRepository, ParRepositoryTrait, RoleRepository};
use crate::interfaces::http::authz::require_role_at_least;
use crate::interfaces::http::middleware::AuthUser;
use crate::shared::{AppError, InventoryItemId, LocationId, PoLineId, PurchaseOrderId, VendorId};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

#[derive(Clone)]
pub struct PurchaseOrdersState {
    pub par_service: ParService,
    pub par_repo: ParRepository,
    pub role_repo: RoleRepository,
}

#[derive(Debug, Serialize)]
pub struct PurchaseOrderResponse {
    pub id: String,
    pub location_id: String,
    pub vendor_id: String,
    pub status: String,
    pub created_at: String,
    pub sent_at: Option<String>,
    pub closed_at: Option<String>,
}

impl From<PurchaseOrder> for PurchaseOrderResponse {
    fn from(po: PurchaseOrder) -> Self {
        Self {
            id: po.id.to_string(),
            location_id: po.location_id.to_string(),
            vendor_id: po.vendor_id.to_string(),
            status: po.status.as_str().to_string(),
            created_at: po.created_at.to_string(),
            sent_at: po.sent_at.map(|t| t.to_string()),
            closed_at: po.closed_at.map(|t| t.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PoLineResponse {
    pub id: String,
    pub purchase_order_id: String,
    pub inventory_item_id: String,
    pub quantity_ordered: f64,
    pub quantity_received: f64,
    pub uom: String,
    pub unit_cost_cents: i64,
}

impl From<PoLine> for PoLineResponse {
    fn from(l: PoLine) -> Self {
        Self {
            id: l.id.to_string(),
            purchase_order_id: l.purchase_order_id.to_string(),
            inventory_item_id: l.inventory_item_id.to_string(),
            quantity_ordered: l.quantity_ordered,
            quantity_received: l.quantity_received,
            uom: l.uom.as_str().to_string(),
            unit_cost_cents: l.unit_cost.as_cents(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct NewPoLineRequest {
    pub inventory_item_id: InventoryItemId,
    pub quantity_ordered: f64,
    pub uom: String,
    pub unit_cost_cents: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreatePurchaseOrderRequest {
    pub location_id: LocationId,
    pub vendor_id: VendorId,
    pub lines: Vec<NewPoLineRequest>,
}

#[derive(Debug, Serialize)]
pub struct PurchaseOrderWithLinesResponse {
    pub purchase_order: PurchaseOrderResponse,
    pub lines: Vec<PoLineResponse>,
}

pub async fn create_purchase_order_handler(
    auth_user: AuthUser,
    State(state): State<PurchaseOrdersState>,
    Json(req): Json<CreatePurchaseOrderRequest>,
) -> Result<Json<PurchaseOrderWithLinesResponse>, AppError> {
    require_role_at_least(&state.role_repo, auth_user.user_id, req.location_id, Role::Manager).await?;
    let mut lines = Vec::with_capacity(req.lines.len());
    for line in req.lines {
        let uom = Uom::from_str(&line.uom)?;
        lines.push(NewPoLine {
            inventory_item_id: line.inventory_item_id,
            quantity_ordered: line.quantity_ordered,
            uom,
            unit_cost_cents: line.unit_cost_cents,
        });
    }
    let (po, po_lines) = state
        .par_service
        .create_purchase_order(req.location_id, req.vendor_id, lines)
        .await?;
    Ok(Json(PurchaseOrderWithLinesResponse {
        purchase_order: po.into(),
        lines: po_lines.into_iter().map(Into::into).collect(),
    }))
}

async fn require_manager_for_po(
    state: &PurchaseOrdersState,
    auth_user: &AuthUser,
    purchase_order_id: PurchaseOrderId,
) -> Result<PurchaseOrder, AppError> {
    let po = state
        .par_repo
        .find_purchase_order(purchase_order_id)
        .await?
        .ok_or_else(|| AppError::not_found("Purchase order not found"))?;
    require_role_at_least(&state.role_repo, auth_user.user_id, po.location_id, Role::Manager).await?;
    Ok(po)
}

pub async fn send_purchase_order_handler(
    auth_user: AuthUser,
    State(state): State<PurchaseOrdersState>,
    Path(purchase_order_id): Path<PurchaseOrderId>,
) -> Result<Json<PurchaseOrderResponse>, AppError> {
    require_manager_for_po(&state, &auth_user, purchase_order_id).await?;
    let po = state.par_service.send(purchase_order_id).await?;
    Ok(Json(po.into()))
}

pub async fn cancel_purchase_order_handler(
    auth_user: AuthUser,
    State(state): State<PurchaseOrdersState>,
    Path(purchase_order_id): Path<PurchaseOrderId>,
) -> Result<Json<PurchaseOrderResponse>, AppError> {
    require_manager_for_po(&state, &auth_user, purchase_order_id).await?;
    let po = state.par_service.cancel(purchase_order_id).await?;
    Ok(Json(po.into()))
}

#[derive(Debug, Deserialize)]
pub struct RecordPickupRequest {
    pub receipts: Vec<PickupReceipt>,
}

#[derive(Debug, Deserialize)]
pub struct PickupReceipt {
    pub po_line_id: PoLineId,
    pub quantity: f64,
}

pub async fn record_pickup_handler(
    auth_user: AuthUser,
    State(state): State<PurchaseOrdersState>,
    Path(purchase_order_id): Path<PurchaseOrderId>,
    Json(req): Json<RecordPickupRequest>,
) -> Result<Json<PurchaseOrderResponse>, AppError> {
    require_manager_for_po(&state, &auth_user, purchase_order_id).await?;
    let receipts = req.receipts.into_iter().map(|r| (r.po_line_id, r.quantity)).collect();
    let po = state.par_service.record_pickup(purchase_order_id, receipts).await?;
    Ok(Json(po.into()))
}

#[derive(Debug, Deserialize)]
pub struct ListPurchaseOrdersQuery {
    pub location_id: LocationId,
}

pub async fn list_purchase_orders_handler(
    auth_user: AuthUser,
    State(state): State<PurchaseOrdersState>,
    Query(query): Query<ListPurchaseOrdersQuery>,
) -> Result<Json<Vec<PurchaseOrderResponse>>, AppError> {
    require_role_at_least(&state.role_repo, auth_user.user_id, query.location_id, Role::Staff).await?;
    let pos = state.par_service.list_purchase_orders(query.location_id).await?;
    Ok(Json(pos.into_iter().map(Into::into).collect()))
}

pub async fn list_po_lines_handler(
    auth_user: AuthUser,
    State(state): State<PurchaseOrdersState>,
    Path(purchase_order_id): Path<PurchaseOrderId>,
) -> Result<Json<Vec<PoLineResponse>>, AppError> {
    let po = state
        .par_repo
        .find_purchase_order(purchase_order_id)
        .await?
        .ok_or_else(|| AppError::not_found("Purchase order not found"))?;
    require_role_at_least(&state.role_repo, auth_user.user_id, po.location_id, Role::Staff).await?;
    let lines = state.par_service.list_po_lines(purchase_order_id).await?;
    Ok(Json(lines.into_iter().map(Into::into).collect()))
}
