use crate::application::expected_service::ExpectedService;
use crate::application::ledger_service::{AppendCommand, LedgerService};
use crate::domain::ledger::{ConfidenceLevel, EventType, SourceSystem};
use crate::domain::money::Money;
use crate::domain::par::{ParLevel, PoLine, PoStatus, PurchaseOrder};
use crate::infrastructure::{ParRepository, ParRepositoryTrait};
use crate::shared::{
    AppError, AppResult, InventoryItemId, LocationId, PoLineId, PurchaseOrderId, VendorId,
};
use serde::Serialize;
use std::collections::HashMap;
use time::OffsetDateTime;

/// §4.7 Par / Reorder: per-vendor reorder bundles, and the purchase-order
/// lifecycle that follows from them.
///
/// Orders start `open`; `send` stamps `sent_at` without moving the status
/// off `open` (§3 status set has no separate "sent" state); `record_pickup`
/// recomputes status as `partially_fulfilled` or `closed` from the lines'
/// `quantity_received` against `quantity_ordered`.
#[derive(Clone)]
pub struct ParService {
    par_repo: ParRepository,
    expected_service: ExpectedService,
    ledger_service: LedgerService,
}

impl ParService {
    pub fn new(par_repo: ParRepository, expected_service: ExpectedService, ledger_service: LedgerService) -> Self {
        Self {
            par_repo,
            expected_service,
            ledger_service,
        }
    }

    pub async fn create_par_level(
        &self,
        location_id: LocationId,
        inventory_item_id: InventoryItemId,
        vendor_id: VendorId,
        par_level: f64,
        min_level: f64,
        reorder_qty_override: Option<f64>,
        par_uom: crate::domain::par::ParUom,
        package_size: Option<f64>,
        lead_time_days: f64,
        safety_stock_days: f64,
    ) -> AppResult<ParLevel> {
        let par = ParLevel::new(
            location_id,
            inventory_item_id,
            vendor_id,
            par_level,
            min_level,
            reorder_qty_override,
            par_uom,
            package_size,
            lead_time_days,
            safety_stock_days,
        )?;
        self.par_repo.create_par_level(&par).await?;
        Ok(par)
    }

    /// §4.7 steps 1-6: computes current/velocity per item, suggests an
    /// order quantity where the item is at or below its min level, then
    /// groups non-empty suggestions by vendor.
    pub async fn suggest_reorders(&self, location_id: LocationId) -> AppResult<Vec<VendorReorderBundle>> {
        let par_levels = self.par_repo.list_par_levels_for_location(location_id).await?;
        let now = OffsetDateTime::now_utc();

        let mut by_vendor: HashMap<VendorId, Vec<ReorderSuggestion>> = HashMap::new();
        for par in &par_levels {
            let current = self.expected_service.expected_on_hand(par.inventory_item_id, now).await?;
            let velocity = self.expected_service.avg_daily_depletion(par.inventory_item_id, now).await?;
            let suggested_qty = par.suggested_order_quantity(current, velocity);
            if suggested_qty <= 0.0 {
                continue;
            }
            by_vendor.entry(par.vendor_id).or_default().push(ReorderSuggestion {
                inventory_item_id: par.inventory_item_id,
                current_on_hand: current,
                suggested_qty,
            });
        }

        Ok(by_vendor
            .into_iter()
            .map(|(vendor_id, suggestions)| VendorReorderBundle {
                vendor_id,
                suggestions,
            })
            .collect())
    }

    pub async fn create_purchase_order(
        &self,
        location_id: LocationId,
        vendor_id: VendorId,
        lines: Vec<NewPoLine>,
    ) -> AppResult<(PurchaseOrder, Vec<PoLine>)> {
        if lines.is_empty() {
            return Err(AppError::validation("Purchase order requires at least one line"));
        }
        let po = PurchaseOrder::new(location_id, vendor_id);
        self.par_repo.create_purchase_order(&po).await?;

        let mut created_lines = Vec::with_capacity(lines.len());
        for line in lines {
            let unit_cost = Money::from_cents(line.unit_cost_cents)?;
            let po_line = PoLine::new(po.id, line.inventory_item_id, line.quantity_ordered, line.uom, unit_cost)?;
            self.par_repo.create_po_line(&po_line).await?;
            created_lines.push(po_line);
        }

        Ok((po, created_lines))
    }

    pub async fn send(&self, purchase_order_id: PurchaseOrderId) -> AppResult<PurchaseOrder> {
        let mut po = self.get_purchase_order(purchase_order_id).await?;
        po.mark_sent()?;
        self.par_repo.update_purchase_order(&po).await?;
        Ok(po)
    }

    pub async fn cancel(&self, purchase_order_id: PurchaseOrderId) -> AppResult<PurchaseOrder> {
        let mut po = self.get_purchase_order(purchase_order_id).await?;
        po.transition(PoStatus::Cancelled)?;
        self.par_repo.update_purchase_order(&po).await?;
        Ok(po)
    }

    /// Records a delivery against one or more lines: bumps
    /// `quantity_received`, appends a `receiving` ledger entry per line for
    /// the picked-up quantity, and moves the order to `Received` once
    /// every line is fully received.
    pub async fn record_pickup(
        &self,
        purchase_order_id: PurchaseOrderId,
        receipts: Vec<(PoLineId, f64)>,
    ) -> AppResult<PurchaseOrder> {
        let mut po = self.get_purchase_order(purchase_order_id).await?;
        let mut lines = self.par_repo.list_po_lines(purchase_order_id).await?;

        for (line_id, quantity) in receipts {
            let line = lines
                .iter_mut()
                .find(|l| l.id == line_id)
                .ok_or_else(|| AppError::not_found("Purchase order line not found"))?;
            line.receive(quantity)?;
            self.par_repo.update_po_line(line).await?;

            self.ledger_service
                .append(AppendCommand {
                    location_id: po.location_id,
                    inventory_item_id: line.inventory_item_id,
                    event_type: EventType::Receiving,
                    source_system: SourceSystem::Manual,
                    quantity_delta: quantity,
                    uom: line.uom,
                    confidence_level: ConfidenceLevel::Measured,
                    event_ts: None,
                    session_id: None,
                    recipe_id: None,
                    sales_line_ref: None,
                    notes: Some(format!("receiving against purchase order {}", po.id)),
                    variance_reason: None,
                })
                .await?;
        }

        let fully_received = lines.iter().all(|l| l.is_fully_received());
        po.apply_fulfillment(fully_received)?;
        self.par_repo.update_purchase_order(&po).await?;

        Ok(po)
    }

    pub async fn list_purchase_orders(&self, location_id: LocationId) -> AppResult<Vec<PurchaseOrder>> {
        self.par_repo.list_purchase_orders_for_location(location_id).await
    }

    pub async fn list_po_lines(&self, purchase_order_id: PurchaseOrderId) -> AppResult<Vec<PoLine>> {
        self.par_repo.list_po_lines(purchase_order_id).await
    }

    async fn get_purchase_order(&self, id: PurchaseOrderId) -> AppResult<PurchaseOrder> {
        self.par_repo
            .find_purchase_order(id)
            .await?
            .ok_or_else(|| AppError::not_found("Purchase order not found"))
    }
}

pub struct NewPoLine {
    pub inventory_item_id: InventoryItemId,
    pub quantity_ordered: f64,
    pub uom: crate::domain::measurement::Uom,
    pub unit_cost_cents: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReorderSuggestion {
    pub inventory_item_id: InventoryItemId,
    pub current_on_hand: f64,
    pub suggested_qty: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct VendorReorderBundle {
    pub vendor_id: VendorId,
    pub suggestions: Vec<ReorderSuggestion>,
}
