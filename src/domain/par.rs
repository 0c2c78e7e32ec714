use crate::domain::money::Money;
use crate::shared::{
    AppError, AppResult, InventoryItemId, LocationId, PoLineId, PurchaseOrderId, VendorId,
    ParLevelId,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// §3 ParLevel.par_uom — whether `reorder_qty` rounds to whole base-UOM
/// units or to whole vendor packages (§4.7 step 5, §9 Open Question on
/// package rounding).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParUom {
    Unit,
    Package,
}

impl ParUom {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unit => "unit",
            Self::Package => "package",
        }
    }

    pub fn from_str(s: &str) -> AppResult<Self> {
        match s {
            "unit" => Ok(Self::Unit),
            "package" => Ok(Self::Package),
            _ => Err(AppError::validation(format!("Invalid par_uom: {s}"))),
        }
    }
}

/// Target stock level per item per location (§3 ParLevel, §4.7). Drives
/// vendor-grouped reorder suggestions once expected on-hand drops to or
/// below `min_level`, sized to cover consumption through the next
/// delivery (`lead_time_days` + `safety_stock_days`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParLevel {
    pub id: ParLevelId,
    pub location_id: LocationId,
    pub inventory_item_id: InventoryItemId,
    pub vendor_id: VendorId,
    pub par_level: f64,
    pub min_level: f64,
    /// Caller-supplied floor on the suggested order quantity; `None` lets
    /// the computed `target - current` stand on its own (§4.7 step 5).
    pub reorder_qty_override: Option<f64>,
    pub par_uom: ParUom,
    /// Size of one package when `par_uom = Package` (e.g. a case of 12).
    pub package_size: Option<f64>,
    pub lead_time_days: f64,
    pub safety_stock_days: f64,
}

impl ParLevel {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        location_id: LocationId,
        inventory_item_id: InventoryItemId,
        vendor_id: VendorId,
        par_level: f64,
        min_level: f64,
        reorder_qty_override: Option<f64>,
        par_uom: ParUom,
        package_size: Option<f64>,
        lead_time_days: f64,
        safety_stock_days: f64,
    ) -> AppResult<Self> {
        if par_level < 0.0 || min_level < 0.0 {
            return Err(AppError::validation("Par quantities cannot be negative"));
        }
        if min_level > par_level {
            return Err(AppError::validation("min_level cannot exceed par_level"));
        }
        if lead_time_days < 0.0 || safety_stock_days < 0.0 {
            return Err(AppError::validation("Lead time and safety stock must be non-negative"));
        }
        if par_uom == ParUom::Package && package_size.is_none_or(|s| s <= 0.0) {
            return Err(AppError::validation("Package par_uom requires a positive package_size"));
        }
        Ok(Self {
            id: ParLevelId::new(),
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
        })
    }

    pub fn needs_reorder(&self, on_hand: f64) -> bool {
        on_hand <= self.min_level
    }

    /// §4.7 steps 3-5: `target = par_level + velocity * (lead_time +
    /// safety_stock)`; the suggestion is the larger of the override floor
    /// and `target - current`, then rounded up to a whole unit or package.
    pub fn suggested_order_quantity(&self, on_hand: f64, daily_velocity: f64) -> f64 {
        if !self.needs_reorder(on_hand) {
            return 0.0;
        }
        let needed_by_arrival = daily_velocity.max(0.0) * (self.lead_time_days + self.safety_stock_days);
        let target = self.par_level + needed_by_arrival;
        let raw = (target - on_hand).max(self.reorder_qty_override.unwrap_or(0.0));
        self.round_up_to_uom(raw)
    }

    fn round_up_to_uom(&self, raw: f64) -> f64 {
        if raw <= 0.0 {
            return 0.0;
        }
        match self.par_uom {
            ParUom::Unit => raw.ceil(),
            ParUom::Package => {
                let size = self.package_size.unwrap_or(1.0);
                (raw / size).ceil() * size
            }
        }
    }
}

/// §3 PurchaseOrder.status lifecycle: orders start `open`, `recordPickup`
/// moves them to `partially_fulfilled` or `closed` depending on how much of
/// each line has been received, and `open`/`partially_fulfilled` orders may
/// be cancelled (§4.7 step 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoStatus {
    Open,
    PartiallyFulfilled,
    Closed,
    Cancelled,
}

impl PoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::PartiallyFulfilled => "partially_fulfilled",
            Self::Closed => "closed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> AppResult<Self> {
        match s {
            "open" => Ok(Self::Open),
            "partially_fulfilled" => Ok(Self::PartiallyFulfilled),
            "closed" => Ok(Self::Closed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(AppError::validation(format!("Invalid purchase order status: {s}"))),
        }
    }

    fn can_transition_to(self, next: PoStatus) -> bool {
        matches!(
            (self, next),
            (PoStatus::Open, PoStatus::PartiallyFulfilled)
                | (PoStatus::Open, PoStatus::Closed)
                | (PoStatus::Open, PoStatus::Cancelled)
                | (PoStatus::PartiallyFulfilled, PoStatus::Closed)
                | (PoStatus::PartiallyFulfilled, PoStatus::Cancelled)
        )
    }
}

/// A vendor order, generated manually or suggested from par levels (§3
/// PurchaseOrder).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseOrder {
    pub id: PurchaseOrderId,
    pub location_id: LocationId,
    pub vendor_id: VendorId,
    pub status: PoStatus,
    pub created_at: OffsetDateTime,
    /// When the order was transmitted to the vendor. Independent of
    /// `status`: sending an order doesn't by itself move it off `open`,
    /// only receipt progress does.
    pub sent_at: Option<OffsetDateTime>,
    pub closed_at: Option<OffsetDateTime>,
}

impl PurchaseOrder {
    pub fn new(location_id: LocationId, vendor_id: VendorId) -> Self {
        Self {
            id: PurchaseOrderId::new(),
            location_id,
            vendor_id,
            status: PoStatus::Open,
            created_at: OffsetDateTime::now_utc(),
            sent_at: None,
            closed_at: None,
        }
    }

    pub fn mark_sent(&mut self) -> AppResult<()> {
        if self.status == PoStatus::Cancelled {
            return Err(AppError::precondition_failed("Cannot send a cancelled purchase order"));
        }
        if self.sent_at.is_some() {
            return Err(AppError::precondition_failed("Purchase order already sent"));
        }
        self.sent_at = Some(OffsetDateTime::now_utc());
        Ok(())
    }

    pub fn transition(&mut self, next: PoStatus) -> AppResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(AppError::precondition_failed(format!(
                "Cannot move purchase order from {:?} to {:?}",
                self.status, next
            )));
        }
        if next == PoStatus::Closed {
            self.closed_at = Some(OffsetDateTime::now_utc());
        }
        self.status = next;
        Ok(())
    }

    /// Recomputes status after a pickup is recorded against this order's
    /// lines (§4.7: "transitions to `partially_fulfilled` or `closed`").
    /// A no-op once the order is already in the target state.
    pub fn apply_fulfillment(&mut self, fully_received: bool) -> AppResult<()> {
        let next = if fully_received { PoStatus::Closed } else { PoStatus::PartiallyFulfilled };
        if next == self.status {
            return Ok(());
        }
        self.transition(next)
    }
}

/// One item line within a purchase order (§3 POLine).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoLine {
    pub id: PoLineId,
    pub purchase_order_id: PurchaseOrderId,
    pub inventory_item_id: InventoryItemId,
    pub quantity_ordered: f64,
    pub quantity_received: f64,
    pub uom: crate::domain::measurement::Uom,
    pub unit_cost: Money,
}

impl PoLine {
    pub fn new(
        purchase_order_id: PurchaseOrderId,
        inventory_item_id: InventoryItemId,
        quantity_ordered: f64,
        uom: crate::domain::measurement::Uom,
        unit_cost: Money,
    ) -> AppResult<Self> {
        if quantity_ordered <= 0.0 || !quantity_ordered.is_finite() {
            return Err(AppError::validation("Ordered quantity must be positive and finite"));
        }
        Ok(Self {
            id: PoLineId::new(),
            purchase_order_id,
            inventory_item_id,
            quantity_ordered,
            quantity_received: 0.0,
            uom,
            unit_cost,
        })
    }

    pub fn receive(&mut self, quantity: f64) -> AppResult<()> {
        if quantity <= 0.0 || !quantity.is_finite() {
            return Err(AppError::validation("Received quantity must be positive and finite"));
        }
        self.quantity_received += quantity;
        Ok(())
    }

    pub fn is_fully_received(&self) -> bool {
        self.quantity_received >= self.quantity_ordered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn par_level_flags_reorder_at_or_below_point() {
        let par = ParLevel::new(
            LocationId::new(),
            InventoryItemId::new(),
            VendorId::new(),
            10.0,
            3.0,
            None,
            ParUom::Unit,
            None,
            0.0,
            0.0,
        )
        .unwrap();
        assert!(par.needs_reorder(3.0));
        assert!(par.needs_reorder(2.0));
        assert!(!par.needs_reorder(4.0));
        assert_eq!(par.suggested_order_quantity(2.0, 0.0), 8.0);
    }

    #[test]
    fn par_level_rejects_min_above_par() {
        assert!(ParLevel::new(
            LocationId::new(),
            InventoryItemId::new(),
            VendorId::new(),
            5.0,
            10.0,
            None,
            ParUom::Unit,
            None,
            0.0,
            0.0,
        )
        .is_err());
    }

    /// §8 Scenario F: par=24, min=6, lead_time=2, safety=1, velocity=4/day,
    /// current=5 -> ceil((24 + 4*3) - 5) = 31.
    #[test]
    fn scenario_f_par_suggestion_matches_worked_example() {
        let par = ParLevel::new(
            LocationId::new(),
            InventoryItemId::new(),
            VendorId::new(),
            24.0,
            6.0,
            None,
            ParUom::Unit,
            None,
            2.0,
            1.0,
        )
        .unwrap();
        assert!(par.needs_reorder(5.0));
        assert_eq!(par.suggested_order_quantity(5.0, 4.0), 31.0);
    }

    #[test]
    fn package_rounding_rounds_up_to_whole_packages() {
        let par = ParLevel::new(
            LocationId::new(),
            InventoryItemId::new(),
            VendorId::new(),
            24.0,
            6.0,
            None,
            ParUom::Package,
            Some(12.0),
            2.0,
            1.0,
        )
        .unwrap();
        // Same raw need as above (31), rounded up to the next full case of 12 -> 36.
        assert_eq!(par.suggested_order_quantity(5.0, 4.0), 36.0);
    }

    #[test]
    fn purchase_order_follows_legal_transitions() {
        let mut po = PurchaseOrder::new(LocationId::new(), VendorId::new());
        assert_eq!(po.status, PoStatus::Open);
        po.mark_sent().unwrap();
        assert!(po.mark_sent().is_err());
        po.transition(PoStatus::PartiallyFulfilled).unwrap();
        po.transition(PoStatus::Closed).unwrap();
        assert!(po.transition(PoStatus::Cancelled).is_err());
    }

    #[test]
    fn apply_fulfillment_tracks_partial_then_full_receipt() {
        let mut po = PurchaseOrder::new(LocationId::new(), VendorId::new());
        po.apply_fulfillment(false).unwrap();
        assert_eq!(po.status, PoStatus::PartiallyFulfilled);
        assert!(po.closed_at.is_none());
        po.apply_fulfillment(true).unwrap();
        assert_eq!(po.status, PoStatus::Closed);
        assert!(po.closed_at.is_some());
    }

    #[test]
    fn apply_fulfillment_can_close_directly_from_open() {
        let mut po = PurchaseOrder::new(LocationId::new(), VendorId::new());
        po.apply_fulfillment(true).unwrap();
        assert_eq!(po.status, PoStatus::Closed);
    }

    #[test]
    fn po_line_tracks_partial_receipt() {
        let mut line = PoLine::new(
            PurchaseOrderId::new(),
            InventoryItemId::new(),
            10.0,
            crate::domain::measurement::Uom::Unit,
            Money::from_cents(500).unwrap(),
        )
        .unwrap();
        line.receive(4.0).unwrap();
        assert!(!line.is_fully_received());
        line.receive(6.0).unwrap();
        assert!(line.is_fully_received());
    }
}
