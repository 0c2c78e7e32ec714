use crate::domain::measurement::Uom;
use crate::domain::money::SignedQuantity;
use crate::shared::{
    AppError, AppResult, ConsumptionEventId, InventoryItemId, InventorySessionId, LocationId,
    RecipeId, SalesLineId,
};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

/// §3 ConsumptionEvent.event_type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    PosSale,
    TapFlow,
    Receiving,
    TransferIn,
    TransferOut,
    ManualAdjustment,
    InventoryCountAdjustment,
    Waste,
}

impl EventType {
    pub fn from_str(s: &str) -> AppResult<Self> {
        match s {
            "pos_sale" => Ok(Self::PosSale),
            "tap_flow" => Ok(Self::TapFlow),
            "receiving" => Ok(Self::Receiving),
            "transfer_in" => Ok(Self::TransferIn),
            "transfer_out" => Ok(Self::TransferOut),
            "manual_adjustment" => Ok(Self::ManualAdjustment),
            "inventory_count_adjustment" => Ok(Self::InventoryCountAdjustment),
            "waste" => Ok(Self::Waste),
            _ => Err(AppError::validation(format!("Invalid event type: {s}"))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PosSale => "pos_sale",
            Self::TapFlow => "tap_flow",
            Self::Receiving => "receiving",
            Self::TransferIn => "transfer_in",
            Self::TransferOut => "transfer_out",
            Self::ManualAdjustment => "manual_adjustment",
            Self::InventoryCountAdjustment => "inventory_count_adjustment",
            Self::Waste => "waste",
        }
    }
}

/// §3 ConsumptionEvent.source_system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceSystem {
    Toast,
    Square,
    Manual,
    Scale,
    TapMeter,
    CsvImport,
    SessionClose,
}

impl SourceSystem {
    pub fn from_str(s: &str) -> AppResult<Self> {
        match s {
            "toast" => Ok(Self::Toast),
            "square" => Ok(Self::Square),
            "manual" => Ok(Self::Manual),
            "scale" => Ok(Self::Scale),
            "tap_meter" => Ok(Self::TapMeter),
            "csv_import" => Ok(Self::CsvImport),
            "session_close" => Ok(Self::SessionClose),
            _ => Err(AppError::validation(format!("Invalid source system: {s}"))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Toast => "toast",
            Self::Square => "square",
            Self::Manual => "manual",
            Self::Scale => "scale",
            Self::TapMeter => "tap_meter",
            Self::CsvImport => "csv_import",
            Self::SessionClose => "session_close",
        }
    }
}

/// §3 ConsumptionEvent.confidence_level / GLOSSARY.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    Estimated,
    Theoretical,
    Measured,
}

impl ConfidenceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Estimated => "estimated",
            Self::Theoretical => "theoretical",
            Self::Measured => "measured",
        }
    }
}

/// How far into the future an `event_ts` may be clamped before `Append`
/// rejects it (§4.1).
pub const FUTURE_SKEW_TOLERANCE: Duration = Duration::minutes(5);

/// The append-only ledger row — the single source of truth for every
/// quantity change to every inventory item (§3 ConsumptionEvent, §4.1).
/// Immutable once written: no UPDATE, no DELETE. Corrections are new
/// entries with an inverse delta (Invariant 1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsumptionEvent {
    pub id: ConsumptionEventId,
    pub location_id: LocationId,
    pub event_ts: OffsetDateTime,
    pub created_ts: OffsetDateTime,
    pub event_type: EventType,
    pub source_system: SourceSystem,
    pub inventory_item_id: InventoryItemId,
    pub quantity_delta: SignedQuantity,
    pub uom: Uom,
    pub confidence_level: ConfidenceLevel,
    pub session_id: Option<InventorySessionId>,
    pub recipe_id: Option<RecipeId>,
    pub sales_line_ref: Option<SalesLineId>,
    pub notes: Option<String>,
    pub variance_reason: Option<String>,
}

impl ConsumptionEvent {
    /// Constructs and validates a new ledger row per §4.1's `Append`
    /// contract: the `(event_type, source_system)` pair must be one this
    /// repo recognizes as legitimate, and `event_ts` may not be more than
    /// `FUTURE_SKEW_TOLERANCE` ahead of now.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        location_id: LocationId,
        event_ts: OffsetDateTime,
        event_type: EventType,
        source_system: SourceSystem,
        inventory_item_id: InventoryItemId,
        quantity_delta: SignedQuantity,
        uom: Uom,
        confidence_level: ConfidenceLevel,
        session_id: Option<InventorySessionId>,
        recipe_id: Option<RecipeId>,
        sales_line_ref: Option<SalesLineId>,
        notes: Option<String>,
        variance_reason: Option<String>,
    ) -> AppResult<Self> {
        validate_event_type_source(event_type, source_system)?;

        let now = OffsetDateTime::now_utc();
        if event_ts > now + FUTURE_SKEW_TOLERANCE {
            return Err(AppError::validation(
                "event_ts is further in the future than the allowed skew tolerance",
            ));
        }

        Ok(Self {
            id: ConsumptionEventId::new(),
            location_id,
            event_ts,
            created_ts: now,
            event_type,
            source_system,
            inventory_item_id,
            quantity_delta,
            uom,
            confidence_level,
            session_id,
            recipe_id,
            sales_line_ref,
            notes,
            variance_reason,
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: ConsumptionEventId,
        location_id: LocationId,
        event_ts: OffsetDateTime,
        created_ts: OffsetDateTime,
        event_type: EventType,
        source_system: SourceSystem,
        inventory_item_id: InventoryItemId,
        quantity_delta: SignedQuantity,
        uom: Uom,
        confidence_level: ConfidenceLevel,
        session_id: Option<InventorySessionId>,
        recipe_id: Option<RecipeId>,
        sales_line_ref: Option<SalesLineId>,
        notes: Option<String>,
        variance_reason: Option<String>,
    ) -> Self {
        Self {
            id,
            location_id,
            event_ts,
            created_ts,
            event_type,
            source_system,
            inventory_item_id,
            quantity_delta,
            uom,
            confidence_level,
            session_id,
            recipe_id,
            sales_line_ref,
            notes,
            variance_reason,
        }
    }

    pub fn is_depletion(&self) -> bool {
        self.quantity_delta.value() < 0.0
    }
}

/// Legitimate `(event_type, source_system)` combinations. Keeping this as
/// an explicit allow-list (rather than trusting every caller) is what lets
/// `Append` refuse a write that would violate the ledger's provenance
/// invariants instead of silently accepting mismatched data (§7 class 3).
fn validate_event_type_source(event_type: EventType, source_system: SourceSystem) -> AppResult<()> {
    use EventType::*;
    use SourceSystem::*;

    let ok = matches!(
        (event_type, source_system),
        (PosSale, Toast)
            | (PosSale, Square)
            | (PosSale, CsvImport)
            | (TapFlow, TapMeter)
            | (Receiving, Manual)
            | (Receiving, CsvImport)
            | (TransferIn, Manual)
            | (TransferOut, Manual)
            | (ManualAdjustment, Manual)
            | (InventoryCountAdjustment, SessionClose)
            | (InventoryCountAdjustment, Scale)
            | (Waste, Manual)
            | (Waste, Scale)
    );

    if ok {
        Ok(())
    } else {
        Err(AppError::validation(format!(
            "event_type {:?} is not valid for source_system {:?}",
            event_type, source_system
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_event(delta: f64) -> AppResult<ConsumptionEvent> {
        ConsumptionEvent::new(
            LocationId::new(),
            OffsetDateTime::now_utc(),
            EventType::PosSale,
            SourceSystem::Toast,
            InventoryItemId::new(),
            SignedQuantity::new(delta).unwrap(),
            Uom::Oz,
            ConfidenceLevel::Theoretical,
            None,
            None,
            None,
            None,
            None,
        )
    }

    #[test]
    fn negative_delta_is_depletion() {
        let event = base_event(-1.5).unwrap();
        assert!(event.is_depletion());
    }

    #[test]
    fn rejects_mismatched_event_source() {
        let result = ConsumptionEvent::new(
            LocationId::new(),
            OffsetDateTime::now_utc(),
            EventType::PosSale,
            SourceSystem::TapMeter,
            InventoryItemId::new(),
            SignedQuantity::new(-1.0).unwrap(),
            Uom::Oz,
            ConfidenceLevel::Theoretical,
            None,
            None,
            None,
            None,
            None,
        );
        assert!(result.is_err());
    }

    #[test]
    fn rejects_event_too_far_in_future() {
        let result = ConsumptionEvent::new(
            LocationId::new(),
            OffsetDateTime::now_utc() + Duration::hours(1),
            EventType::Receiving,
            SourceSystem::Manual,
            InventoryItemId::new(),
            SignedQuantity::new(10.0).unwrap(),
            Uom::Unit,
            ConfidenceLevel::Measured,
            None,
            None,
            None,
            None,
            None,
        );
        assert!(result.is_err());
    }

    #[test]
    fn confidence_ordering_matches_provenance_strength() {
        assert!(ConfidenceLevel::Estimated < ConfidenceLevel::Theoretical);
        assert!(ConfidenceLevel::Theoretical < ConfidenceLevel::Measured);
    }
}
