use crate::domain::measurement::Uom;
use crate::shared::{
    AppError, AppResult, InventoryItemId, InventorySessionId, InventorySessionLineId, LocationId,
    SessionParticipantId, UserId, VarianceReasonEntryId,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// §3 InventorySession.session_type — `shift`/`daily`/`weekly`/`monthly`
/// counts touch every active item at the location on their respective
/// cadence; a `spot` count targets a caller-chosen subset (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionType {
    Shift,
    Daily,
    Weekly,
    Monthly,
    Spot,
}

impl SessionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Shift => "shift",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Spot => "spot",
        }
    }

    pub fn from_str(s: &str) -> AppResult<Self> {
        match s {
            "shift" => Ok(Self::Shift),
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "spot" => Ok(Self::Spot),
            _ => Err(AppError::validation(format!("Invalid session type: {s}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Open,
    Closed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }

    pub fn from_str(s: &str) -> AppResult<Self> {
        match s {
            "open" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            _ => Err(AppError::validation(format!("Invalid session status: {s}"))),
        }
    }
}

/// §3 InventorySessionLine.raw_form — the actual form a count was entered
/// in before normalization to base UOM. Kept alongside the normalized
/// `counted_quantity` so a session can be audited or re-derived without
/// losing precision (§4.5 step 2, §9 "raw capture form is sum-typed, not
/// stringly-typed").
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QuantityForm {
    /// Whole/fractional unit count (bottles, cans).
    UnitCount { units: f64 },
    /// Gross weight reading in grams, converted via a `BottleTemplate`.
    WeighedGrams { grams: f64 },
    /// Direct volume reading, already in the item's base UOM.
    Volume { value: f64, uom: Uom },
    /// Keg dipstick/flow estimate expressed as a fraction of a full keg.
    KegFraction { fraction: f64 },
}

impl QuantityForm {
    pub fn validate(&self) -> AppResult<()> {
        let finite_nonneg = |v: f64| v.is_finite() && v >= 0.0;
        let ok = match self {
            Self::UnitCount { units } => finite_nonneg(*units),
            Self::WeighedGrams { grams } => finite_nonneg(*grams),
            Self::Volume { value, .. } => finite_nonneg(*value),
            Self::KegFraction { fraction } => fraction.is_finite() && (0.0..=1.0).contains(fraction),
        };
        if ok {
            Ok(())
        } else {
            Err(AppError::validation("Counted quantity form has an invalid value"))
        }
    }
}

/// One item's count within a session (§3 InventorySessionLine). A count is
/// keyed by `(session, item, sub_area)` rather than just `(session, item)`
/// so two staff counting different storage areas of the same item
/// concurrently don't clobber each other's entry (§4.5 "multiple staff can
/// count concurrently").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventorySessionLine {
    pub id: InventorySessionLineId,
    pub session_id: InventorySessionId,
    pub inventory_item_id: InventoryItemId,
    /// Storage area this count was taken in (e.g. "well", "back bar",
    /// "storeroom"). `None` means the item has a single count for the
    /// whole session.
    pub sub_area: Option<String>,
    pub raw_form: QuantityForm,
    /// The count normalized to the item's base UOM, used by the close
    /// reconciliation step.
    pub counted_quantity: f64,
    pub counted_by: UserId,
    pub counted_at: OffsetDateTime,
}

impl InventorySessionLine {
    pub fn new(
        session_id: InventorySessionId,
        inventory_item_id: InventoryItemId,
        sub_area: Option<String>,
        raw_form: QuantityForm,
        counted_quantity: f64,
        counted_by: UserId,
    ) -> AppResult<Self> {
        raw_form.validate()?;
        if counted_quantity < 0.0 || !counted_quantity.is_finite() {
            return Err(AppError::validation("Normalized counted quantity must be finite and non-negative"));
        }
        Ok(Self {
            id: InventorySessionLineId::new(),
            session_id,
            inventory_item_id,
            sub_area,
            raw_form,
            counted_quantity,
            counted_by,
            counted_at: OffsetDateTime::now_utc(),
        })
    }
}

/// A count session: the unit of work for reconciling physical stock back
/// into the ledger (§3 InventorySession, §4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventorySession {
    pub id: InventorySessionId,
    pub location_id: LocationId,
    pub session_type: SessionType,
    pub status: SessionStatus,
    pub opened_by: UserId,
    pub opened_at: OffsetDateTime,
    pub closed_by: Option<UserId>,
    pub closed_at: Option<OffsetDateTime>,
}

impl InventorySession {
    pub fn open(location_id: LocationId, session_type: SessionType, opened_by: UserId) -> Self {
        Self {
            id: InventorySessionId::new(),
            location_id,
            session_type,
            status: SessionStatus::Open,
            opened_by,
            opened_at: OffsetDateTime::now_utc(),
            closed_by: None,
            closed_at: None,
        }
    }

    /// Invariant: a closed session is immutable and cannot be closed again
    /// (§4.5 step 4, §6 `ERR_SESSION_ALREADY_CLOSED`).
    pub fn close(&mut self, closed_by: UserId) -> AppResult<()> {
        if self.status == SessionStatus::Closed {
            return Err(AppError::SessionAlreadyClosed);
        }
        self.status = SessionStatus::Closed;
        self.closed_by = Some(closed_by);
        self.closed_at = Some(OffsetDateTime::now_utc());
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.status == SessionStatus::Open
    }
}

/// A user who joined a session for concurrent counting (§3
/// SessionParticipant, §4.5 "multiple staff can count concurrently"). A
/// participant is keyed by `(session, user, sub_area)`: the same user can
/// join more than one sub-area of the same session, and rejoining a
/// sub-area refreshes `last_active_ts` rather than creating a duplicate row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionParticipant {
    pub id: SessionParticipantId,
    pub session_id: InventorySessionId,
    pub user_id: UserId,
    pub sub_area: Option<String>,
    pub joined_at: OffsetDateTime,
    pub last_active_ts: OffsetDateTime,
}

impl SessionParticipant {
    pub fn new(session_id: InventorySessionId, user_id: UserId, sub_area: Option<String>) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: SessionParticipantId::new(),
            session_id,
            user_id,
            sub_area,
            joined_at: now,
            last_active_ts: now,
        }
    }
}

/// §3 VarianceReasonEntry.reason — a fixed vocabulary rather than free
/// text, so variance reporting can aggregate by cause (§4.6). `Unknown` is
/// a caller's explicit "no idea"; `SessionExpired` is never chosen by a
/// caller — `application::session_service::auto_close` applies it itself
/// to any item left unexplained when the end-of-day cron closes a
/// forgotten-open session (§4.5 `AutoClose`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VarianceReason {
    WasteFoam,
    Comp,
    StaffDrink,
    Theft,
    Breakage,
    LineCleaning,
    Transfer,
    Unknown,
    SessionExpired,
}

impl VarianceReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WasteFoam => "waste_foam",
            Self::Comp => "comp",
            Self::StaffDrink => "staff_drink",
            Self::Theft => "theft",
            Self::Breakage => "breakage",
            Self::LineCleaning => "line_cleaning",
            Self::Transfer => "transfer",
            Self::Unknown => "unknown",
            Self::SessionExpired => "session_expired",
        }
    }

    pub fn from_str(s: &str) -> AppResult<Self> {
        match s {
            "waste_foam" => Ok(Self::WasteFoam),
            "comp" => Ok(Self::Comp),
            "staff_drink" => Ok(Self::StaffDrink),
            "theft" => Ok(Self::Theft),
            "breakage" => Ok(Self::Breakage),
            "line_cleaning" => Ok(Self::LineCleaning),
            "transfer" => Ok(Self::Transfer),
            "unknown" => Ok(Self::Unknown),
            "session_expired" => Ok(Self::SessionExpired),
            _ => Err(AppError::validation(format!("Invalid variance reason: {s}"))),
        }
    }
}

/// Explains one item's variance once it crosses the configured threshold
/// (§3 VarianceReasonEntry, §4.6, §6 `ERR_VARIANCE_REASONS_REQUIRED`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarianceReasonEntry {
    pub id: VarianceReasonEntryId,
    pub session_id: InventorySessionId,
    pub inventory_item_id: InventoryItemId,
    pub reason: VarianceReason,
    pub note: Option<String>,
    pub entered_by: UserId,
    pub entered_at: OffsetDateTime,
}

impl VarianceReasonEntry {
    pub fn new(
        session_id: InventorySessionId,
        inventory_item_id: InventoryItemId,
        reason: VarianceReason,
        note: Option<String>,
        entered_by: UserId,
    ) -> Self {
        Self {
            id: VarianceReasonEntryId::new(),
            session_id,
            inventory_item_id,
            reason,
            note,
            entered_by,
            entered_at: OffsetDateTime::now_utc(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_cannot_close_twice() {
        let mut session = InventorySession::open(LocationId::new(), SessionType::Daily, UserId::new());
        session.close(UserId::new()).unwrap();
        let err = session.close(UserId::new()).unwrap_err();
        assert!(matches!(err, AppError::SessionAlreadyClosed));
    }

    #[test]
    fn quantity_form_rejects_out_of_range_keg_fraction() {
        assert!(QuantityForm::KegFraction { fraction: 1.5 }.validate().is_err());
        assert!(QuantityForm::KegFraction { fraction: 0.5 }.validate().is_ok());
    }

    #[test]
    fn session_line_rejects_negative_normalized_quantity() {
        let result = InventorySessionLine::new(
            InventorySessionId::new(),
            InventoryItemId::new(),
            None,
            QuantityForm::UnitCount { units: 3.0 },
            -1.0,
            UserId::new(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn open_session_reports_is_open() {
        let session = InventorySession::open(LocationId::new(), SessionType::Spot, UserId::new());
        assert!(session.is_open());
    }
}
