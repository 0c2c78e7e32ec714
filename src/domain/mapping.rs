use crate::domain::ledger::SourceSystem;
use crate::domain::measurement::Uom;
use crate::shared::{
    AppError, AppResult, BusinessId, InventoryItemId, KegInstanceId, LocationId,
    PosItemMappingId, RecipeId, RecipeIngredientId, SalesLineId, TapAssignmentId, TapLineId,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Fractional-sum tolerance for `split_ratio` ingredient weights (§4.2).
const SPLIT_RATIO_EPSILON: f64 = 1e-6;

/// §3 POSItemMapping.mode — the four constructors of one discriminated
/// union (§9 Design Notes: "polymorphic POS mapping -> sum type").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingMode {
    Direct,
    DraftByTap,
    Recipe,
    SplitRatio,
}

impl MappingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::DraftByTap => "draft_by_tap",
            Self::Recipe => "recipe",
            Self::SplitRatio => "split_ratio",
        }
    }

    pub fn from_str(s: &str) -> AppResult<Self> {
        match s {
            "direct" => Ok(Self::Direct),
            "draft_by_tap" => Ok(Self::DraftByTap),
            "recipe" => Ok(Self::Recipe),
            "split_ratio" => Ok(Self::SplitRatio),
            _ => Err(AppError::validation(format!("Invalid mapping mode: {s}"))),
        }
    }
}

/// Maps one POS button to inventory, time-ranged so a remap doesn't lose
/// the history needed to re-derive old ledger entries (§3 POSItemMapping,
/// §4.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PosItemMapping {
    pub id: PosItemMappingId,
    pub location_id: LocationId,
    pub source_system: SourceSystem,
    pub pos_item_id: String,
    pub mode: MappingMode,
    /// `direct` only.
    pub direct_item_id: Option<InventoryItemId>,
    pub pour_oz: Option<f64>,
    /// `draft_by_tap` only.
    pub tap_line_id: Option<TapLineId>,
    /// `recipe` / `split_ratio` only.
    pub recipe_id: Option<RecipeId>,
    pub effective_from_ts: OffsetDateTime,
    pub effective_to_ts: Option<OffsetDateTime>,
}

impl PosItemMapping {
    pub fn direct(
        location_id: LocationId,
        source_system: SourceSystem,
        pos_item_id: String,
        item_id: InventoryItemId,
        pour_oz: f64,
        effective_from_ts: OffsetDateTime,
    ) -> AppResult<Self> {
        if pour_oz <= 0.0 {
            return Err(AppError::validation("Pour size must be positive"));
        }
        Ok(Self {
            id: PosItemMappingId::new(),
            location_id,
            source_system,
            pos_item_id,
            mode: MappingMode::Direct,
            direct_item_id: Some(item_id),
            pour_oz: Some(pour_oz),
            tap_line_id: None,
            recipe_id: None,
            effective_from_ts,
            effective_to_ts: None,
        })
    }

    pub fn draft_by_tap(
        location_id: LocationId,
        source_system: SourceSystem,
        pos_item_id: String,
        tap_line_id: TapLineId,
        pour_oz: f64,
        effective_from_ts: OffsetDateTime,
    ) -> AppResult<Self> {
        if pour_oz <= 0.0 {
            return Err(AppError::validation("Pour size must be positive"));
        }
        Ok(Self {
            id: PosItemMappingId::new(),
            location_id,
            source_system,
            pos_item_id,
            mode: MappingMode::DraftByTap,
            direct_item_id: None,
            pour_oz: Some(pour_oz),
            tap_line_id: Some(tap_line_id),
            recipe_id: None,
            effective_from_ts,
            effective_to_ts: None,
        })
    }

    pub fn recipe(
        location_id: LocationId,
        source_system: SourceSystem,
        pos_item_id: String,
        mode: MappingMode,
        recipe_id: RecipeId,
        effective_from_ts: OffsetDateTime,
    ) -> AppResult<Self> {
        if !matches!(mode, MappingMode::Recipe | MappingMode::SplitRatio) {
            return Err(AppError::validation("mode must be recipe or split_ratio"));
        }
        Ok(Self {
            id: PosItemMappingId::new(),
            location_id,
            source_system,
            pos_item_id,
            mode,
            direct_item_id: None,
            pour_oz: None,
            tap_line_id: None,
            recipe_id: Some(recipe_id),
            effective_from_ts,
            effective_to_ts: None,
        })
    }

    pub fn overlaps(&self, other_from: OffsetDateTime, other_to: Option<OffsetDateTime>) -> bool {
        let self_to = self.effective_to_ts.unwrap_or(OffsetDateTime::UNIX_EPOCH + time::Duration::weeks(520_000));
        let other_to = other_to.unwrap_or(OffsetDateTime::UNIX_EPOCH + time::Duration::weeks(520_000));
        self.effective_from_ts < other_to && other_from < self_to
    }

    pub fn covers(&self, at_ts: OffsetDateTime) -> bool {
        self.effective_from_ts <= at_ts
            && self.effective_to_ts.map(|to| at_ts < to).unwrap_or(true)
    }
}

/// A pourable drink definition. When `is_split_ratio` is true, each
/// "ingredient" is an alternative inventory item carrying a fractional
/// weight rather than an absolute quantity (§3 Recipe, §4.2 Split-ratio).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    pub id: RecipeId,
    pub business_id: BusinessId,
    pub name: String,
    pub is_split_ratio: bool,
}

impl Recipe {
    pub fn new(business_id: BusinessId, name: String, is_split_ratio: bool) -> AppResult<Self> {
        if name.trim().is_empty() {
            return Err(AppError::validation("Recipe name cannot be empty"));
        }
        Ok(Self {
            id: RecipeId::new(),
            business_id,
            name: name.trim().to_string(),
            is_split_ratio,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeIngredient {
    pub id: RecipeIngredientId,
    pub recipe_id: RecipeId,
    pub inventory_item_id: InventoryItemId,
    /// Absolute quantity for ordinary recipes; ignored for split-ratio
    /// recipes in favor of `ratio`.
    pub quantity: f64,
    pub uom: Uom,
    /// Fractional weight for `split_ratio` recipes; `None` otherwise.
    pub ratio: Option<f64>,
}

impl RecipeIngredient {
    pub fn fixed(
        recipe_id: RecipeId,
        inventory_item_id: InventoryItemId,
        quantity: f64,
        uom: Uom,
    ) -> AppResult<Self> {
        if quantity <= 0.0 || !quantity.is_finite() {
            return Err(AppError::validation("Ingredient quantity must be positive and finite"));
        }
        Ok(Self {
            id: RecipeIngredientId::new(),
            recipe_id,
            inventory_item_id,
            quantity,
            uom,
            ratio: None,
        })
    }

    pub fn ratio(
        recipe_id: RecipeId,
        inventory_item_id: InventoryItemId,
        ratio: f64,
        uom: Uom,
    ) -> AppResult<Self> {
        if !(0.0..=1.0).contains(&ratio) {
            return Err(AppError::validation("Ratio must be within [0, 1]"));
        }
        Ok(Self {
            id: RecipeIngredientId::new(),
            recipe_id,
            inventory_item_id,
            quantity: 0.0,
            uom,
            ratio: Some(ratio),
        })
    }
}

/// Validates that a split-ratio recipe's ingredient ratios sum to 1.0
/// within `SPLIT_RATIO_EPSILON` (§4.2).
pub fn validate_split_ratio_sum(ingredients: &[RecipeIngredient]) -> AppResult<()> {
    let sum: f64 = ingredients.iter().filter_map(|i| i.ratio).sum();
    if (sum - 1.0).abs() > SPLIT_RATIO_EPSILON {
        return Err(AppError::validation(format!(
            "split_ratio ingredients must sum to 1.0 (got {sum})"
        )));
    }
    Ok(())
}

/// One normalized POS sale row (§3 SalesLine, §6 sales-line ingest
/// contract). Uniqueness of `(source_system, source_location_id,
/// business_date, receipt_id, line_id)` guarantees idempotent re-ingestion
/// — enforced by the repository's upsert, not here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesLine {
    pub id: SalesLineId,
    pub location_id: LocationId,
    pub source_system: SourceSystem,
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

impl SalesLine {
    pub fn depletes(&self) -> bool {
        !self.is_voided && !self.is_refunded
    }
}

/// A physical draft line (§3 TapLine).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TapLine {
    pub id: TapLineId,
    pub location_id: LocationId,
    pub name: String,
}

/// A specific physical keg, itself an inventory item instance with a
/// starting volume (§3 KegInstance).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KegInstance {
    pub id: KegInstanceId,
    pub location_id: LocationId,
    pub inventory_item_id: InventoryItemId,
    pub starting_volume_ml: f64,
    pub tapped_at: Option<OffsetDateTime>,
}

/// A time-ranged binding of a keg to a tap (§3 TapAssignment). Invariant
/// 4: ranges on the same tap never overlap, and a keg is in at most one
/// active assignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TapAssignment {
    pub id: TapAssignmentId,
    pub tap_line_id: TapLineId,
    pub keg_instance_id: KegInstanceId,
    pub started_ts: OffsetDateTime,
    pub ended_ts: Option<OffsetDateTime>,
}

impl TapAssignment {
    pub fn new(tap_line_id: TapLineId, keg_instance_id: KegInstanceId, started_ts: OffsetDateTime) -> Self {
        Self {
            id: TapAssignmentId::new(),
            tap_line_id,
            keg_instance_id,
            started_ts,
            ended_ts: None,
        }
    }

    pub fn is_active_at(&self, at_ts: OffsetDateTime) -> bool {
        self.started_ts <= at_ts && self.ended_ts.map(|e| at_ts < e).unwrap_or(true)
    }

    /// Invariant 4: two assignments on the same tap must not have
    /// overlapping `[started_ts, ended_ts)` ranges.
    pub fn overlaps(&self, other_start: OffsetDateTime, other_end: Option<OffsetDateTime>) -> bool {
        let far_future = OffsetDateTime::UNIX_EPOCH + time::Duration::weeks(520_000);
        let self_end = self.ended_ts.unwrap_or(far_future);
        let other_end = other_end.unwrap_or(far_future);
        self.started_ts < other_end && other_start < self_end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(offset_secs: i64) -> OffsetDateTime {
        OffsetDateTime::now_utc() + time::Duration::seconds(offset_secs)
    }

    #[test]
    fn tap_assignment_rejects_overlap() {
        let tap = TapLineId::new();
        let keg_a = KegInstanceId::new();
        let keg_b = KegInstanceId::new();
        let mut a = TapAssignment::new(tap, keg_a, ts(0));
        a.ended_ts = Some(ts(1000));
        assert!(a.overlaps(ts(500), Some(ts(1500))));
        assert!(!a.overlaps(ts(1000), Some(ts(2000))));
    }

    #[test]
    fn tap_assignment_active_range_check() {
        let mut a = TapAssignment::new(TapLineId::new(), KegInstanceId::new(), ts(-1000));
        assert!(a.is_active_at(ts(0)));
        a.ended_ts = Some(ts(-1));
        assert!(!a.is_active_at(ts(0)));
    }

    #[test]
    fn split_ratio_sum_must_equal_one() {
        let recipe = RecipeId::new();
        let good = vec![
            RecipeIngredient::ratio(recipe, InventoryItemId::new(), 0.6, Uom::Oz).unwrap(),
            RecipeIngredient::ratio(recipe, InventoryItemId::new(), 0.4, Uom::Oz).unwrap(),
        ];
        assert!(validate_split_ratio_sum(&good).is_ok());

        let bad = vec![
            RecipeIngredient::ratio(recipe, InventoryItemId::new(), 0.6, Uom::Oz).unwrap(),
            RecipeIngredient::ratio(recipe, InventoryItemId::new(), 0.3, Uom::Oz).unwrap(),
        ];
        assert!(validate_split_ratio_sum(&bad).is_err());
    }

    #[test]
    fn sales_line_voided_or_refunded_does_not_deplete() {
        let mut line = SalesLine {
            id: SalesLineId::new(),
            location_id: LocationId::new(),
            source_system: SourceSystem::Toast,
            source_location_id: "loc-1".into(),
            business_date: time::Date::from_calendar_date(2026, time::Month::July, 1).unwrap(),
            sold_at: ts(0),
            receipt_id: "r1".into(),
            line_id: "l1".into(),
            pos_item_id: "pos_jameson_1oz".into(),
            pos_item_name: "Jameson 1oz".into(),
            quantity: 1.0,
            is_voided: false,
            is_refunded: false,
            size_modifier_id: None,
        };
        assert!(line.depletes());
        line.is_voided = true;
        assert!(!line.depletes());
    }

    #[test]
    fn mapping_covers_checks_effective_range() {
        let mapping = PosItemMapping::direct(
            LocationId::new(),
            SourceSystem::Toast,
            "pos_jameson_1oz".into(),
            InventoryItemId::new(),
            1.0,
            ts(-1000),
        )
        .unwrap();
        assert!(mapping.covers(ts(0)));
    }
}
