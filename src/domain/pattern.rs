use crate::shared::{InventoryItemId, LocationId};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Direction of a rolling shrinkage-rate comparison (§4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Improving,
    Stable,
    Worsening,
}

/// A computed, point-in-time variance summary for one item at one
/// location over a rolling window — derived data, never persisted as a
/// ledger fact (§3 VarianceSnapshot, §4.8). Produced by
/// `application::pattern_service`, not written through `Append`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarianceSnapshot {
    pub location_id: LocationId,
    pub inventory_item_id: InventoryItemId,
    pub window_start: OffsetDateTime,
    pub window_end: OffsetDateTime,
    pub expected_depletion: f64,
    pub actual_depletion: f64,
    pub variance_pct: f64,
    pub trend: Trend,
}

impl VarianceSnapshot {
    pub fn new(
        location_id: LocationId,
        inventory_item_id: InventoryItemId,
        window_start: OffsetDateTime,
        window_end: OffsetDateTime,
        expected_depletion: f64,
        actual_depletion: f64,
        previous_variance_pct: Option<f64>,
    ) -> Self {
        let variance_pct = if expected_depletion.abs() < f64::EPSILON {
            0.0
        } else {
            (actual_depletion - expected_depletion) / expected_depletion * 100.0
        };

        let trend = match previous_variance_pct {
            None => Trend::Stable,
            Some(prev) if variance_pct.abs() + 1.0 < prev.abs() => Trend::Improving,
            Some(prev) if variance_pct.abs() > prev.abs() + 1.0 => Trend::Worsening,
            Some(_) => Trend::Stable,
        };

        Self {
            location_id,
            inventory_item_id,
            window_start,
            window_end,
            expected_depletion,
            actual_depletion,
            variance_pct,
            trend,
        }
    }

    pub fn exceeds_threshold(&self, threshold_pct: f64) -> bool {
        self.variance_pct.abs() > threshold_pct
    }
}

/// A flagged item whose variance has repeatedly exceeded threshold across
/// consecutive windows — the pattern-detection output that feeds
/// `application::alert_service` (§3 ShrinkageSuspect, §4.8 "repeat
/// offenders").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShrinkageSuspect {
    pub location_id: LocationId,
    pub inventory_item_id: InventoryItemId,
    pub consecutive_windows_over_threshold: u32,
    pub latest_variance_pct: f64,
    pub flagged_at: OffsetDateTime,
}

impl ShrinkageSuspect {
    /// Three consecutive breaches is the line between "noisy count" and
    /// "pattern" per §4.8.
    pub const CONSECUTIVE_WINDOWS_REQUIRED: u32 = 3;

    pub fn is_confirmed(&self) -> bool {
        self.consecutive_windows_over_threshold >= Self::CONSECUTIVE_WINDOWS_REQUIRED
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    #[test]
    fn variance_snapshot_computes_signed_percentage() {
        let now = OffsetDateTime::now_utc();
        let snap = VarianceSnapshot::new(
            LocationId::new(),
            InventoryItemId::new(),
            now - Duration::days(7),
            now,
            100.0,
            112.0,
            None,
        );
        assert!((snap.variance_pct - 12.0).abs() < 1e-9);
        assert!(snap.exceeds_threshold(10.0));
        assert!(!snap.exceeds_threshold(15.0));
    }

    #[test]
    fn shrinkage_suspect_requires_three_consecutive_windows() {
        let suspect = ShrinkageSuspect {
            location_id: LocationId::new(),
            inventory_item_id: InventoryItemId::new(),
            consecutive_windows_over_threshold: 2,
            latest_variance_pct: 18.0,
            flagged_at: OffsetDateTime::now_utc(),
        };
        assert!(!suspect.is_confirmed());
    }
}
