use crate::domain::pattern::{ShrinkageSuspect, Trend, VarianceSnapshot};
use crate::infrastructure::{
    CatalogRepository, CatalogRepositoryTrait, LedgerRepository, LedgerRepositoryTrait,
};
use crate::shared::{AppResult, InventoryItemId, LocationId};
use time::{Duration, OffsetDateTime};

/// §4.8 Pattern Detector: derives rolling `VarianceSnapshot`s from ledger
/// history and flags items whose variance has exceeded threshold for
/// `ShrinkageSuspect::CONSECUTIVE_WINDOWS_REQUIRED` windows running. Pure
/// read path — it never writes through `Append`; its output feeds
/// `application::alert_service`.
#[derive(Clone)]
pub struct PatternService {
    ledger_repo: LedgerRepository,
    catalog_repo: CatalogRepository,
}

/// Width of one rolling comparison window (§4.8 "week-over-week").
const WINDOW: Duration = Duration::days(7);

impl PatternService {
    pub fn new(ledger_repo: LedgerRepository, catalog_repo: CatalogRepository) -> Self {
        Self {
            ledger_repo,
            catalog_repo,
        }
    }

    /// Computes one item's current-window snapshot against the prior
    /// window, using the prior-prior window's variance as the trend
    /// baseline (§3 VarianceSnapshot.trend).
    pub async fn snapshot_for_item(
        &self,
        location_id: LocationId,
        item: InventoryItemId,
        now: OffsetDateTime,
    ) -> AppResult<VarianceSnapshot> {
        let window_start = now - WINDOW;
        let prev_window_start = window_start - WINDOW;

        let actual_depletion = self.depleted_volume(item, window_start, now).await?;
        let prev_actual = self.depleted_volume(item, prev_window_start, window_start).await?;

        // Expected depletion is this item's trailing average daily rate,
        // applied across the current window — the same velocity measure
        // `application::expected_service` uses for days-to-stockout.
        let expected_depletion = self
            .ledger_repo
            .avg_daily_depletion(item, prev_window_start, window_start)
            .await?
            .abs()
            * WINDOW.whole_days() as f64;

        let previous_variance_pct = if expected_depletion.abs() < f64::EPSILON {
            None
        } else {
            Some((prev_actual - expected_depletion) / expected_depletion * 100.0)
        };

        Ok(VarianceSnapshot::new(
            location_id,
            item,
            window_start,
            now,
            expected_depletion,
            actual_depletion,
            previous_variance_pct,
        ))
    }

    /// Snapshots every active item at a location (§4.8 runs as a scheduled
    /// sweep, one item's history shouldn't block another's).
    pub async fn snapshot_location(
        &self,
        location_id: LocationId,
        now: OffsetDateTime,
    ) -> AppResult<Vec<VarianceSnapshot>> {
        let items = self.catalog_repo.list_items_for_location(location_id).await?;
        let mut snapshots = Vec::with_capacity(items.len());
        for item in items.iter().filter(|i| i.active) {
            snapshots.push(self.snapshot_for_item(location_id, item.id, now).await?);
        }
        Ok(snapshots)
    }

    /// §4.8: an item crossing `threshold_pct` for
    /// `ShrinkageSuspect::CONSECUTIVE_WINDOWS_REQUIRED` consecutive
    /// trailing windows is a confirmed shrinkage suspect, not just a noisy
    /// count. Walks backward one window at a time and stops counting at
    /// the first window under threshold.
    pub async fn shrinkage_suspect(
        &self,
        location_id: LocationId,
        item: InventoryItemId,
        threshold_pct: f64,
        now: OffsetDateTime,
    ) -> AppResult<ShrinkageSuspect> {
        let mut consecutive = 0u32;
        let mut latest_variance_pct = 0.0;
        let mut window_end = now;

        for i in 0..ShrinkageSuspect::CONSECUTIVE_WINDOWS_REQUIRED + 1 {
            let snapshot = self.snapshot_for_item(location_id, item, window_end).await?;
            if i == 0 {
                latest_variance_pct = snapshot.variance_pct;
            }
            if !snapshot.exceeds_threshold(threshold_pct) {
                break;
            }
            consecutive += 1;
            window_end -= WINDOW;
        }

        Ok(ShrinkageSuspect {
            location_id,
            inventory_item_id: item,
            consecutive_windows_over_threshold: consecutive,
            latest_variance_pct,
            flagged_at: now,
        })
    }

    pub async fn confirmed_shrinkage_suspects(
        &self,
        location_id: LocationId,
        threshold_pct: f64,
        now: OffsetDateTime,
    ) -> AppResult<Vec<ShrinkageSuspect>> {
        let items = self.catalog_repo.list_items_for_location(location_id).await?;
        let mut confirmed = Vec::new();
        for item in items.iter().filter(|i| i.active) {
            let suspect = self.shrinkage_suspect(location_id, item.id, threshold_pct, now).await?;
            if suspect.is_confirmed() {
                confirmed.push(suspect);
            }
        }
        Ok(confirmed)
    }

    async fn depleted_volume(
        &self,
        item: InventoryItemId,
        from: OffsetDateTime,
        to: OffsetDateTime,
    ) -> AppResult<f64> {
        let events = self.ledger_repo.query(item, from, to).await?;
        Ok(events
            .iter()
            .filter(|e| e.is_depletion())
            .map(|e| -e.quantity_delta.value())
            .sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::pattern::VarianceSnapshot as Snapshot;

    /// Mirrors the domain-level expectation that improving variance is
    /// classified relative to the prior window's magnitude, not its sign
    /// (§3 VarianceSnapshot.trend, §4.8).
    #[test]
    fn trend_classification_prefers_magnitude_drop() {
        let now = OffsetDateTime::now_utc();
        let snap = Snapshot::new(
            LocationId::new(),
            InventoryItemId::new(),
            now - Duration::days(7),
            now,
            100.0,
            104.0,
            Some(20.0),
        );
        assert_eq!(snap.trend, Trend::Improving);
    }

    #[test]
    fn shrinkage_suspect_not_confirmed_below_three_windows() {
        let suspect = ShrinkageSuspect {
            location_id: LocationId::new(),
            inventory_item_id: InventoryItemId::new(),
            consecutive_windows_over_threshold: 2,
            latest_variance_pct: 30.0,
            flagged_at: OffsetDateTime::now_utc(),
        };
        assert!(!suspect.is_confirmed());
    }
}
