use crate::infrastructure::{LedgerRepository, LedgerRepositoryTrait};
use crate::shared::{AppResult, InventoryItemId};
use serde::Serialize;
use time::{Duration, OffsetDateTime};

/// §4.6 Expected On-Hand. A count adjustment's delta is defined as
/// `counted - expected_at_close`, so the running ledger sum already
/// equals `expected(I, T)` at every point in its history — there is no
/// separate baseline value to track, only a baseline *timestamp* for
/// confidence scoring.
#[derive(Clone)]
pub struct ExpectedService {
    ledger_repo: LedgerRepository,
}

const VELOCITY_WINDOW: Duration = Duration::days(14);

impl ExpectedService {
    pub fn new(ledger_repo: LedgerRepository) -> Self {
        Self { ledger_repo }
    }

    pub async fn expected_on_hand(&self, item: InventoryItemId, at: OffsetDateTime) -> AppResult<f64> {
        self.ledger_repo
            .sum_signed_delta(item, OffsetDateTime::UNIX_EPOCH, at)
            .await
    }

    pub async fn avg_daily_depletion(&self, item: InventoryItemId, now: OffsetDateTime) -> AppResult<f64> {
        self.ledger_repo
            .avg_daily_depletion(item, now - VELOCITY_WINDOW, now)
            .await
    }

    pub async fn days_to_stockout(&self, item: InventoryItemId, now: OffsetDateTime) -> AppResult<f64> {
        let expected = self.expected_on_hand(item, now).await?;
        let velocity = self.avg_daily_depletion(item, now).await?;
        if velocity <= 0.0 {
            return Ok(f64::INFINITY);
        }
        Ok((expected / velocity).max(0.0))
    }

    pub async fn confidence(&self, item: InventoryItemId, now: OffsetDateTime) -> AppResult<Confidence> {
        let expected = self.expected_on_hand(item, now).await?;
        if expected < 0.0 {
            return Ok(Confidence::Low);
        }

        let last_count = self.ledger_repo.last_count_ts(item, now).await?;
        let Some(last_count_ts) = last_count else {
            return Ok(Confidence::Low);
        };
        let age = now - last_count_ts;

        if age <= Duration::days(3)
            && self
                .ledger_repo
                .has_depletion_source_in(item, last_count_ts, now)
                .await?
        {
            return Ok(Confidence::High);
        }

        if age <= Duration::days(7) {
            return Ok(Confidence::Medium);
        }
        if age <= Duration::days(14)
            && self.has_receiving_in(item, last_count_ts, now).await?
        {
            return Ok(Confidence::Medium);
        }

        Ok(Confidence::Low)
    }

    pub async fn snapshot(&self, item: InventoryItemId, now: OffsetDateTime) -> AppResult<ExpectedSnapshot> {
        let expected = self.expected_on_hand(item, now).await?;
        let velocity = self.avg_daily_depletion(item, now).await?;
        let days_to_stockout = if velocity <= 0.0 {
            f64::INFINITY
        } else {
            (expected / velocity).max(0.0)
        };
        let confidence = self.confidence(item, now).await?;

        Ok(ExpectedSnapshot {
            inventory_item_id: item,
            as_of: now,
            expected_on_hand: expected,
            avg_daily_depletion: velocity,
            days_to_stockout,
            confidence,
        })
    }

    async fn has_receiving_in(
        &self,
        item: InventoryItemId,
        from: OffsetDateTime,
        to: OffsetDateTime,
    ) -> AppResult<bool> {
        let events = self.ledger_repo.query(item, from, to).await?;
        Ok(events
            .iter()
            .any(|e| e.event_type == crate::domain::ledger::EventType::Receiving))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExpectedSnapshot {
    pub inventory_item_id: InventoryItemId,
    #[serde(with = "time::serde::rfc3339")]
    pub as_of: OffsetDateTime,
    pub expected_on_hand: f64,
    pub avg_daily_depletion: f64,
    pub days_to_stockout: f64,
    pub confidence: Confidence,
}
