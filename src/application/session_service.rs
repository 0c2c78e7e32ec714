use crate::application::session_events::{SessionEvent, SessionEventBus};
use crate::domain::catalog::InventoryItem;
use crate::domain::ledger::{ConfidenceLevel, ConsumptionEvent, EventType, SourceSystem};
use crate::domain::measurement::Uom;
use crate::domain::money::SignedQuantity;
use crate::domain::session::{
    InventorySession, InventorySessionLine, QuantityForm, SessionParticipant, SessionType,
    VarianceReason, VarianceReasonEntry,
};
use crate::infrastructure::{
    CatalogRepository, CatalogRepositoryTrait, LedgerRepository, LedgerRepositoryTrait,
    LocationRepository, LocationRepositoryTrait, SessionRepository, SessionRepositoryTrait,
    SettingsRepository, SettingsRepositoryTrait,
};
use crate::shared::{AppError, AppResult, InventoryItemId, InventorySessionId, LocationId, UserId};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use time::OffsetDateTime;

/// §4.5 Session Engine: the lifecycle of a physical count, from `Create`
/// through concurrent `AddLine`/`JoinParticipant` calls to `Close`, where
/// the counted state is reconciled back into the ledger as a single
/// `inventory_count_adjustment` entry per item (Invariant 2: a session's
/// reconciliation is atomic — either every item's adjustment is written,
/// or none are, gated by `ERR_VARIANCE_REASONS_REQUIRED`).
#[derive(Clone)]
pub struct SessionService {
    session_repo: SessionRepository,
    ledger_repo: LedgerRepository,
    catalog_repo: CatalogRepository,
    location_repo: LocationRepository,
    settings_repo: SettingsRepository,
    events: SessionEventBus,
}

impl SessionService {
    pub fn new(
        session_repo: SessionRepository,
        ledger_repo: LedgerRepository,
        catalog_repo: CatalogRepository,
        location_repo: LocationRepository,
        settings_repo: SettingsRepository,
        events: SessionEventBus,
    ) -> Self {
        Self {
            session_repo,
            ledger_repo,
            catalog_repo,
            location_repo,
            settings_repo,
            events,
        }
    }

    /// Exposes the bus so the HTTP layer can hand out subscriptions without
    /// this service needing to know anything about SSE/axum.
    pub fn events(&self) -> SessionEventBus {
        self.events.clone()
    }

    /// Opens a new session. §4.5 does not allow two open sessions on the
    /// same location at once — a forgotten-open session must be closed (or
    /// auto-closed) before a new one starts, so counts never split across
    /// two concurrently-open sessions.
    pub async fn create_session(
        &self,
        location_id: LocationId,
        session_type: SessionType,
        opened_by: UserId,
    ) -> AppResult<InventorySession> {
        if self
            .session_repo
            .find_open_session_for_location(location_id)
            .await?
            .is_some()
        {
            return Err(AppError::conflict(
                "location already has an open inventory session",
            ));
        }
        let session = InventorySession::open(location_id, session_type, opened_by);
        self.session_repo.create_session(&session).await?;
        tracing::info!(session_id = %session.id, %location_id, "session opened");
        Ok(session)
    }

    pub async fn join_participant(
        &self,
        session_id: InventorySessionId,
        user_id: UserId,
        sub_area: Option<String>,
    ) -> AppResult<SessionParticipant> {
        let session = self.get_open_session(session_id).await?;
        let participant = SessionParticipant::new(session.id, user_id, sub_area);
        self.session_repo.add_participant(&participant).await?;
        self.events.publish(
            session.id,
            SessionEvent::ParticipantJoined {
                session_id: session.id,
                user_id: participant.user_id,
                sub_area: participant.sub_area.clone(),
            },
        );
        Ok(participant)
    }

    pub async fn find_session(&self, session_id: InventorySessionId) -> AppResult<Option<InventorySession>> {
        self.session_repo.find_session(session_id).await
    }

    pub async fn list_participants(
        &self,
        session_id: InventorySessionId,
    ) -> AppResult<Vec<SessionParticipant>> {
        self.session_repo.list_participants(session_id).await
    }

    /// Records one item's physical count (§4.5 step 2). The caller-supplied
    /// `raw_form` is normalized to the item's base UOM before it is stored,
    /// so the close algorithm can sum counts and ledger deltas in the same
    /// unit without re-resolving density at reconciliation time.
    pub async fn add_line(&self, command: AddLineCommand) -> AppResult<InventorySessionLine> {
        let session = self.get_open_session(command.session_id).await?;
        let item = self
            .catalog_repo
            .find_item(command.inventory_item_id)
            .await?
            .ok_or_else(|| AppError::not_found("Inventory item not found"))?;

        let counted_quantity = self.resolve_counted_quantity(&item, &command.raw_form).await?;

        let line = InventorySessionLine::new(
            session.id,
            item.id,
            command.sub_area,
            command.raw_form,
            counted_quantity,
            command.counted_by,
        )?;
        self.session_repo.add_line(&line).await?;
        self.events.publish(
            session.id,
            SessionEvent::LineAdded {
                session_id: session.id,
                inventory_item_id: line.inventory_item_id,
                sub_area: line.sub_area.clone(),
                counted_quantity: line.counted_quantity,
            },
        );
        Ok(line)
    }

    pub async fn list_lines(&self, session_id: InventorySessionId) -> AppResult<Vec<InventorySessionLine>> {
        self.session_repo.list_lines(session_id).await
    }

    pub async fn add_variance_reason(
        &self,
        session_id: InventorySessionId,
        inventory_item_id: InventoryItemId,
        reason: VarianceReason,
        note: Option<String>,
        entered_by: UserId,
    ) -> AppResult<VarianceReasonEntry> {
        let _session = self.get_open_session(session_id).await?;
        let entry = VarianceReasonEntry::new(session_id, inventory_item_id, reason, note, entered_by);
        self.session_repo.add_variance_reason(&entry).await?;
        Ok(entry)
    }

    /// §4.5 step 4-6 close: for each counted line, compares the normalized
    /// count against the ledger's running expected value, requires an
    /// explanatory `VarianceReasonEntry` for any item whose variance
    /// exceeds the business's threshold, and — only once every such item
    /// has one — reconciles every line's variance into the ledger as an
    /// `inventory_count_adjustment` and marks the session closed.
    pub async fn close(&self, session_id: InventorySessionId, closed_by: UserId) -> AppResult<SessionCloseSummary> {
        let mut session = self.get_open_session(session_id).await?;
        let now = OffsetDateTime::now_utc();

        let location = self
            .location_repo
            .find_by_id(session.location_id)
            .await?
            .ok_or_else(|| AppError::not_found("Location not found"))?;
        let threshold_pct = match self.settings_repo.find(location.business_id).await? {
            Some(settings) => settings.default_variance_threshold_pct,
            None => crate::domain::settings::BusinessSettings::new(location.business_id)
                .default_variance_threshold_pct,
        };

        let lines = self.session_repo.list_lines(session.id).await?;
        let reasons = self.session_repo.list_variance_reasons(session.id).await?;
        let explained: HashSet<InventoryItemId> = reasons.iter().map(|r| r.inventory_item_id).collect();

        let mut expected_by_item = HashMap::with_capacity(lines.len());
        for line in &lines {
            if expected_by_item.contains_key(&line.inventory_item_id) {
                continue;
            }
            let expected = self
                .ledger_repo
                .sum_signed_delta(line.inventory_item_id, OffsetDateTime::UNIX_EPOCH, now)
                .await?;
            expected_by_item.insert(line.inventory_item_id, expected);
        }

        let adjustments = partition_adjustments(&lines, &expected_by_item, &explained, threshold_pct)?;

        let item_uoms = self.base_uoms_for(&adjustments).await?;
        let mut reconciling_events = Vec::with_capacity(adjustments.len());
        for (item_id, variance) in &adjustments {
            if variance.abs() < f64::EPSILON {
                continue;
            }
            let uom = item_uoms
                .get(item_id)
                .copied()
                .ok_or_else(|| AppError::internal("missing base UOM for reconciled item"))?;
            let event = ConsumptionEvent::new(
                session.location_id,
                now,
                EventType::InventoryCountAdjustment,
                SourceSystem::SessionClose,
                *item_id,
                SignedQuantity::new(*variance)?,
                uom,
                ConfidenceLevel::Measured,
                Some(session.id),
                None,
                None,
                None,
                None,
            )?;
            reconciling_events.push(event);
        }
        let adjustment_count = reconciling_events.len();

        session.close(closed_by)?;
        // §4.5: every reconciling entry and the session's own transition to
        // `closed` commit together or not at all (Invariant 2) — a single
        // transactional write rather than a loop of autocommitted ones, so
        // a mid-loop failure can never leave the ledger reconciled against
        // a session readers still see as open (or vice versa).
        self.session_repo.close_with_ledger_entries(&session, &reconciling_events).await?;
        tracing::info!(session_id = %session.id, adjustments = adjustment_count, "session closed");
        self.events.publish(
            session.id,
            SessionEvent::SessionClosed { session_id: session.id, adjustments_written: adjustment_count },
        );

        Ok(SessionCloseSummary {
            session_id: session.id,
            lines_counted: lines.len(),
            adjustments_written: adjustment_count,
        })
    }

    /// Called by the `/cron` end-of-day sweep (§4.5 `AutoClose`) for any
    /// session still open past the business's `session_auto_lock` window.
    /// Any item that would otherwise block close on
    /// `ERR_VARIANCE_REASONS_REQUIRED` gets an automatic `SessionExpired`
    /// reason instead of failing the whole pass — a forgotten count should
    /// never wedge the ledger indefinitely. Safe to call twice on the same
    /// session: closing an already-closed session is a no-op here, not an
    /// error, since the cron pass may see a session another caller just
    /// closed.
    pub async fn auto_close(&self, session_id: InventorySessionId) -> AppResult<Option<SessionCloseSummary>> {
        let session = self
            .session_repo
            .find_session(session_id)
            .await?
            .ok_or_else(|| AppError::not_found("Session not found"))?;
        if !session.is_open() {
            return Ok(None);
        }

        loop {
            match self.close(session_id, session.opened_by).await {
                Ok(summary) => return Ok(Some(summary)),
                Err(AppError::VarianceReasonsRequired(item_ids)) => {
                    for item_id in item_ids {
                        let entry = VarianceReasonEntry::new(
                            session_id,
                            item_id,
                            VarianceReason::SessionExpired,
                            Some("auto-closed by end-of-day sweep".to_string()),
                            session.opened_by,
                        );
                        self.session_repo.add_variance_reason(&entry).await?;
                    }
                }
                Err(other) => return Err(other),
            }
        }
    }

    async fn get_open_session(&self, session_id: InventorySessionId) -> AppResult<InventorySession> {
        let session = self
            .session_repo
            .find_session(session_id)
            .await?
            .ok_or_else(|| AppError::not_found("Session not found"))?;
        if !session.is_open() {
            return Err(AppError::SessionAlreadyClosed);
        }
        Ok(session)
    }

    async fn base_uoms_for(
        &self,
        adjustments: &[(InventoryItemId, f64)],
    ) -> AppResult<HashMap<InventoryItemId, Uom>> {
        let mut map = HashMap::with_capacity(adjustments.len());
        for (item_id, _) in adjustments {
            if map.contains_key(item_id) {
                continue;
            }
            let item = self
                .catalog_repo
                .find_item(*item_id)
                .await?
                .ok_or_else(|| AppError::not_found("Inventory item not found"))?;
            map.insert(*item_id, item.base_uom);
        }
        Ok(map)
    }

    async fn density_for_item(&self, item: &InventoryItem) -> AppResult<Option<f64>> {
        if let Some(template) = self.catalog_repo.find_bottle_template_for_item(item.id).await? {
            return Ok(Some(template.density_g_per_ml()));
        }
        let category = self.catalog_repo.find_category(item.category_id).await?;
        Ok(category.and_then(|c| c.default_density_g_per_ml))
    }

    async fn resolve_counted_quantity(&self, item: &InventoryItem, form: &QuantityForm) -> AppResult<f64> {
        match form {
            QuantityForm::UnitCount { units } => {
                if item.base_uom != Uom::Unit {
                    return Err(AppError::validation(
                        "unit_count capture form requires a unit-counted item",
                    ));
                }
                Ok(*units)
            }
            QuantityForm::WeighedGrams { grams } => {
                if let Some(template) = self.catalog_repo.find_bottle_template_for_item(item.id).await? {
                    let ml = template.gross_weight_to_ml(*grams)?;
                    Uom::Ml.convert(ml, item.base_uom, Some(template.density_g_per_ml()))
                } else {
                    let density = self.density_for_item(item).await?;
                    Uom::G.convert(*grams, item.base_uom, density)
                }
            }
            QuantityForm::Volume { value, uom } => {
                let density = self.density_for_item(item).await?;
                uom.convert(*value, item.base_uom, density)
            }
            QuantityForm::KegFraction { fraction } => {
                let capacity = item.container_size_ml.ok_or_else(|| {
                    AppError::validation("keg_fraction capture form requires item.container_size_ml")
                })?;
                let ml = fraction * capacity;
                let density = self.density_for_item(item).await?;
                Uom::Ml.convert(ml, item.base_uom, density)
            }
        }
    }
}

pub struct AddLineCommand {
    pub session_id: InventorySessionId,
    pub inventory_item_id: InventoryItemId,
    pub sub_area: Option<String>,
    pub raw_form: QuantityForm,
    pub counted_by: UserId,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionCloseSummary {
    pub session_id: InventorySessionId,
    pub lines_counted: usize,
    pub adjustments_written: usize,
}

/// The pure decision at the heart of §4.5 step 4-5: given each line's
/// counted quantity and the ledger's expected quantity for its item,
/// either every variance beyond `threshold_pct` already has a
/// `VarianceReasonEntry`, in which case every line's `(item, variance)`
/// pair reconciles — or it doesn't, in which case close fails closed and
/// names exactly the items still needing an explanation. Kept free of
/// I/O so the gating behavior can be tested without a database.
fn partition_adjustments(
    lines: &[InventorySessionLine],
    expected_by_item: &HashMap<InventoryItemId, f64>,
    explained: &HashSet<InventoryItemId>,
    threshold_pct: f64,
) -> AppResult<Vec<(InventoryItemId, f64)>> {
    let mut adjustments = Vec::with_capacity(lines.len());
    let mut unexplained = Vec::new();

    for line in lines {
        let expected = *expected_by_item.get(&line.inventory_item_id).unwrap_or(&0.0);
        let variance = line.counted_quantity - expected;
        let variance_pct = if expected.abs() < f64::EPSILON {
            if variance.abs() < f64::EPSILON {
                0.0
            } else {
                100.0
            }
        } else {
            (variance / expected).abs() * 100.0
        };

        if variance_pct > threshold_pct && !explained.contains(&line.inventory_item_id) {
            unexplained.push(line.inventory_item_id);
            continue;
        }
        adjustments.push((line.inventory_item_id, variance));
    }

    if !unexplained.is_empty() {
        return Err(AppError::VarianceReasonsRequired(unexplained));
    }
    Ok(adjustments)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(item_id: InventoryItemId, counted_quantity: f64) -> InventorySessionLine {
        InventorySessionLine::new(
            InventorySessionId::new(),
            item_id,
            None,
            QuantityForm::Volume { value: counted_quantity, uom: Uom::Ml },
            counted_quantity,
            UserId::new(),
        )
        .unwrap()
    }

    #[test]
    fn close_with_zero_variance() {
        let item_id = InventoryItemId::new();
        let lines = vec![line(item_id, 750.0)];
        let expected = HashMap::from([(item_id, 750.0)]);
        let adjustments = partition_adjustments(&lines, &expected, &HashSet::new(), 10.0).unwrap();
        assert_eq!(adjustments, vec![(item_id, 0.0)]);
    }

    /// A 100% variance against a 10% threshold is gated until a reason
    /// entry exists for the item; once it does, the session's counted
    /// quantity reconciles to the ledger as the adjustment delta.
    #[test]
    fn close_reconciles_ledger_to_count() {
        let item_id = InventoryItemId::new();
        let lines = vec![line(item_id, 700.0)];
        let expected = HashMap::from([(item_id, 0.0)]);

        let err = partition_adjustments(&lines, &expected, &HashSet::new(), 10.0).unwrap_err();
        assert!(matches!(err, AppError::VarianceReasonsRequired(ref ids) if ids == &vec![item_id]));

        let explained = HashSet::from([item_id]);
        let adjustments = partition_adjustments(&lines, &expected, &explained, 10.0).unwrap();
        assert_eq!(adjustments, vec![(item_id, 700.0)]);
    }

    /// `auto_close` applies `VarianceReason::SessionExpired` to every item
    /// `partition_adjustments` names as unexplained; doing so is exactly
    /// what makes a second pass over the same lines resolve cleanly,
    /// mirroring the idempotent retry loop in `SessionService::auto_close`.
    #[test]
    fn auto_close_idempotent() {
        let item_id = InventoryItemId::new();
        let lines = vec![line(item_id, 700.0)];
        let expected = HashMap::from([(item_id, 0.0)]);

        let err = partition_adjustments(&lines, &expected, &HashSet::new(), 10.0).unwrap_err();
        let AppError::VarianceReasonsRequired(unexplained) = err else {
            panic!("expected gating error");
        };

        let auto_explained: HashSet<InventoryItemId> = unexplained.into_iter().collect();
        let first = partition_adjustments(&lines, &expected, &auto_explained, 10.0).unwrap();
        let second = partition_adjustments(&lines, &expected, &auto_explained, 10.0).unwrap();
        assert_eq!(first, second);
    }
}
