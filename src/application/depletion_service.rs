use crate::domain::ledger::{ConfidenceLevel, ConsumptionEvent, EventType, SourceSystem};
use crate::domain::mapping::{MappingMode, PosItemMapping, SalesLine};
use crate::domain::measurement::Uom;
use crate::domain::money::SignedQuantity;
use crate::domain::settings::DepletionPrecedence;
use crate::infrastructure::{
    CatalogRepository, CatalogRepositoryTrait, LedgerRepository, LedgerRepositoryTrait,
    MappingRepository, MappingRepositoryTrait, SettingsRepository, SettingsRepositoryTrait,
};
use crate::shared::{AppResult, BusinessId, ConsumptionEventId, InventoryItemId, LocationId};
use serde::Serialize;
use time::OffsetDateTime;

/// Standard pour size assumed for `split_ratio` recipes, which carry a
/// fractional weight per alternative item rather than an absolute quantity
/// (§3 Recipe): split-ratio recipes need *some* serving size to turn a
/// ratio into a depleted quantity, and nothing else fixes one. Recorded as
/// a decision in the grounding ledger.
const STANDARD_POUR_OZ: f64 = 1.5;

/// §4.3-4.4 Depletion Engine: turns ingested `SalesLine` rows and tap-meter
/// readings into `ConsumptionEvent`s. Runs in batches bounded by
/// `batch_size` sales lines per pass (§5), and every write goes through
/// `LedgerRepositoryTrait::append_deduped` so re-running a pass over the
/// same window never double-counts (§8 `replay_is_idempotent`).
#[derive(Clone)]
pub struct DepletionService {
    mapping_repo: MappingRepository,
    catalog_repo: CatalogRepository,
    ledger_repo: LedgerRepository,
    settings_repo: SettingsRepository,
    batch_size: usize,
}

impl DepletionService {
    pub fn new(
        mapping_repo: MappingRepository,
        catalog_repo: CatalogRepository,
        ledger_repo: LedgerRepository,
        settings_repo: SettingsRepository,
        batch_size: usize,
    ) -> Self {
        Self {
            mapping_repo,
            catalog_repo,
            ledger_repo,
            settings_repo,
            batch_size,
        }
    }

    /// Normalizes and upserts one POS sale row (§6 sales-line ingest
    /// contract). Ingestion is separate from depletion: a line can be
    /// re-ingested (e.g. a void arriving after the original sale) many
    /// times before a depletion pass ever reads it.
    pub async fn ingest_sales_line(&self, line: SalesLine) -> AppResult<SalesLine> {
        let id = self.mapping_repo.upsert_sales_line(&line).await?;
        Ok(SalesLine { id, ..line })
    }

    /// Records a direct tap-meter pulse (§4.3 tap-meter ingestion path,
    /// distinct from the POS-sale path). Each reading is its own ledger
    /// entry rather than a dedupe target, since a flow meter reports a
    /// fresh delta on every poll.
    pub async fn ingest_tap_meter_reading(
        &self,
        location_id: LocationId,
        tap_line_id: crate::shared::TapLineId,
        at_ts: OffsetDateTime,
        volume_ml_delta: f64,
    ) -> AppResult<ConsumptionEventId> {
        let assignment = self
            .mapping_repo
            .find_active_tap_assignment(tap_line_id, at_ts)
            .await?
            .ok_or_else(|| crate::shared::AppError::not_found("No keg currently tapped on this line"))?;
        let keg = self
            .mapping_repo
            .find_keg_instance(assignment.keg_instance_id)
            .await?
            .ok_or_else(|| crate::shared::AppError::not_found("Keg instance not found"))?;

        let (base_uom, density) = self.resolve_item_base_uom_and_density(keg.inventory_item_id).await?;
        let delta = Uom::Ml.convert(-volume_ml_delta.abs(), base_uom, density)?;

        let event = ConsumptionEvent::new(
            location_id,
            at_ts,
            EventType::TapFlow,
            SourceSystem::TapMeter,
            keg.inventory_item_id,
            SignedQuantity::new(delta)?,
            base_uom,
            ConfidenceLevel::Measured,
            None,
            None,
            None,
            Some(format!("tap meter reading on line {tap_line_id}")),
            None,
        )?;
        self.ledger_repo.append(&event).await
    }

    /// Runs one depletion pass over sales lines in `(from_ts, to_ts]` for
    /// `location_id`, at most `batch_size` lines at a time (§5). Safe to
    /// call repeatedly over the same window.
    pub async fn run_depletion_pass(
        &self,
        business_id: BusinessId,
        location_id: LocationId,
        from_ts: OffsetDateTime,
        to_ts: OffsetDateTime,
    ) -> AppResult<DepletionPassSummary> {
        let settings = self.settings_repo.find(business_id).await?;
        let precedence = settings
            .map(|s| s.depletion_precedence)
            .unwrap_or(DepletionPrecedence::PreferTapMeter);

        let lines = self
            .mapping_repo
            .list_sales_lines_for_location(location_id, from_ts, to_ts, self.batch_size as i64)
            .await?;

        let mut summary = DepletionPassSummary::default();
        summary.processed = lines.len();

        for line in &lines {
            self.process_sales_line(line, precedence, &mut summary).await?;
        }

        Ok(summary)
    }

    async fn process_sales_line(
        &self,
        line: &SalesLine,
        precedence: DepletionPrecedence,
        summary: &mut DepletionPassSummary,
    ) -> AppResult<()> {
        let Some(mapping) = self
            .mapping_repo
            .find_active_mapping(line.location_id, line.source_system, &line.pos_item_id, line.sold_at)
            .await?
        else {
            summary.unmapped += 1;
            return Ok(());
        };

        let Some(targets) = self.resolve_depletion_targets(&mapping, line, precedence).await? else {
            summary.deferred_to_tap_meter += 1;
            return Ok(());
        };

        if targets.is_empty() {
            summary.unmapped += 1;
            return Ok(());
        }

        if line.depletes() {
            for (item_id, quantity, uom) in &targets {
                self.append_pos_depletion(line, &mapping, *item_id, *quantity, *uom, 0).await?;
            }
            summary.depleted += 1;
        } else {
            let mut reversed_any = false;
            for (item_id, quantity, uom) in &targets {
                if self.ledger_repo.exists_for_sales_line(line.id, *item_id, 0).await? {
                    self.append_pos_depletion(line, &mapping, *item_id, *quantity, *uom, 1).await?;
                    reversed_any = true;
                }
            }
            if reversed_any {
                summary.void_adjustments += 1;
            }
        }

        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    async fn append_pos_depletion(
        &self,
        line: &SalesLine,
        mapping: &PosItemMapping,
        item_id: InventoryItemId,
        quantity_per_drink: f64,
        uom: Uom,
        void_seq: i32,
    ) -> AppResult<ConsumptionEventId> {
        // void_seq 0 is the original depletion (negative delta); void_seq 1
        // is the reversal once a line is voided or refunded after having
        // already been depleted (positive delta, same magnitude).
        let magnitude = (quantity_per_drink * line.quantity).abs();
        let signed = if void_seq == 0 { -magnitude } else { magnitude };

        // Ledger deltas are stored in the item's base UOM (§4.1); the
        // pour/recipe math above works in whatever unit the mapping or
        // recipe ingredient was authored in, so convert before writing.
        let (base_uom, density) = self.resolve_item_base_uom_and_density(item_id).await?;
        let converted = uom.convert(signed, base_uom, density)?;

        let event = ConsumptionEvent::new(
            line.location_id,
            line.sold_at,
            EventType::PosSale,
            line.source_system,
            item_id,
            SignedQuantity::new(converted)?,
            base_uom,
            ConfidenceLevel::Theoretical,
            None,
            mapping.recipe_id,
            Some(line.id),
            Some(format!("pos item {} via mapping {}", line.pos_item_id, mapping.id)),
            None,
        )?;
        self.ledger_repo.append_deduped(&event, void_seq).await
    }

    /// Looks up an item's base UOM and the density used to bridge
    /// volume<->weight conversions (bottle template density, falling back to
    /// the item's category default), shared by every write path that turns
    /// a non-base-UOM quantity into a ledger delta.
    async fn resolve_item_base_uom_and_density(
        &self,
        inventory_item_id: InventoryItemId,
    ) -> AppResult<(Uom, Option<f64>)> {
        let item = self
            .catalog_repo
            .find_item(inventory_item_id)
            .await?
            .ok_or_else(|| crate::shared::AppError::not_found("Inventory item not found"))?;
        let density = match self.catalog_repo.find_bottle_template_for_item(inventory_item_id).await? {
            Some(template) => Some(template.density_g_per_ml()),
            None => self
                .catalog_repo
                .find_category(item.category_id)
                .await?
                .and_then(|c| c.default_density_g_per_ml),
        };
        Ok((item.base_uom, density))
    }

    /// Resolves what a sales line depletes and by how much, per mapping
    /// mode (§3 POSItemMapping.mode, §4.3). Returns `None` when the mode is
    /// `draft_by_tap` and the business prefers tap-meter readings as the
    /// source of truth for that draft line — in that case the POS ring is
    /// not written to the ledger at all, to avoid double-counting the same
    /// keg volume against both a meter pulse and an inferred pour.
    async fn resolve_depletion_targets(
        &self,
        mapping: &PosItemMapping,
        line: &SalesLine,
        precedence: DepletionPrecedence,
    ) -> AppResult<Option<Vec<(InventoryItemId, f64, Uom)>>> {
        match mapping.mode {
            MappingMode::Direct => {
                let item_id = mapping
                    .direct_item_id
                    .ok_or_else(|| crate::shared::AppError::internal("direct mapping missing direct_item_id"))?;
                let pour_oz = mapping.pour_oz.unwrap_or(0.0);
                Ok(Some(vec![(item_id, pour_oz, Uom::Oz)]))
            }
            MappingMode::DraftByTap => {
                if precedence == DepletionPrecedence::PreferTapMeter {
                    return Ok(None);
                }
                let tap_line_id = mapping
                    .tap_line_id
                    .ok_or_else(|| crate::shared::AppError::internal("draft_by_tap mapping missing tap_line_id"))?;
                let assignment = self
                    .mapping_repo
                    .find_active_tap_assignment(tap_line_id, line.sold_at)
                    .await?;
                let Some(assignment) = assignment else {
                    return Ok(Some(Vec::new()));
                };
                let keg = self.mapping_repo.find_keg_instance(assignment.keg_instance_id).await?;
                let Some(keg) = keg else {
                    return Ok(Some(Vec::new()));
                };
                let pour_oz = mapping.pour_oz.unwrap_or(0.0);
                Ok(Some(vec![(keg.inventory_item_id, pour_oz, Uom::Oz)]))
            }
            MappingMode::Recipe => {
                let recipe_id = mapping
                    .recipe_id
                    .ok_or_else(|| crate::shared::AppError::internal("recipe mapping missing recipe_id"))?;
                let ingredients = self.mapping_repo.list_ingredients_for_recipe(recipe_id).await?;
                Ok(Some(
                    ingredients
                        .into_iter()
                        .map(|i| (i.inventory_item_id, i.quantity, i.uom))
                        .collect(),
                ))
            }
            MappingMode::SplitRatio => {
                let recipe_id = mapping
                    .recipe_id
                    .ok_or_else(|| crate::shared::AppError::internal("split_ratio mapping missing recipe_id"))?;
                let ingredients = self.mapping_repo.list_ingredients_for_recipe(recipe_id).await?;
                Ok(Some(
                    ingredients
                        .into_iter()
                        .map(|i| (i.inventory_item_id, i.ratio.unwrap_or(0.0) * STANDARD_POUR_OZ, i.uom))
                        .collect(),
                ))
            }
        }
    }

    /// Density-aware manual depletion used outside the sales-line path
    /// (e.g. reconciling a known pour that never went through a POS), kept
    /// here rather than duplicated in `LedgerService` since depletion
    /// already owns the catalog lookup for category fallback density.
    pub async fn append_manual_depletion(
        &self,
        location_id: LocationId,
        inventory_item_id: InventoryItemId,
        quantity: f64,
        uom: Uom,
    ) -> AppResult<ConsumptionEventId> {
        let (base_uom, density) = self.resolve_item_base_uom_and_density(inventory_item_id).await?;
        let delta = uom.convert(-quantity.abs(), base_uom, density)?;
        let event = ConsumptionEvent::new(
            location_id,
            OffsetDateTime::now_utc(),
            EventType::ManualAdjustment,
            SourceSystem::Manual,
            inventory_item_id,
            SignedQuantity::new(delta)?,
            base_uom,
            ConfidenceLevel::Estimated,
            None,
            None,
            None,
            Some("manual depletion".to_string()),
            None,
        )?;
        self.ledger_repo.append(&event).await
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DepletionPassSummary {
    pub processed: usize,
    pub depleted: usize,
    pub unmapped: usize,
    pub void_adjustments: usize,
    pub deferred_to_tap_meter: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ledger::SourceSystem as Src;
    use crate::shared::LocationId;

    fn line(quantity: f64, voided: bool, refunded: bool) -> SalesLine {
        SalesLine {
            id: crate::shared::SalesLineId::new(),
            location_id: LocationId::new(),
            source_system: Src::Toast,
            source_location_id: "loc-1".into(),
            business_date: time::Date::from_calendar_date(2026, time::Month::July, 1).unwrap(),
            sold_at: OffsetDateTime::now_utc(),
            receipt_id: "r1".into(),
            line_id: "l1".into(),
            pos_item_id: "pos_jameson_1oz".into(),
            pos_item_name: "Jameson 1oz".into(),
            quantity,
            is_voided: voided,
            is_refunded: refunded,
            size_modifier_id: None,
        }
    }

    #[test]
    fn split_ratio_uses_standard_pour() {
        assert_eq!(STANDARD_POUR_OZ, 1.5);
    }

    #[test]
    fn a_depleting_line_reports_a_positive_quantity() {
        let l = line(2.0, false, false);
        assert!(l.depletes());
        assert_eq!(l.quantity, 2.0);
    }

    #[test]
    fn a_voided_line_does_not_deplete() {
        let l = line(1.0, true, false);
        assert!(!l.depletes());
    }
}
