use crate::domain::ledger::SourceSystem;
use crate::domain::mapping::{
    KegInstance, MappingMode, PosItemMapping, Recipe, RecipeIngredient, TapAssignment, TapLine,
};
use crate::infrastructure::{MappingRepository, MappingRepositoryTrait};
use crate::shared::{
    AppError, AppResult, BusinessId, InventoryItemId, KegInstanceId, LocationId, RecipeId,
    TapLineId,
};
use mini_moka::sync::Cache;
use std::time::Duration as StdDuration;
use time::OffsetDateTime;

/// §4.2-4.3 Mapping: resolves a POS item to the inventory it depletes, and
/// keeps tap assignments and POS-item mappings free of overlapping effective
/// ranges (Invariants 4 and 5). `resolve_mapping` sits on the depletion
/// engine's hot path (one lookup per ingested sales line), so the active
/// mapping per `(location, source_system, pos_item_id)` is cached
/// read-through: a miss falls straight to the repository, and staleness
/// only ever lasts the TTL since mappings are never the ledger's authority.
#[derive(Clone)]
pub struct MappingService {
    mapping_repo: MappingRepository,
    active_mapping_cache: Cache<(LocationId, SourceSystem, String), Option<PosItemMapping>>,
}

impl MappingService {
    pub fn new(mapping_repo: MappingRepository) -> Self {
        let active_mapping_cache = Cache::builder()
            .time_to_live(StdDuration::from_secs(30))
            .max_capacity(10_000)
            .build();
        Self {
            mapping_repo,
            active_mapping_cache,
        }
    }

    pub async fn create_direct_mapping(
        &self,
        location_id: LocationId,
        source_system: SourceSystem,
        pos_item_id: String,
        direct_item_id: InventoryItemId,
        pour_oz: f64,
        effective_from_ts: OffsetDateTime,
    ) -> AppResult<PosItemMapping> {
        let mapping = PosItemMapping::direct(
            location_id,
            source_system,
            pos_item_id,
            direct_item_id,
            pour_oz,
            effective_from_ts,
        )?;
        self.reject_if_overlapping(&mapping).await?;
        self.mapping_repo.insert_mapping_closing_prior(&mapping).await?;
        self.invalidate_cached_mapping(&mapping).await;
        Ok(mapping)
    }

    pub async fn create_draft_by_tap_mapping(
        &self,
        location_id: LocationId,
        source_system: SourceSystem,
        pos_item_id: String,
        tap_line_id: TapLineId,
        pour_oz: f64,
        effective_from_ts: OffsetDateTime,
    ) -> AppResult<PosItemMapping> {
        let mapping = PosItemMapping::draft_by_tap(
            location_id,
            source_system,
            pos_item_id,
            tap_line_id,
            pour_oz,
            effective_from_ts,
        )?;
        self.reject_if_overlapping(&mapping).await?;
        self.mapping_repo.insert_mapping_closing_prior(&mapping).await?;
        self.invalidate_cached_mapping(&mapping).await;
        Ok(mapping)
    }

    pub async fn create_recipe_mapping(
        &self,
        location_id: LocationId,
        source_system: SourceSystem,
        pos_item_id: String,
        mode: MappingMode,
        recipe_id: RecipeId,
        effective_from_ts: OffsetDateTime,
    ) -> AppResult<PosItemMapping> {
        let mapping = PosItemMapping::recipe(
            location_id,
            source_system,
            pos_item_id,
            mode,
            recipe_id,
            effective_from_ts,
        )?;
        self.reject_if_overlapping(&mapping).await?;
        self.mapping_repo.insert_mapping_closing_prior(&mapping).await?;
        self.invalidate_cached_mapping(&mapping).await;
        Ok(mapping)
    }

    async fn reject_if_overlapping(&self, mapping: &PosItemMapping) -> AppResult<()> {
        let existing = self
            .mapping_repo
            .list_mappings(mapping.location_id, mapping.source_system, &mapping.pos_item_id)
            .await?;
        let overlaps = existing
            .iter()
            .any(|other| other.overlaps(mapping.effective_from_ts, mapping.effective_to_ts));
        if overlaps {
            return Err(AppError::mapping_overlap(format!(
                "mapping for pos item {} already covers this effective range",
                mapping.pos_item_id
            )));
        }
        Ok(())
    }

    async fn invalidate_cached_mapping(&self, mapping: &PosItemMapping) {
        self.active_mapping_cache
            .invalidate(&(mapping.location_id, mapping.source_system, mapping.pos_item_id.clone()));
    }

    /// Resolves the mapping that covers `at_ts`, if any. A miss is not an
    /// error (§4.4): the depletion engine counts it as an unmapped row.
    ///
    /// Lookups for "now" (the overwhelming majority — every ingested sales
    /// line and tap reading resolves against the current moment) go through
    /// the read-through cache keyed on the lookup triple; anything further
    /// back than the cache's own TTL bypasses it; since the cache is never
    /// authoritative, a stale hit can only ever widen to the next `resolve_mapping`
    /// call after `insert_mapping_closing_prior` invalidates the key.
    pub async fn resolve_mapping(
        &self,
        location_id: LocationId,
        source_system: SourceSystem,
        pos_item_id: &str,
        at_ts: OffsetDateTime,
    ) -> AppResult<Option<PosItemMapping>> {
        let is_current = (OffsetDateTime::now_utc() - at_ts).abs() < time::Duration::seconds(30);
        if !is_current {
            return self
                .mapping_repo
                .find_active_mapping(location_id, source_system, pos_item_id, at_ts)
                .await;
        }

        let key = (location_id, source_system, pos_item_id.to_string());
        if let Some(cached) = self.active_mapping_cache.get(&key) {
            return Ok(cached);
        }

        let resolved = self
            .mapping_repo
            .find_active_mapping(location_id, source_system, pos_item_id, at_ts)
            .await?;
        self.active_mapping_cache.insert(key, resolved.clone());
        Ok(resolved)
    }

    pub async fn list_mappings_for_location(&self, location_id: LocationId) -> AppResult<Vec<PosItemMapping>> {
        self.mapping_repo.list_mappings_for_location(location_id).await
    }

    pub async fn create_recipe(&self, business_id: BusinessId, name: String, is_split_ratio: bool) -> AppResult<Recipe> {
        let recipe = Recipe::new(business_id, name, is_split_ratio)?;
        self.mapping_repo.create_recipe(&recipe).await?;
        Ok(recipe)
    }

    pub async fn add_fixed_ingredient(
        &self,
        recipe_id: RecipeId,
        inventory_item_id: InventoryItemId,
        quantity: f64,
        uom: crate::domain::measurement::Uom,
    ) -> AppResult<RecipeIngredient> {
        let ingredient = RecipeIngredient::fixed(recipe_id, inventory_item_id, quantity, uom)?;
        self.mapping_repo.create_recipe_ingredient(&ingredient).await?;
        Ok(ingredient)
    }

    /// Adds a split-ratio ingredient, then verifies the recipe's full
    /// ingredient set still sums to 1.0 within tolerance (§3 Invariant on
    /// split-ratio recipes).
    pub async fn add_ratio_ingredient(
        &self,
        recipe_id: RecipeId,
        inventory_item_id: InventoryItemId,
        ratio: f64,
        uom: crate::domain::measurement::Uom,
    ) -> AppResult<RecipeIngredient> {
        let ingredient = RecipeIngredient::ratio(recipe_id, inventory_item_id, ratio, uom)?;
        self.mapping_repo.create_recipe_ingredient(&ingredient).await?;

        let all = self.mapping_repo.list_ingredients_for_recipe(recipe_id).await?;
        crate::domain::mapping::validate_split_ratio_sum(&all)?;
        Ok(ingredient)
    }

    pub async fn list_ingredients_for_recipe(&self, recipe_id: RecipeId) -> AppResult<Vec<RecipeIngredient>> {
        self.mapping_repo.list_ingredients_for_recipe(recipe_id).await
    }

    pub async fn create_tap_line(&self, location_id: LocationId, name: String) -> AppResult<TapLine> {
        let tap = TapLine {
            id: crate::shared::TapLineId::new(),
            location_id,
            name,
        };
        self.mapping_repo.create_tap_line(&tap).await?;
        Ok(tap)
    }

    pub async fn list_tap_lines_for_location(&self, location_id: LocationId) -> AppResult<Vec<TapLine>> {
        self.mapping_repo.list_tap_lines_for_location(location_id).await
    }

    pub async fn create_keg_instance(
        &self,
        location_id: LocationId,
        inventory_item_id: InventoryItemId,
        starting_volume_ml: f64,
    ) -> AppResult<KegInstance> {
        let keg = KegInstance {
            id: crate::shared::KegInstanceId::new(),
            location_id,
            inventory_item_id,
            starting_volume_ml,
            tapped_at: None,
        };
        self.mapping_repo.create_keg_instance(&keg).await?;
        Ok(keg)
    }

    /// Taps a keg onto a tap line, closing out whatever assignment was
    /// previously open on that line (Invariant 4: no overlapping
    /// assignments per tap).
    pub async fn assign_keg_to_tap(
        &self,
        tap_line_id: TapLineId,
        keg_instance_id: KegInstanceId,
        started_ts: OffsetDateTime,
    ) -> AppResult<TapAssignment> {
        let existing = self.mapping_repo.list_tap_assignments(tap_line_id).await?;
        let assignment = TapAssignment::new(tap_line_id, keg_instance_id, started_ts);
        let overlaps = existing
            .iter()
            .any(|other| other.overlaps(assignment.started_ts, assignment.ended_ts));
        if overlaps {
            return Err(AppError::mapping_overlap(format!(
                "tap line {tap_line_id} already has an assignment covering this time range"
            )));
        }
        self.mapping_repo.insert_tap_assignment_closing_prior(&assignment).await?;
        Ok(assignment)
    }

    pub async fn find_active_tap_assignment(
        &self,
        tap_line_id: TapLineId,
        at_ts: OffsetDateTime,
    ) -> AppResult<Option<TapAssignment>> {
        self.mapping_repo.find_active_tap_assignment(tap_line_id, at_ts).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::mapping::PosItemMapping;

    fn ts(offset_secs: i64) -> OffsetDateTime {
        OffsetDateTime::UNIX_EPOCH + time::Duration::seconds(offset_secs)
    }

    /// Two mappings with overlapping effective ranges for the same
    /// `(location, source_system, pos_item_id)` key must be rejected
    /// before either write happens (§8).
    #[test]
    fn mapping_rejects_overlap() {
        let location_id = LocationId::new();
        let item_id = InventoryItemId::new();
        let existing = PosItemMapping::direct(
            location_id,
            SourceSystem::Toast,
            "pos-1".to_string(),
            item_id,
            1.5,
            ts(0),
        )
        .unwrap();

        let candidate = PosItemMapping::direct(
            location_id,
            SourceSystem::Toast,
            "pos-1".to_string(),
            item_id,
            1.5,
            ts(10),
        )
        .unwrap();

        assert!(existing.overlaps(candidate.effective_from_ts, candidate.effective_to_ts));
    }
}
