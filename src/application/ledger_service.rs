use crate::domain::ledger::{ConfidenceLevel, ConsumptionEvent, EventType, SourceSystem};
use crate::domain::measurement::Uom;
use crate::domain::money::SignedQuantity;
use crate::infrastructure::{CatalogRepository, CatalogRepositoryTrait, LedgerRepository, LedgerRepositoryTrait};
use crate::shared::{AppError, AppResult, InventoryItemId, InventorySessionId, LocationId, RecipeId, SalesLineId};
use serde::Deserialize;
use time::OffsetDateTime;

/// §4.1 Ledger operations exposed to manual-adjustment, waste, and
/// transfer callers. POS/tap ingestion and session close append directly
/// through `LedgerRepository` from their own services, since both already
/// hold a resolved item + quantity in base UOM before they touch the
/// ledger; this service exists for the write paths that still take a
/// caller-supplied UOM and must resolve it against the item's own.
#[derive(Clone)]
pub struct LedgerService {
    ledger_repo: LedgerRepository,
    catalog_repo: CatalogRepository,
}

impl LedgerService {
    pub fn new(ledger_repo: LedgerRepository, catalog_repo: CatalogRepository) -> Self {
        Self {
            ledger_repo,
            catalog_repo,
        }
    }

    /// Converts `quantity` from `uom` into the item's own base UOM (using
    /// its bottle template's measured density, falling back to the
    /// category default) and appends a ledger entry. Used for manual
    /// adjustments, waste, and transfers — the entry points that are not
    /// already holding a base-UOM quantity by the time they reach the
    /// ledger.
    #[allow(clippy::too_many_arguments)]
    pub async fn append(&self, command: AppendCommand) -> AppResult<ConsumptionEvent> {
        let item = self
            .catalog_repo
            .find_item(command.inventory_item_id)
            .await?
            .ok_or_else(|| AppError::not_found("Inventory item not found"))?;

        let density = self.density_for_item(command.inventory_item_id, item.category_id).await?;
        let delta_in_base_uom = command.uom.convert(command.quantity_delta, item.base_uom, density)?;

        let event = ConsumptionEvent::new(
            command.location_id,
            command.event_ts.unwrap_or_else(OffsetDateTime::now_utc),
            command.event_type,
            command.source_system,
            command.inventory_item_id,
            SignedQuantity::new(delta_in_base_uom)?,
            item.base_uom,
            command.confidence_level,
            command.session_id,
            command.recipe_id,
            command.sales_line_ref,
            command.notes,
            command.variance_reason,
        )?;

        self.ledger_repo.append(&event).await?;
        Ok(event)
    }

    pub async fn query(
        &self,
        item: InventoryItemId,
        from: OffsetDateTime,
        to: OffsetDateTime,
    ) -> AppResult<Vec<ConsumptionEvent>> {
        self.ledger_repo.query(item, from, to).await
    }

    pub async fn sum_signed_delta(
        &self,
        item: InventoryItemId,
        from: OffsetDateTime,
        to: OffsetDateTime,
    ) -> AppResult<f64> {
        self.ledger_repo.sum_signed_delta(item, from, to).await
    }

    async fn density_for_item(
        &self,
        item_id: InventoryItemId,
        category_id: crate::shared::CategoryId,
    ) -> AppResult<Option<f64>> {
        if let Some(template) = self.catalog_repo.find_bottle_template_for_item(item_id).await? {
            return Ok(Some(template.density_g_per_ml()));
        }
        let category = self.catalog_repo.find_category(category_id).await?;
        Ok(category.and_then(|c| c.default_density_g_per_ml))
    }
}

#[derive(Debug, Deserialize)]
pub struct AppendCommand {
    pub location_id: LocationId,
    pub inventory_item_id: InventoryItemId,
    pub event_type: EventType,
    pub source_system: SourceSystem,
    pub quantity_delta: f64,
    pub uom: Uom,
    pub confidence_level: ConfidenceLevel,
    pub event_ts: Option<OffsetDateTime>,
    pub session_id: Option<InventorySessionId>,
    pub recipe_id: Option<RecipeId>,
    pub sales_line_ref: Option<SalesLineId>,
    pub notes: Option<String>,
    pub variance_reason: Option<String>,
}
