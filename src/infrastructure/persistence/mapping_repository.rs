use crate::domain::ledger::SourceSystem;
use crate::domain::mapping::{
    KegInstance, MappingMode, PosItemMapping, Recipe, RecipeIngredient, SalesLine, TapAssignment,
    TapLine,
};
use crate::domain::measurement::Uom;
use crate::shared::{
    AppResult, BusinessId, InventoryItemId, KegInstanceId, LocationId, PosItemMappingId, RecipeId,
    RecipeIngredientId, SalesLineId, TapAssignmentId, TapLineId,
};
use async_trait::async_trait;
use sqlx::{PgPool, Row};
use time::OffsetDateTime;
use uuid::Uuid;

/// §3 POSItemMapping / Recipe / RecipeIngredient / SalesLine / TapLine /
/// KegInstance / TapAssignment, §4.2-§4.3 Mapping Write Path.
#[async_trait]
pub trait MappingRepositoryTrait: Send + Sync {
    /// Closes whichever row for `(location_id, source_system, pos_item_id)`
    /// is currently open (`effective_to_ts IS NULL`) by setting its
    /// `effective_to_ts` to `mapping.effective_from_ts`, then inserts
    /// `mapping` — both statements in one transaction (§4.3).
    async fn insert_mapping_closing_prior(&self, mapping: &PosItemMapping) -> AppResult<()>;
    async fn list_mappings(
        &self,
        location_id: LocationId,
        source_system: SourceSystem,
        pos_item_id: &str,
    ) -> AppResult<Vec<PosItemMapping>>;
    async fn find_active_mapping(
        &self,
        location_id: LocationId,
        source_system: SourceSystem,
        pos_item_id: &str,
        at_ts: OffsetDateTime,
    ) -> AppResult<Option<PosItemMapping>>;
    async fn list_mappings_for_location(&self, location_id: LocationId) -> AppResult<Vec<PosItemMapping>>;

    /// Upserts on the sales-line idempotency key (§6 sales-line ingest
    /// contract); a re-ingested line with changed `is_voided`/`is_refunded`
    /// flags is updated in place so a later pass can detect the change.
    async fn upsert_sales_line(&self, line: &SalesLine) -> AppResult<SalesLineId>;
    async fn find_sales_line(&self, id: SalesLineId) -> AppResult<Option<SalesLine>>;
    async fn list_sales_lines_for_location(
        &self,
        location_id: LocationId,
        from_ts: OffsetDateTime,
        to_ts: OffsetDateTime,
        limit: i64,
    ) -> AppResult<Vec<SalesLine>>;

    async fn create_recipe(&self, recipe: &Recipe) -> AppResult<()>;
    async fn find_recipe(&self, id: RecipeId) -> AppResult<Option<Recipe>>;
    async fn list_recipes_for_business(&self, business_id: BusinessId) -> AppResult<Vec<Recipe>>;

    async fn create_recipe_ingredient(&self, ingredient: &RecipeIngredient) -> AppResult<()>;
    async fn list_ingredients_for_recipe(&self, recipe_id: RecipeId) -> AppResult<Vec<RecipeIngredient>>;

    async fn create_tap_line(&self, tap: &TapLine) -> AppResult<()>;
    async fn list_tap_lines_for_location(&self, location_id: LocationId) -> AppResult<Vec<TapLine>>;
    async fn find_tap_line(&self, id: TapLineId) -> AppResult<Option<TapLine>>;

    async fn create_keg_instance(&self, keg: &KegInstance) -> AppResult<()>;
    async fn find_keg_instance(&self, id: KegInstanceId) -> AppResult<Option<KegInstance>>;

    /// Ends whichever assignment is currently open on `tap_line_id`, then
    /// inserts `assignment` — one transaction, mirroring the mapping write
    /// path (Invariant 4: no two assignments on a tap may overlap).
    async fn insert_tap_assignment_closing_prior(&self, assignment: &TapAssignment) -> AppResult<()>;
    async fn list_tap_assignments(&self, tap_line_id: TapLineId) -> AppResult<Vec<TapAssignment>>;
    async fn find_active_tap_assignment(
        &self,
        tap_line_id: TapLineId,
        at_ts: OffsetDateTime,
    ) -> AppResult<Option<TapAssignment>>;
}

#[derive(Clone)]
pub struct MappingRepository {
    pool: PgPool,
}

impl MappingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_mapping(row: sqlx::postgres::PgRow) -> AppResult<PosItemMapping> {
        let source_system: String = row.get("source_system");
        let mode: String = row.get("mode");
        Ok(PosItemMapping {
            id: PosItemMappingId::from_uuid(row.get::<Uuid, _>("id")),
            location_id: LocationId::from_uuid(row.get::<Uuid, _>("location_id")),
            source_system: SourceSystem::from_str(&source_system)?,
            pos_item_id: row.get("pos_item_id"),
            mode: MappingMode::from_str(&mode)?,
            direct_item_id: row
                .get::<Option<Uuid>, _>("direct_item_id")
                .map(InventoryItemId::from_uuid),
            pour_oz: row.get("pour_oz"),
            tap_line_id: row.get::<Option<Uuid>, _>("tap_line_id").map(TapLineId::from_uuid),
            recipe_id: row.get::<Option<Uuid>, _>("recipe_id").map(RecipeId::from_uuid),
            effective_from_ts: row.get("effective_from_ts"),
            effective_to_ts: row.get("effective_to_ts"),
        })
    }

    fn row_to_sales_line(row: sqlx::postgres::PgRow) -> AppResult<SalesLine> {
        let source_system: String = row.get("source_system");
        Ok(SalesLine {
            id: SalesLineId::from_uuid(row.get::<Uuid, _>("id")),
            location_id: LocationId::from_uuid(row.get::<Uuid, _>("location_id")),
            source_system: SourceSystem::from_str(&source_system)?,
            source_location_id: row.get("source_location_id"),
            business_date: row.get("business_date"),
            sold_at: row.get("sold_at"),
            receipt_id: row.get("receipt_id"),
            line_id: row.get("line_id"),
            pos_item_id: row.get("pos_item_id"),
            pos_item_name: row.get("pos_item_name"),
            quantity: row.get("quantity"),
            is_voided: row.get("is_voided"),
            is_refunded: row.get("is_refunded"),
            size_modifier_id: row.get("size_modifier_id"),
        })
    }

    fn row_to_recipe(row: sqlx::postgres::PgRow) -> Recipe {
        Recipe {
            id: RecipeId::from_uuid(row.get::<Uuid, _>("id")),
            business_id: BusinessId::from_uuid(row.get::<Uuid, _>("business_id")),
            name: row.get("name"),
            is_split_ratio: row.get("is_split_ratio"),
        }
    }

    fn row_to_ingredient(row: sqlx::postgres::PgRow) -> AppResult<RecipeIngredient> {
        let uom: String = row.get("uom");
        Ok(RecipeIngredient {
            id: RecipeIngredientId::from_uuid(row.get::<Uuid, _>("id")),
            recipe_id: RecipeId::from_uuid(row.get::<Uuid, _>("recipe_id")),
            inventory_item_id: InventoryItemId::from_uuid(row.get::<Uuid, _>("inventory_item_id")),
            quantity: row.get("quantity"),
            uom: Uom::from_str(&uom)?,
            ratio: row.get("ratio"),
        })
    }

    fn row_to_tap_line(row: sqlx::postgres::PgRow) -> TapLine {
        TapLine {
            id: TapLineId::from_uuid(row.get::<Uuid, _>("id")),
            location_id: LocationId::from_uuid(row.get::<Uuid, _>("location_id")),
            name: row.get("name"),
        }
    }

    fn row_to_keg_instance(row: sqlx::postgres::PgRow) -> KegInstance {
        KegInstance {
            id: KegInstanceId::from_uuid(row.get::<Uuid, _>("id")),
            location_id: LocationId::from_uuid(row.get::<Uuid, _>("location_id")),
            inventory_item_id: InventoryItemId::from_uuid(row.get::<Uuid, _>("inventory_item_id")),
            starting_volume_ml: row.get("starting_volume_ml"),
            tapped_at: row.get("tapped_at"),
        }
    }

    fn row_to_tap_assignment(row: sqlx::postgres::PgRow) -> TapAssignment {
        TapAssignment {
            id: TapAssignmentId::from_uuid(row.get::<Uuid, _>("id")),
            tap_line_id: TapLineId::from_uuid(row.get::<Uuid, _>("tap_line_id")),
            keg_instance_id: KegInstanceId::from_uuid(row.get::<Uuid, _>("keg_instance_id")),
            started_ts: row.get("started_ts"),
            ended_ts: row.get("ended_ts"),
        }
    }
}

#[async_trait]
impl MappingRepositoryTrait for MappingRepository {
    async fn insert_mapping_closing_prior(&self, mapping: &PosItemMapping) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE pos_item_mappings SET effective_to_ts = $4
            WHERE location_id = $1 AND source_system = $2 AND pos_item_id = $3
              AND effective_to_ts IS NULL
            "#,
        )
        .bind(mapping.location_id.as_uuid())
        .bind(mapping.source_system.as_str())
        .bind(&mapping.pos_item_id)
        .bind(mapping.effective_from_ts)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO pos_item_mappings
                (id, location_id, source_system, pos_item_id, mode, direct_item_id, pour_oz,
                 tap_line_id, recipe_id, effective_from_ts, effective_to_ts)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(mapping.id.as_uuid())
        .bind(mapping.location_id.as_uuid())
        .bind(mapping.source_system.as_str())
        .bind(&mapping.pos_item_id)
        .bind(mapping.mode.as_str())
        .bind(mapping.direct_item_id.map(|id| *id.as_uuid()))
        .bind(mapping.pour_oz)
        .bind(mapping.tap_line_id.map(|id| *id.as_uuid()))
        .bind(mapping.recipe_id.map(|id| *id.as_uuid()))
        .bind(mapping.effective_from_ts)
        .bind(mapping.effective_to_ts)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn list_mappings(
        &self,
        location_id: LocationId,
        source_system: SourceSystem,
        pos_item_id: &str,
    ) -> AppResult<Vec<PosItemMapping>> {
        let rows = sqlx::query(
            r#"
            SELECT id, location_id, source_system, pos_item_id, mode, direct_item_id, pour_oz,
                   tap_line_id, recipe_id, effective_from_ts, effective_to_ts
            FROM pos_item_mappings
            WHERE location_id = $1 AND source_system = $2 AND pos_item_id = $3
            ORDER BY effective_from_ts
            "#,
        )
        .bind(location_id.as_uuid())
        .bind(source_system.as_str())
        .bind(pos_item_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Self::row_to_mapping).collect()
    }

    async fn find_active_mapping(
        &self,
        location_id: LocationId,
        source_system: SourceSystem,
        pos_item_id: &str,
        at_ts: OffsetDateTime,
    ) -> AppResult<Option<PosItemMapping>> {
        let row = sqlx::query(
            r#"
            SELECT id, location_id, source_system, pos_item_id, mode, direct_item_id, pour_oz,
                   tap_line_id, recipe_id, effective_from_ts, effective_to_ts
            FROM pos_item_mappings
            WHERE location_id = $1 AND source_system = $2 AND pos_item_id = $3
              AND effective_from_ts <= $4
              AND (effective_to_ts IS NULL OR effective_to_ts > $4)
            "#,
        )
        .bind(location_id.as_uuid())
        .bind(source_system.as_str())
        .bind(pos_item_id)
        .bind(at_ts)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Self::row_to_mapping).transpose()
    }

    async fn list_mappings_for_location(&self, location_id: LocationId) -> AppResult<Vec<PosItemMapping>> {
        let rows = sqlx::query(
            r#"
            SELECT id, location_id, source_system, pos_item_id, mode, direct_item_id, pour_oz,
                   tap_line_id, recipe_id, effective_from_ts, effective_to_ts
            FROM pos_item_mappings WHERE location_id = $1
            ORDER BY pos_item_id, effective_from_ts
            "#,
        )
        .bind(location_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Self::row_to_mapping).collect()
    }

    async fn upsert_sales_line(&self, line: &SalesLine) -> AppResult<SalesLineId> {
        let row = sqlx::query(
            r#"
            INSERT INTO sales_lines
                (id, location_id, source_system, source_location_id, business_date, sold_at,
                 receipt_id, line_id, pos_item_id, pos_item_name, quantity, is_voided, is_refunded,
                 size_modifier_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (source_system, source_location_id, business_date, receipt_id, line_id)
            DO UPDATE SET
                is_voided = EXCLUDED.is_voided,
                is_refunded = EXCLUDED.is_refunded,
                quantity = EXCLUDED.quantity
            RETURNING id
            "#,
        )
        .bind(line.id.as_uuid())
        .bind(line.location_id.as_uuid())
        .bind(line.source_system.as_str())
        .bind(&line.source_location_id)
        .bind(line.business_date)
        .bind(line.sold_at)
        .bind(&line.receipt_id)
        .bind(&line.line_id)
        .bind(&line.pos_item_id)
        .bind(&line.pos_item_name)
        .bind(line.quantity)
        .bind(line.is_voided)
        .bind(line.is_refunded)
        .bind(&line.size_modifier_id)
        .fetch_one(&self.pool)
        .await?;

        let id: Uuid = row.get("id");
        Ok(SalesLineId::from_uuid(id))
    }

    async fn find_sales_line(&self, id: SalesLineId) -> AppResult<Option<SalesLine>> {
        let row = sqlx::query(
            r#"
            SELECT id, location_id, source_system, source_location_id, business_date, sold_at,
                   receipt_id, line_id, pos_item_id, pos_item_name, quantity, is_voided, is_refunded,
                   size_modifier_id
            FROM sales_lines WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        row.map(Self::row_to_sales_line).transpose()
    }

    async fn list_sales_lines_for_location(
        &self,
        location_id: LocationId,
        from_ts: OffsetDateTime,
        to_ts: OffsetDateTime,
        limit: i64,
    ) -> AppResult<Vec<SalesLine>> {
        let rows = sqlx::query(
            r#"
            SELECT id, location_id, source_system, source_location_id, business_date, sold_at,
                   receipt_id, line_id, pos_item_id, pos_item_name, quantity, is_voided, is_refunded,
                   size_modifier_id
            FROM sales_lines
            WHERE location_id = $1 AND sold_at > $2 AND sold_at <= $3
            ORDER BY sold_at
            LIMIT $4
            "#,
        )
        .bind(location_id.as_uuid())
        .bind(from_ts)
        .bind(to_ts)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Self::row_to_sales_line).collect()
    }

    async fn create_recipe(&self, recipe: &Recipe) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO recipes (id, business_id, name, is_split_ratio) VALUES ($1, $2, $3, $4)",
        )
        .bind(recipe.id.as_uuid())
        .bind(recipe.business_id.as_uuid())
        .bind(&recipe.name)
        .bind(recipe.is_split_ratio)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_recipe(&self, id: RecipeId) -> AppResult<Option<Recipe>> {
        let row = sqlx::query("SELECT id, business_id, name, is_split_ratio FROM recipes WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Self::row_to_recipe))
    }

    async fn list_recipes_for_business(&self, business_id: BusinessId) -> AppResult<Vec<Recipe>> {
        let rows = sqlx::query(
            "SELECT id, business_id, name, is_split_ratio FROM recipes WHERE business_id = $1 ORDER BY name",
        )
        .bind(business_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Self::row_to_recipe).collect())
    }

    async fn create_recipe_ingredient(&self, ingredient: &RecipeIngredient) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO recipe_ingredients (id, recipe_id, inventory_item_id, quantity, uom, ratio)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(ingredient.id.as_uuid())
        .bind(ingredient.recipe_id.as_uuid())
        .bind(ingredient.inventory_item_id.as_uuid())
        .bind(ingredient.quantity)
        .bind(ingredient.uom.as_str())
        .bind(ingredient.ratio)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_ingredients_for_recipe(&self, recipe_id: RecipeId) -> AppResult<Vec<RecipeIngredient>> {
        let rows = sqlx::query(
            r#"
            SELECT id, recipe_id, inventory_item_id, quantity, uom, ratio
            FROM recipe_ingredients WHERE recipe_id = $1
            "#,
        )
        .bind(recipe_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Self::row_to_ingredient).collect()
    }

    async fn create_tap_line(&self, tap: &TapLine) -> AppResult<()> {
        sqlx::query("INSERT INTO tap_lines (id, location_id, name) VALUES ($1, $2, $3)")
            .bind(tap.id.as_uuid())
            .bind(tap.location_id.as_uuid())
            .bind(&tap.name)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_tap_lines_for_location(&self, location_id: LocationId) -> AppResult<Vec<TapLine>> {
        let rows = sqlx::query("SELECT id, location_id, name FROM tap_lines WHERE location_id = $1 ORDER BY name")
            .bind(location_id.as_uuid())
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Self::row_to_tap_line).collect())
    }

    async fn find_tap_line(&self, id: TapLineId) -> AppResult<Option<TapLine>> {
        let row = sqlx::query("SELECT id, location_id, name FROM tap_lines WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Self::row_to_tap_line))
    }

    async fn create_keg_instance(&self, keg: &KegInstance) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO keg_instances (id, location_id, inventory_item_id, starting_volume_ml, tapped_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(keg.id.as_uuid())
        .bind(keg.location_id.as_uuid())
        .bind(keg.inventory_item_id.as_uuid())
        .bind(keg.starting_volume_ml)
        .bind(keg.tapped_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_keg_instance(&self, id: KegInstanceId) -> AppResult<Option<KegInstance>> {
        let row = sqlx::query(
            "SELECT id, location_id, inventory_item_id, starting_volume_ml, tapped_at FROM keg_instances WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Self::row_to_keg_instance))
    }

    async fn insert_tap_assignment_closing_prior(&self, assignment: &TapAssignment) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE tap_assignments SET ended_ts = $2
            WHERE tap_line_id = $1 AND ended_ts IS NULL
            "#,
        )
        .bind(assignment.tap_line_id.as_uuid())
        .bind(assignment.started_ts)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO tap_assignments (id, tap_line_id, keg_instance_id, started_ts, ended_ts)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(assignment.id.as_uuid())
        .bind(assignment.tap_line_id.as_uuid())
        .bind(assignment.keg_instance_id.as_uuid())
        .bind(assignment.started_ts)
        .bind(assignment.ended_ts)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn list_tap_assignments(&self, tap_line_id: TapLineId) -> AppResult<Vec<TapAssignment>> {
        let rows = sqlx::query(
            r#"
            SELECT id, tap_line_id, keg_instance_id, started_ts, ended_ts
            FROM tap_assignments WHERE tap_line_id = $1 ORDER BY started_ts
            "#,
        )
        .bind(tap_line_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Self::row_to_tap_assignment).collect())
    }

    async fn find_active_tap_assignment(
        &self,
        tap_line_id: TapLineId,
        at_ts: OffsetDateTime,
    ) -> AppResult<Option<TapAssignment>> {
        let row = sqlx::query(
            r#"
            SELECT id, tap_line_id, keg_instance_id, started_ts, ended_ts
            FROM tap_assignments
            WHERE tap_line_id = $1 AND started_ts <= $2 AND (ended_ts IS NULL OR ended_ts > $2)
            "#,
        )
        .bind(tap_line_id.as_uuid())
        .bind(at_ts)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Self::row_to_tap_assignment))
    }
}
