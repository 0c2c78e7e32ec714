use barstock::application::{
    AddLineCommand, AppendCommand, CatalogService, DepletionPassSummary, DepletionService,
    ExpectedService, LedgerService, MappingService, SessionEventBus, SessionService,
};
use barstock::domain::catalog::CountingMethod;
use barstock::domain::ledger::{ConfidenceLevel, EventType, SourceSystem};
use barstock::domain::mapping::{MappingMode, SalesLine};
use barstock::domain::measurement::Uom;
use barstock::domain::session::{QuantityForm, SessionType, VarianceReason};
use barstock::infrastructure::{
    CatalogRepository, LedgerRepository, LocationRepository, MappingRepository, SessionRepository,
    SettingsRepository,
};
use barstock::shared::{AppError, BusinessId, LocationId, SalesLineId, UserId};
use sqlx::postgres::PgPoolOptions;
use time::OffsetDateTime;
use uuid::Uuid;

/// Inserts the tenancy rows every scenario needs (business, location) via
/// raw SQL, mirroring how the catalog/session services expect them to
/// already exist.
async fn seed_location(pool: &sqlx::PgPool) -> LocationId {
    let business_id = BusinessId::new();
    let location_id = LocationId::new();

    sqlx::query("INSERT INTO businesses (id, name, created_at) VALUES ($1, $2, $3)")
        .bind(business_id.as_uuid())
        .bind("Test Business")
        .bind(OffsetDateTime::now_utc())
        .execute(pool)
        .await
        .expect("failed to insert business");

    sqlx::query("INSERT INTO locations (id, business_id, name, timezone, created_at) VALUES ($1, $2, $3, $4, $5)")
        .bind(location_id.as_uuid())
        .bind(business_id.as_uuid())
        .bind("Test Bar")
        .bind("America/New_York")
        .bind(OffsetDateTime::now_utc())
        .execute(pool)
        .await
        .expect("failed to insert location");

    location_id
}

async fn connect() -> sqlx::PgPool {
    dotenvy::dotenv().ok();
    let db_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    PgPoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await
        .expect("failed to connect to DB")
}

fn sales_line(location_id: LocationId, pos_item_id: &str, quantity: f64, sold_at: OffsetDateTime) -> SalesLine {
    SalesLine {
        id: SalesLineId::new(),
        location_id,
        source_system: SourceSystem::Toast,
        source_location_id: "loc-1".into(),
        business_date: sold_at.date(),
        sold_at,
        receipt_id: format!("receipt-{}", Uuid::new_v4()),
        line_id: format!("line-{}", Uuid::new_v4()),
        pos_item_id: pos_item_id.to_string(),
        pos_item_name: pos_item_id.to_string(),
        quantity,
        is_voided: false,
        is_refunded: false,
        size_modifier_id: None,
    }
}

/// §8 Scenario A: a direct-mapped 1oz pour sold 3x depletes the item's
/// base-UOM ledger by the oz->ml converted amount, and re-ingesting the
/// same line is a no-op.
#[tokio::test]
async fn scenario_a_direct_mapped_sale_depletes_in_base_uom_and_is_idempotent() {
    let pool = connect().await;
    let location_id = seed_location(&pool).await;

    let catalog_service = CatalogService::new(CatalogRepository::new(pool.clone()));
    let mapping_service = MappingService::new(MappingRepository::new(pool.clone()));
    let depletion_service = DepletionService::new(
        MappingRepository::new(pool.clone()),
        CatalogRepository::new(pool.clone()),
        LedgerRepository::new(pool.clone()),
        SettingsRepository::new(pool.clone()),
        100,
    );
    let expected_service = ExpectedService::new(LedgerRepository::new(pool.clone()));
    let ledger_service = LedgerService::new(LedgerRepository::new(pool.clone()), CatalogRepository::new(pool.clone()));

    let category = catalog_service
        .create_category(BusinessId::new(), "Whiskey".into(), CountingMethod::Weighable, Some(1.0))
        .await
        .expect("create category");
    let jameson = catalog_service
        .create_item(location_id, "Jameson".into(), None, category.id, Uom::Ml, Some(750.0), None, None)
        .await
        .expect("create item");

    let t0 = OffsetDateTime::now_utc() - time::Duration::days(1);
    ledger_service
        .append(AppendCommand {
            location_id,
            inventory_item_id: jameson.id,
            event_type: EventType::Receiving,
            source_system: SourceSystem::Manual,
            quantity_delta: 2000.0,
            uom: Uom::Ml,
            confidence_level: ConfidenceLevel::Measured,
            event_ts: Some(t0),
            session_id: None,
            recipe_id: None,
            sales_line_ref: None,
            notes: Some("seed receiving".into()),
            variance_reason: None,
        })
        .await
        .expect("seed receiving entry");

    let t = t0 + time::Duration::hours(1);
    mapping_service
        .create_direct_mapping(location_id, SourceSystem::Toast, "pos_jameson_1oz".into(), jameson.id, 1.0, t0)
        .await
        .expect("create direct mapping");

    let line = depletion_service
        .ingest_sales_line(sales_line(location_id, "pos_jameson_1oz", 3.0, t))
        .await
        .expect("ingest sales line");

    let summary: DepletionPassSummary = depletion_service
        .run_depletion_pass(BusinessId::new(), location_id, t0, t + time::Duration::seconds(1))
        .await
        .expect("run depletion pass");
    assert_eq!(summary.depleted, 1);
    assert_eq!(summary.unmapped, 0);

    let after_one_pass = expected_service
        .expected_on_hand(jameson.id, t + time::Duration::seconds(1))
        .await
        .expect("expected on hand");
    assert!(
        (after_one_pass - 1911.28).abs() < 0.01,
        "expected ~1911.28 ml on hand, got {after_one_pass}"
    );

    // Re-ingesting the same line and re-running the pass must not double-deplete.
    depletion_service
        .ingest_sales_line(SalesLine { id: line.id, ..sales_line(location_id, "pos_jameson_1oz", 3.0, t) })
        .await
        .expect("re-ingest sales line");
    let second_summary = depletion_service
        .run_depletion_pass(BusinessId::new(), location_id, t0, t + time::Duration::seconds(1))
        .await
        .expect("re-run depletion pass");
    assert_eq!(second_summary.depleted, 1);

    let after_second_pass = expected_service
        .expected_on_hand(jameson.id, t + time::Duration::seconds(1))
        .await
        .expect("expected on hand after replay");
    assert!(
        (after_second_pass - after_one_pass).abs() < 1e-6,
        "replaying the same window must not change expected_on_hand"
    );
}

/// §8 Scenario E: a split-ratio recipe (60% silver / 40% gold over a 1.5oz
/// shot) sold at quantity=2 writes two entries whose magnitudes sum to the
/// theoretical 3.0oz total.
#[tokio::test]
async fn scenario_e_split_ratio_sale_splits_by_recipe_ratio() {
    let pool = connect().await;
    let location_id = seed_location(&pool).await;

    let catalog_service = CatalogService::new(CatalogRepository::new(pool.clone()));
    let mapping_service = MappingService::new(MappingRepository::new(pool.clone()));
    let depletion_service = DepletionService::new(
        MappingRepository::new(pool.clone()),
        CatalogRepository::new(pool.clone()),
        LedgerRepository::new(pool.clone()),
        SettingsRepository::new(pool.clone()),
        100,
    );
    let ledger_repo = LedgerRepository::new(pool.clone());

    let category = catalog_service
        .create_category(BusinessId::new(), "Tequila".into(), CountingMethod::Weighable, Some(0.95))
        .await
        .expect("create category");
    let silver = catalog_service
        .create_item(location_id, "Silver Tequila".into(), None, category.id, Uom::Ml, Some(750.0), None, None)
        .await
        .expect("create silver item");
    let gold = catalog_service
        .create_item(location_id, "Gold Tequila".into(), None, category.id, Uom::Ml, Some(750.0), None, None)
        .await
        .expect("create gold item");

    let recipe = mapping_service
        .create_recipe(BusinessId::new(), "Rail Tequila Shot".into(), true)
        .await
        .expect("create recipe");
    mapping_service
        .add_ratio_ingredient(recipe.id, silver.id, 0.6, Uom::Oz)
        .await
        .expect("add silver ratio");
    mapping_service
        .add_ratio_ingredient(recipe.id, gold.id, 0.4, Uom::Oz)
        .await
        .expect("add gold ratio");

    let t0 = OffsetDateTime::now_utc() - time::Duration::hours(1);
    mapping_service
        .create_recipe_mapping(
            location_id,
            SourceSystem::Toast,
            "rail_tequila_shot".into(),
            MappingMode::SplitRatio,
            recipe.id,
            t0,
        )
        .await
        .expect("create split-ratio mapping");

    let t = t0 + time::Duration::minutes(10);
    depletion_service
        .ingest_sales_line(sales_line(location_id, "rail_tequila_shot", 2.0, t))
        .await
        .expect("ingest sales line");

    let summary = depletion_service
        .run_depletion_pass(BusinessId::new(), location_id, t0, t + time::Duration::seconds(1))
        .await
        .expect("run depletion pass");
    assert_eq!(summary.depleted, 1);

    let silver_delta = ledger_repo
        .sum_signed_delta(silver.id, t0, t + time::Duration::seconds(1))
        .await
        .expect("silver delta");
    let gold_delta = ledger_repo
        .sum_signed_delta(gold.id, t0, t + time::Duration::seconds(1))
        .await
        .expect("gold delta");

    let silver_oz = Uom::Ml.convert(silver_delta, Uom::Oz, None).expect("convert silver to oz");
    let gold_oz = Uom::Ml.convert(gold_delta, Uom::Oz, None).expect("convert gold to oz");

    assert!((silver_oz - -1.8).abs() < 0.01, "silver delta should be -1.8oz, got {silver_oz}");
    assert!((gold_oz - -1.2).abs() < 0.01, "gold delta should be -1.2oz, got {gold_oz}");
    assert!((silver_oz + gold_oz + 3.0).abs() < 0.01, "split-ratio total should equal theoretical 3.0oz");
}

/// §8 Scenario C: closing a session with an unexplained variance over
/// threshold fails closed; once a reason is attached, close succeeds and
/// writes a reconciling `inventory_count_adjustment`.
#[tokio::test]
async fn scenario_c_session_close_gates_on_variance_reasons() {
    let pool = connect().await;
    let location_id = seed_location(&pool).await;
    let business_id = sqlx::query_scalar::<_, Uuid>("SELECT business_id FROM locations WHERE id = $1")
        .bind(location_id.as_uuid())
        .fetch_one(&pool)
        .await
        .expect("fetch business id for location");
    let business_id = BusinessId::from_uuid(business_id);

    let catalog_service = CatalogService::new(CatalogRepository::new(pool.clone()));
    let ledger_service = LedgerService::new(LedgerRepository::new(pool.clone()), CatalogRepository::new(pool.clone()));
    let session_service = SessionService::new(
        SessionRepository::new(pool.clone()),
        LedgerRepository::new(pool.clone()),
        CatalogRepository::new(pool.clone()),
        LocationRepository::new(pool.clone()),
        SettingsRepository::new(pool.clone()),
        SessionEventBus::new(),
    );
    let category = catalog_service
        .create_category(business_id, "Vodka".into(), CountingMethod::UnitCount, None)
        .await
        .expect("create category");
    let item_x = catalog_service
        .create_item(location_id, "Item X".into(), None, category.id, Uom::Unit, None, None, None)
        .await
        .expect("create item x");

    let user_id = UserId::new();
    sqlx::query("INSERT INTO users (id, business_id, email, password_hash, display_name, created_at) VALUES ($1, $2, $3, $4, $5, $6)")
        .bind(user_id.as_uuid())
        .bind(business_id.as_uuid())
        .bind(format!("counter-{}@example.com", Uuid::new_v4()))
        .bind("hash")
        .bind("Counter")
        .bind(OffsetDateTime::now_utc())
        .execute(&pool)
        .await
        .expect("insert user");

    ledger_service
        .append(AppendCommand {
            location_id,
            inventory_item_id: item_x.id,
            event_type: EventType::Receiving,
            source_system: SourceSystem::Manual,
            quantity_delta: 100.0,
            uom: Uom::Unit,
            confidence_level: ConfidenceLevel::Measured,
            event_ts: None,
            session_id: None,
            recipe_id: None,
            sales_line_ref: None,
            notes: Some("seed receiving".into()),
            variance_reason: None,
        })
        .await
        .expect("seed receiving entry for item x");

    let session = session_service
        .create_session(location_id, SessionType::Spot, user_id)
        .await
        .expect("create session");
    session_service
        .add_line(AddLineCommand {
            session_id: session.id,
            inventory_item_id: item_x.id,
            sub_area: None,
            raw_form: QuantityForm::UnitCount { units: 80.0 },
            counted_by: user_id,
        })
        .await
        .expect("add counted line");

    let gated = session_service.close(session.id, user_id).await;
    assert!(
        matches!(gated, Err(AppError::VarianceReasonsRequired(ref ids)) if ids == &vec![item_x.id]),
        "closing with an unexplained 20% variance against a 10% threshold must fail closed"
    );

    session_service
        .add_variance_reason(session.id, item_x.id, VarianceReason::Theft, None, user_id)
        .await
        .expect("attach variance reason");

    let summary = session_service.close(session.id, user_id).await.expect("close after reason attached");
    assert_eq!(summary.adjustments_written, 1);

    let expected_after = ledger_service
        .query(item_x.id, OffsetDateTime::UNIX_EPOCH, OffsetDateTime::now_utc())
        .await
        .expect("query ledger for item x");
    let adjustment = expected_after
        .iter()
        .find(|e| e.event_type == EventType::InventoryCountAdjustment)
        .expect("an inventory_count_adjustment entry was written");
    assert!((adjustment.quantity_delta.value() + 20.0).abs() < 1e-6, "adjustment delta should be -20");
}
