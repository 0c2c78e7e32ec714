use crate::application::{
    AlertService, AuditService, AuthService, CatalogService, DepletionService, ExpectedService,
    LocationService, MappingService, ParService, PatternService, SessionService, SettingsService,
    UserService,
};
use crate::infrastructure::{
    CronConfig, JwtService, LocationRepository, NotificationRepository, ParRepository,
    RoleRepository, SessionRepository,
};
use crate::interfaces::http::{
    audit::{list_for_business_handler, list_for_entity_handler, AuditState},
    auth::{login_handler, refresh_handler, register_handler},
    businesses,
    catalog::{
        create_bottle_template_handler, create_category_handler, create_item_handler,
        create_vendor_handler, current_price_handler, deactivate_item_handler,
        find_item_by_barcode_handler, get_bottle_template_handler, get_item_handler,
        list_categories_handler, list_items_handler, list_vendors_handler, record_price_handler,
        CatalogState,
    },
    cron::{end_of_day_handler, evaluate_alerts_handler, CronState},
    health::health_check,
    locations::{create_location_handler, get_location_handler, list_locations_handler, LocationsState},
    mapping::{
        add_ingredient_handler, assign_keg_to_tap_handler, create_direct_mapping_handler,
        create_draft_by_tap_mapping_handler, create_keg_instance_handler, create_recipe_handler,
        create_recipe_mapping_handler, create_tap_line_handler, list_ingredients_handler,
        list_mappings_handler, list_tap_lines_handler, MappingState,
    },
    middleware::AuthUser,
    notifications::{
        evaluate_business_handler, evaluate_location_handler, list_my_notifications_handler,
        mark_read_handler, upsert_rule_handler, NotificationsState,
    },
    par_levels::{create_par_level_handler, suggest_reorders_handler, ParLevelsState},
    pos::{
        append_manual_depletion_handler, import_sales_lines_handler, ingest_sales_line_handler,
        ingest_tap_meter_reading_handler, run_depletion_pass_handler, PosState,
    },
    product_guide::{product_guide_handler, ProductGuideState},
    purchase_orders::{
        cancel_purchase_order_handler, create_purchase_order_handler, list_po_lines_handler,
        list_purchase_orders_handler, record_pickup_handler, send_purchase_order_handler,
        PurchaseOrdersState,
    },
    reports::{
        expected_snapshot_handler, location_variance_report_handler, shrinkage_suspects_handler,
        variance_snapshot_handler, ReportsState,
    },
    scale::{convert_weigh_reading_handler, ScaleState},
    sessions::{
        add_line_handler, add_variance_reason_handler, close_session_handler,
        create_session_handler, join_participant_handler, list_lines_handler,
        list_participants_handler, subscribe_events_handler, SessionsState,
    },
    settings::{
        get_settings_handler, update_auto_lock_handler, update_depletion_precedence_handler,
        update_variance_threshold_handler, SettingsState,
    },
    user::{grant_role_handler, me_handler, revoke_role_handler, update_avatar_handler, UserRolesState},
};
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, Method},
    middleware::{self, Next},
    response::Response,
    routing::get,
    Router,
};
use tower_http::cors::CorsLayer;

/// Wires every `application` service into its router (§6 RPC surface,
/// grouped into: auth, inventory, sessions, pos, scale, recipes/mapping,
/// parLevels, purchaseOrders, reports, notifications, settings, businesses,
/// locations, users, audit, and the cron sweep entrypoints).
#[allow(clippy::too_many_arguments)]
pub fn create_router(
    auth_service: AuthService,
    user_service: UserService,
    location_service: LocationService,
    catalog_service: CatalogService,
    mapping_service: MappingService,
    depletion_service: DepletionService,
    session_service: SessionService,
    expected_service: ExpectedService,
    par_service: ParService,
    pattern_service: PatternService,
    alert_service: AlertService,
    settings_service: SettingsService,
    audit_service: AuditService,
    notification_repo: NotificationRepository,
    par_repo: ParRepository,
    role_repo: RoleRepository,
    location_repo: LocationRepository,
    session_repo: SessionRepository,
    jwt_service: JwtService,
    cron_config: CronConfig,
    allowed_origins: Vec<String>,
) -> Router {
    let cors = if allowed_origins.iter().any(|o| o == "*") {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(
                allowed_origins
                    .iter()
                    .filter_map(|origin| origin.parse().ok())
                    .collect::<Vec<_>>(),
            )
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            .allow_credentials(true)
    };

    let auth_routes = Router::new()
        .route("/register", axum::routing::post(register_handler))
        .route("/login", axum::routing::post(login_handler))
        .route("/refresh", axum::routing::post(refresh_handler))
        .with_state(auth_service);

    // The public, unauthenticated product guide (§6) — no JWT middleware,
    // no role check.
    let public_routes = Router::new()
        .route("/locations/:location_id/menu", get(product_guide_handler))
        .with_state(ProductGuideState { catalog_service: catalog_service.clone() });

    // `/cron/*` is gated by `CronCaller`'s shared secret, never a user JWT
    // (§4.5 AutoClose, §4.9 scheduled alert sweep, §6 cron entrypoints).
    let cron_state = CronState {
        session_service: session_service.clone(),
        location_repo: location_repo.clone(),
        session_repo: session_repo.clone(),
        alert_service: alert_service.clone(),
    };
    let cron_routes = Router::new()
        .route("/:business_id/end-of-day", axum::routing::post(end_of_day_handler))
        .route("/:business_id/alerts", axum::routing::post(evaluate_alerts_handler))
        .with_state(cron_state)
        .layer(middleware::from_fn_with_state(cron_config.clone(), inject_cron_config));

    let users_routes = Router::new()
        .route("/me", get(me_handler))
        .route("/me/avatar", axum::routing::put(update_avatar_handler))
        .with_state(user_service.clone())
        .merge(
            Router::new()
                .route("/roles", axum::routing::post(grant_role_handler))
                .route("/roles", axum::routing::delete(revoke_role_handler))
                .with_state(UserRolesState {
                    user_service: user_service.clone(),
                    role_repo: role_repo.clone(),
                    audit_service: audit_service.clone(),
                }),
        );

    let businesses_routes = Router::new()
        .route("/me", get(businesses::me_handler))
        .with_state(user_service.clone());

    let locations_routes = Router::new()
        .route("/", axum::routing::post(create_location_handler))
        .route("/", get(list_locations_handler))
        .route("/:location_id", get(get_location_handler))
        .with_state(LocationsState {
            location_service: location_service.clone(),
            role_repo: role_repo.clone(),
        });

    let catalog_state = CatalogState {
        catalog_service: catalog_service.clone(),
        role_repo: role_repo.clone(),
    };
    let catalog_routes = Router::new()
        .route("/categories", axum::routing::post(create_category_handler))
        .route("/categories", get(list_categories_handler))
        .route("/vendors", axum::routing::post(create_vendor_handler))
        .route("/vendors", get(list_vendors_handler))
        .route("/items", axum::routing::post(create_item_handler))
        .route("/items", get(list_items_handler))
        .route("/items/barcode", get(find_item_by_barcode_handler))
        .route("/items/:item_id", get(get_item_handler))
        .route("/items/:item_id", axum::routing::delete(deactivate_item_handler))
        .route("/items/:item_id/bottle-template", axum::routing::post(create_bottle_template_handler))
        .route("/items/:item_id/bottle-template", get(get_bottle_template_handler))
        .route("/items/:item_id/price", axum::routing::post(record_price_handler))
        .route("/items/:item_id/price", get(current_price_handler))
        .with_state(catalog_state);

    let mapping_routes = Router::new()
        .route("/direct", axum::routing::post(create_direct_mapping_handler))
        .route("/draft-by-tap", axum::routing::post(create_draft_by_tap_mapping_handler))
        .route("/recipe", axum::routing::post(create_recipe_mapping_handler))
        .route("/", get(list_mappings_handler))
        .route("/recipes", axum::routing::post(create_recipe_handler))
        .route("/recipes/:recipe_id/ingredients", axum::routing::post(add_ingredient_handler))
        .route("/recipes/:recipe_id/ingredients", get(list_ingredients_handler))
        .route("/taps", axum::routing::post(create_tap_line_handler))
        .route("/taps", get(list_tap_lines_handler))
        .route("/taps/:tap_line_id/assignments", axum::routing::post(assign_keg_to_tap_handler))
        .route("/kegs", axum::routing::post(create_keg_instance_handler))
        .with_state(MappingState {
            mapping_service: mapping_service.clone(),
            role_repo: role_repo.clone(),
        });

    let pos_routes = Router::new()
        .route("/sales-lines", axum::routing::post(ingest_sales_line_handler))
        .route("/sales-lines/import", axum::routing::post(import_sales_lines_handler))
        .route("/tap-readings", axum::routing::post(ingest_tap_meter_reading_handler))
        .route("/locations/:location_id/depletion-pass", axum::routing::post(run_depletion_pass_handler))
        .route("/manual-depletion", axum::routing::post(append_manual_depletion_handler))
        .with_state(PosState {
            depletion_service: depletion_service.clone(),
            role_repo: role_repo.clone(),
            audit_service: audit_service.clone(),
        });

    let scale_routes = Router::new()
        .route("/weigh", axum::routing::post(convert_weigh_reading_handler))
        .with_state(ScaleState {
            catalog_service: catalog_service.clone(),
            role_repo: role_repo.clone(),
        });

    let sessions_routes = Router::new()
        .route("/", axum::routing::post(create_session_handler))
        .route("/:session_id/participants", axum::routing::post(join_participant_handler))
        .route("/:session_id/participants", get(list_participants_handler))
        .route("/:session_id/lines", axum::routing::post(add_line_handler))
        .route("/:session_id/lines", get(list_lines_handler))
        .route("/:session_id/variance-reasons", axum::routing::post(add_variance_reason_handler))
        .route("/:session_id/close", axum::routing::post(close_session_handler))
        .route("/:session_id/events", get(subscribe_events_handler))
        .with_state(SessionsState {
            session_service: session_service.clone(),
            role_repo: role_repo.clone(),
            audit_service: audit_service.clone(),
        });

    let par_levels_routes = Router::new()
        .route("/", axum::routing::post(create_par_level_handler))
        .route("/suggestions", get(suggest_reorders_handler))
        .with_state(ParLevelsState {
            par_service: par_service.clone(),
            role_repo: role_repo.clone(),
        });

    let purchase_orders_routes = Router::new()
        .route("/", axum::routing::post(create_purchase_order_handler))
        .route("/", get(list_purchase_orders_handler))
        .route("/:purchase_order_id/send", axum::routing::post(send_purchase_order_handler))
        .route("/:purchase_order_id/cancel", axum::routing::post(cancel_purchase_order_handler))
        .route("/:purchase_order_id/pickup", axum::routing::post(record_pickup_handler))
        .route("/:purchase_order_id/lines", get(list_po_lines_handler))
        .with_state(PurchaseOrdersState {
            par_service: par_service.clone(),
            par_repo: par_repo.clone(),
            role_repo: role_repo.clone(),
        });

    let reports_routes = Router::new()
        .route("/locations/:location_id/items/:item_id/expected", get(expected_snapshot_handler))
        .route("/locations/:location_id/items/:item_id/variance", get(variance_snapshot_handler))
        .route("/locations/:location_id/variance", get(location_variance_report_handler))
        .route("/locations/:location_id/shrinkage-suspects", get(shrinkage_suspects_handler))
        .with_state(ReportsState {
            expected_service: expected_service.clone(),
            pattern_service: pattern_service.clone(),
            settings_service: settings_service.clone(),
            role_repo: role_repo.clone(),
        });

    let notifications_routes = Router::new()
        .route("/rules", axum::routing::post(upsert_rule_handler))
        .route("/evaluate", axum::routing::post(evaluate_business_handler))
        .route("/locations/:location_id/evaluate", axum::routing::post(evaluate_location_handler))
        .route("/", get(list_my_notifications_handler))
        .route("/:notification_id/read", axum::routing::post(mark_read_handler))
        .with_state(NotificationsState {
            alert_service: alert_service.clone(),
            notification_repo: notification_repo.clone(),
            role_repo: role_repo.clone(),
        });

    let settings_routes = Router::new()
        .route("/", get(get_settings_handler))
        .route("/variance-threshold", axum::routing::put(update_variance_threshold_handler))
        .route("/depletion-precedence", axum::routing::put(update_depletion_precedence_handler))
        .route("/auto-lock", axum::routing::put(update_auto_lock_handler))
        .with_state(SettingsState {
            settings_service: settings_service.clone(),
            role_repo: role_repo.clone(),
        });

    let audit_routes = Router::new()
        .route("/", get(list_for_business_handler))
        .route("/:entity_type/:entity_id", get(list_for_entity_handler))
        .with_state(AuditState {
            audit_service: audit_service.clone(),
            role_repo: role_repo.clone(),
        });

    // Every route below requires a bearer token (§4.10 point 1: tenant
    // scope is implicit in the token's `business_id` claim).
    let jwt_middleware = middleware::from_fn_with_state(jwt_service.clone(), inject_jwt_and_resolve_auth_user);

    let protected_routes = Router::new()
        .nest("/users", users_routes)
        .nest("/businesses", businesses_routes)
        .nest("/locations", locations_routes)
        .nest("/catalog", catalog_routes)
        .nest("/mapping", mapping_routes)
        .nest("/pos", pos_routes)
        .nest("/scale", scale_routes)
        .nest("/sessions", sessions_routes)
        .nest("/par-levels", par_levels_routes)
        .nest("/purchase-orders", purchase_orders_routes)
        .nest("/reports", reports_routes)
        .nest("/notifications", notifications_routes)
        .nest("/settings", settings_routes)
        .nest("/audit", audit_routes)
        .layer(jwt_middleware);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/auth", auth_routes)
        .nest("/api/public", public_routes)
        .nest("/cron", cron_routes)
        .nest("/api", protected_routes)
        .layer(cors)
}

/// Makes the `JwtService` reachable to the `AuthUser` extractor (which
/// reads it from request extensions, not router state, since it's shared
/// across every nested sub-router rather than scoped to one).
async fn inject_jwt_and_resolve_auth_user(
    State(jwt_service): State<JwtService>,
    req: Request,
    next: Next,
) -> Response {
    let (mut parts, body) = req.into_parts();
    parts.extensions.insert(jwt_service);

    if let Ok(auth_user) = AuthUser::from_request_parts(&mut parts, &()).await {
        parts.extensions.insert(auth_user);
    }
    let req = Request::from_parts(parts, body);

    next.run(req).await
}

async fn inject_cron_config(
    State(cron_config): State<CronConfig>,
    mut req: Request,
    next: Next,
) -> Response {
    req.extensions_mut().insert(cron_config);
    next.run(req).await
}
