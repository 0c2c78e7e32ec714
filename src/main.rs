use barstock::application::{
    AlertService, AuditService, AuthService, CatalogService, DepletionService, ExpectedService,
    LedgerService, LocationService, MappingService, ParService, PatternService, SessionEventBus,
    SessionService, SettingsService, UserService,
};
use barstock::infrastructure::{Config, JwtService, PasswordHasher, Repositories};
use barstock::interfaces::http::routes::create_router;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_target(false)
        .compact()
        .init();

    tracing::info!("Starting Barstock...");
    tracing::info!("Environment: DATABASE_URL present = {}", std::env::var("DATABASE_URL").is_ok());
    tracing::info!("Environment: JWT_SECRET present = {}", std::env::var("JWT_SECRET").is_ok());
    tracing::info!("Environment: PORT = {}", std::env::var("PORT").unwrap_or_else(|_| "not set".to_string()));

    let config = match Config::from_env() {
        Ok(c) => {
            tracing::info!("Configuration loaded successfully");
            c
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e);
        }
    };

    tracing::info!("Server will bind to: {}", config.server_address());

    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(3))
        .connect(&config.database.url)
        .await
        .map_err(|e| {
            tracing::error!("Database connection failed: {}", e);
            e
        })?;
    tracing::info!("Database connection pool established");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations completed");

    let repositories = Repositories::new(pool);

    let password_hasher = PasswordHasher::new();
    let jwt_service = JwtService::new(
        config.jwt.secret.clone(),
        config.jwt.issuer.clone(),
        config.jwt.access_token_ttl_minutes,
        config.jwt.refresh_token_ttl_days,
    );

    // §4.10 scaffolding: auth, identity, and role lookups every other
    // service is authorized against.
    let auth_service = AuthService::new(
        repositories.user.clone(),
        repositories.business.clone(),
        repositories.refresh_token.clone(),
        repositories.role.clone(),
        password_hasher,
        jwt_service.clone(),
    );
    let user_service = UserService::new(
        repositories.user.clone(),
        repositories.business.clone(),
        repositories.role.clone(),
    );
    let location_service = LocationService::new(repositories.location.clone());
    let audit_service = AuditService::new(repositories.audit.clone());
    let settings_service = SettingsService::new(repositories.settings.clone());

    // §4.2 catalog/mapping — the items, recipes, taps and kegs everything
    // downstream resolves against.
    let catalog_service = CatalogService::new(repositories.catalog.clone());
    let mapping_service = MappingService::new(repositories.mapping.clone());

    // §4.1/4.6 ledger + expected-on-hand — the core read/write surface
    // every derived engine below is built on.
    let ledger_service = LedgerService::new(repositories.ledger.clone(), repositories.catalog.clone());
    let expected_service = ExpectedService::new(repositories.ledger.clone());

    // §4.4 depletion engine: POS/tap ingestion -> ledger, via mapping.
    let depletion_service = DepletionService::new(
        repositories.mapping.clone(),
        repositories.catalog.clone(),
        repositories.ledger.clone(),
        repositories.settings.clone(),
        config.depletion.batch_size,
    );

    // §4.5 session engine: physical counts -> reconciling ledger entries.
    // `SessionEventBus` backs the `sessions.subscribe` live-update stream
    // (§6, §9) — a pure in-process pub/sub, never the source of truth.
    let session_events = SessionEventBus::new();
    let session_service = SessionService::new(
        repositories.session.clone(),
        repositories.ledger.clone(),
        repositories.catalog.clone(),
        repositories.location.clone(),
        repositories.settings.clone(),
        session_events,
    );

    // §4.7 par/reorder, §4.8 pattern detection — both read expected-on-hand
    // and ledger history built above.
    let par_service = ParService::new(
        repositories.par.clone(),
        expected_service.clone(),
        ledger_service.clone(),
    );
    let pattern_service = PatternService::new(repositories.ledger.clone(), repositories.catalog.clone());

    // §4.9 alert dispatcher sits on top of par + pattern snapshots.
    let alert_service = AlertService::new(
        repositories.notification.clone(),
        repositories.role.clone(),
        repositories.location.clone(),
        repositories.session.clone(),
        par_service.clone(),
        pattern_service.clone(),
    );

    let cors_origins = config.cors.allowed_origins.clone();
    let cron_config = config.cron.clone();

    let app = create_router(
        auth_service,
        user_service,
        location_service,
        catalog_service,
        mapping_service,
        depletion_service,
        session_service,
        expected_service,
        par_service,
        pattern_service,
        alert_service,
        settings_service,
        audit_service,
        repositories.notification.clone(),
        repositories.par.clone(),
        repositories.role.clone(),
        repositories.location.clone(),
        repositories.session.clone(),
        jwt_service,
        cron_config,
        cors_origins,
    );

    let addr = config.server_address();
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
