pub mod audit_repository;
pub mod business_repository;
pub mod catalog_repository;
pub mod ledger_repository;
pub mod location_repository;
pub mod mapping_repository;
pub mod notification_repository;
pub mod par_repository;
pub mod refresh_token_repository;
pub mod role_repository;
pub mod session_repository;
pub mod settings_repository;
pub mod user_repository;

pub use audit_repository::*;
pub use business_repository::*;
pub use catalog_repository::*;
pub use ledger_repository::*;
pub use location_repository::*;
pub use mapping_repository::*;
pub use notification_repository::*;
pub use par_repository::*;
pub use refresh_token_repository::*;
pub use role_repository::*;
pub use session_repository::*;
pub use settings_repository::*;
pub use user_repository::*;

use sqlx::PgPool;

/// Every repository, constructed once at startup and cloned (cheaply —
/// each just wraps a `PgPool`) into each `application` service that needs
/// it (§4.13).
#[derive(Clone)]
pub struct Repositories {
    pub pool: PgPool,
    pub business: BusinessRepository,
    pub user: UserRepository,
    pub refresh_token: RefreshTokenRepository,
    pub role: RoleRepository,
    pub location: LocationRepository,
    pub catalog: CatalogRepository,
    pub ledger: LedgerRepository,
    pub mapping: MappingRepository,
    pub session: SessionRepository,
    pub settings: SettingsRepository,
    pub par: ParRepository,
    pub notification: NotificationRepository,
    pub audit: AuditRepository,
}

impl Repositories {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: pool.clone(),
            business: BusinessRepository::new(pool.clone()),
            user: UserRepository::new(pool.clone()),
            refresh_token: RefreshTokenRepository::new(pool.clone()),
            role: RoleRepository::new(pool.clone()),
            location: LocationRepository::new(pool.clone()),
            catalog: CatalogRepository::new(pool.clone()),
            ledger: LedgerRepository::new(pool.clone()),
            mapping: MappingRepository::new(pool.clone()),
            session: SessionRepository::new(pool.clone()),
            settings: SettingsRepository::new(pool.clone()),
            par: ParRepository::new(pool.clone()),
            notification: NotificationRepository::new(pool.clone()),
            audit: AuditRepository::new(pool),
        }
    }
}
