use crate::domain::Location;
use crate::infrastructure::{LocationRepository, LocationRepositoryTrait};
use crate::shared::{AppResult, BusinessId, LocationId};

/// §3 Location CRUD. Thin on purpose: a location's only invariant is its
/// non-empty name, enforced by `Location::new` itself.
#[derive(Clone)]
pub struct LocationService {
    location_repo: LocationRepository,
}

impl LocationService {
    pub fn new(location_repo: LocationRepository) -> Self {
        Self { location_repo }
    }

    pub async fn create(&self, business_id: BusinessId, name: String, timezone: String) -> AppResult<Location> {
        let location = Location::new(business_id, name, timezone)?;
        self.location_repo.create(&location).await?;
        Ok(location)
    }

    pub async fn find(&self, id: LocationId) -> AppResult<Option<Location>> {
        self.location_repo.find_by_id(id).await
    }

    pub async fn list_for_business(&self, business_id: BusinessId) -> AppResult<Vec<Location>> {
        self.location_repo.list_for_business(business_id).await
    }
}
