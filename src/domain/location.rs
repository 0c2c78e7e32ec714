use crate::shared::{AppError, AppResult, BusinessId, LocationId};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A physical bar location owned exclusively by one `Business` (§3
/// Ownership). Items, mappings, sessions, ledger entries, taps/kegs, par
/// levels and purchase orders are all location-scoped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    pub business_id: BusinessId,
    pub name: String,
    /// IANA timezone name, used to resolve each location's local
    /// end-of-day time for the `/cron/end-of-day` auto-close pass.
    pub timezone: String,
    pub created_at: OffsetDateTime,
}

impl Location {
    pub fn new(business_id: BusinessId, name: String, timezone: String) -> AppResult<Self> {
        let trimmed = name.trim().to_string();
        if trimmed.is_empty() {
            return Err(AppError::validation("Location name cannot be empty"));
        }
        Ok(Self {
            id: LocationId::new(),
            business_id,
            name: trimmed,
            timezone,
            created_at: OffsetDateTime::now_utc(),
        })
    }

    pub fn from_parts(
        id: LocationId,
        business_id: BusinessId,
        name: String,
        timezone: String,
        created_at: OffsetDateTime,
    ) -> Self {
        Self {
            id,
            business_id,
            name,
            timezone,
            created_at,
        }
    }
}
