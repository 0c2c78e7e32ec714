use crate::domain::settings::{AutoLockPolicy, BusinessSettings, DepletionPrecedence};
use crate::infrastructure::{SettingsRepository, SettingsRepositoryTrait};
use crate::shared::{AppResult, BusinessId};

/// §4.13 settings document: variance threshold, depletion precedence,
/// session auto-lock — all business-scoped (§3 Ownership).
#[derive(Clone)]
pub struct SettingsService {
    settings_repo: SettingsRepository,
}

impl SettingsService {
    pub fn new(settings_repo: SettingsRepository) -> Self {
        Self { settings_repo }
    }

    /// Falls back to the documented defaults when a business has never
    /// written its own settings row.
    pub async fn get(&self, business_id: BusinessId) -> AppResult<BusinessSettings> {
        match self.settings_repo.find(business_id).await? {
            Some(settings) => Ok(settings),
            None => Ok(BusinessSettings::new(business_id)),
        }
    }

    pub async fn update_variance_threshold(
        &self,
        business_id: BusinessId,
        threshold_pct: f64,
    ) -> AppResult<BusinessSettings> {
        let current = self.get(business_id).await?;
        let updated = current.with_variance_threshold(threshold_pct)?;
        self.settings_repo.upsert(&updated).await?;
        Ok(updated)
    }

    pub async fn update_depletion_precedence(
        &self,
        business_id: BusinessId,
        precedence: DepletionPrecedence,
    ) -> AppResult<BusinessSettings> {
        let mut current = self.get(business_id).await?;
        current.depletion_precedence = precedence;
        self.settings_repo.upsert(&current).await?;
        Ok(current)
    }

    pub async fn update_auto_lock(
        &self,
        business_id: BusinessId,
        policy: AutoLockPolicy,
    ) -> AppResult<BusinessSettings> {
        let mut current = self.get(business_id).await?;
        current.session_auto_lock = policy;
        self.settings_repo.upsert(&current).await?;
        Ok(current)
    }
}
