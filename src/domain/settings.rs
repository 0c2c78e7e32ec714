use crate::shared::{AppError, AppResult, BusinessId};
use serde::{Deserialize, Serialize};

/// §9 Open Question: tap-flow vs POS precedence is decided per-location,
/// not globally, so a business with mixed draft setups can tune each bar
/// independently (decision recorded in the grounding ledger).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepletionPrecedence {
    PreferTapMeter,
    PreferPos,
}

/// Controls whether an open session auto-closes after inactivity, and how
/// long, since a forgotten open session would otherwise block depletion
/// reconciliation indefinitely (§4.5, §4.13 `CronConfig`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AutoLockPolicy {
    Disabled,
    AfterHours(f64),
}

impl AutoLockPolicy {
    pub fn after_hours(hours: f64) -> AppResult<Self> {
        if hours <= 0.0 || !hours.is_finite() {
            return Err(AppError::validation("Auto-lock window must be positive and finite"));
        }
        Ok(Self::AfterHours(hours))
    }
}

/// Business-wide configuration knobs (§3 Ownership note: settings are
/// business-scoped; §4.6 variance threshold; §4.1 precedence note).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessSettings {
    pub business_id: BusinessId,
    pub default_variance_threshold_pct: f64,
    pub depletion_precedence: DepletionPrecedence,
    pub session_auto_lock: AutoLockPolicy,
}

impl BusinessSettings {
    pub fn new(business_id: BusinessId) -> Self {
        Self {
            business_id,
            default_variance_threshold_pct: 10.0,
            depletion_precedence: DepletionPrecedence::PreferTapMeter,
            session_auto_lock: AutoLockPolicy::AfterHours(12.0),
        }
    }

    pub fn with_variance_threshold(mut self, pct: f64) -> AppResult<Self> {
        if pct < 0.0 || !pct.is_finite() {
            return Err(AppError::validation("Variance threshold must be finite and non-negative"));
        }
        self.default_variance_threshold_pct = pct;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_prefer_tap_meter() {
        let settings = BusinessSettings::new(BusinessId::new());
        assert_eq!(settings.depletion_precedence, DepletionPrecedence::PreferTapMeter);
        assert_eq!(settings.default_variance_threshold_pct, 10.0);
    }

    #[test]
    fn auto_lock_rejects_non_positive_hours() {
        assert!(AutoLockPolicy::after_hours(0.0).is_err());
        assert!(AutoLockPolicy::after_hours(8.0).is_ok());
    }
}
