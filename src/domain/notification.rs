use crate::shared::{
    AppError, AppResult, BusinessId, InventoryItemId, LocationId, NotificationId, UserId,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// §3 AlertRule.rule_type — the conditions the alert scheduler evaluates
/// against current state (§4.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertRuleType {
    BelowReorderPoint,
    VarianceExceedsThreshold,
    ShrinkageSuspectConfirmed,
    SessionOverdue,
}

impl AlertRuleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BelowReorderPoint => "below_reorder_point",
            Self::VarianceExceedsThreshold => "variance_exceeds_threshold",
            Self::ShrinkageSuspectConfirmed => "shrinkage_suspect_confirmed",
            Self::SessionOverdue => "session_overdue",
        }
    }

    pub fn from_str(s: &str) -> AppResult<Self> {
        match s {
            "below_reorder_point" => Ok(Self::BelowReorderPoint),
            "variance_exceeds_threshold" => Ok(Self::VarianceExceedsThreshold),
            "shrinkage_suspect_confirmed" => Ok(Self::ShrinkageSuspectConfirmed),
            "session_overdue" => Ok(Self::SessionOverdue),
            _ => Err(AppError::validation(format!("Invalid alert rule type: {s}"))),
        }
    }
}

/// A business-configured alert condition (§3 AlertRule, §4.9).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRule {
    pub business_id: BusinessId,
    pub location_id: Option<LocationId>,
    pub rule_type: AlertRuleType,
    pub threshold_pct: Option<f64>,
    pub enabled: bool,
}

/// A delivered alert instance (§3 Notification, §4.9).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub location_id: LocationId,
    pub recipient_id: UserId,
    pub rule_type: AlertRuleType,
    pub inventory_item_id: Option<InventoryItemId>,
    pub message: String,
    pub created_at: OffsetDateTime,
    pub read_at: Option<OffsetDateTime>,
}

impl Notification {
    pub fn new(
        location_id: LocationId,
        recipient_id: UserId,
        rule_type: AlertRuleType,
        inventory_item_id: Option<InventoryItemId>,
        message: String,
    ) -> Self {
        Self {
            id: NotificationId::new(),
            location_id,
            recipient_id,
            rule_type,
            inventory_item_id,
            message,
            created_at: OffsetDateTime::now_utc(),
            read_at: None,
        }
    }

    pub fn mark_read(&mut self) {
        if self.read_at.is_none() {
            self.read_at = Some(OffsetDateTime::now_utc());
        }
    }

    pub fn is_unread(&self) -> bool {
        self.read_at.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notification_starts_unread_and_marks_once() {
        let mut n = Notification::new(
            LocationId::new(),
            UserId::new(),
            AlertRuleType::BelowReorderPoint,
            Some(InventoryItemId::new()),
            "Jameson is below reorder point".into(),
        );
        assert!(n.is_unread());
        n.mark_read();
        assert!(!n.is_unread());
        let first_read = n.read_at;
        n.mark_read();
        assert_eq!(n.read_at, first_read);
    }
}
