use crate::application::par_service::ParService;
use crate::application::pattern_service::PatternService;
use crate::domain::notification::{AlertRule, AlertRuleType, Notification};
use crate::domain::role::Role;
use crate::infrastructure::{
    LocationRepository, LocationRepositoryTrait, NotificationRepository, NotificationRepositoryTrait,
    RoleRepository, RoleRepositoryTrait, SessionRepository, SessionRepositoryTrait,
};
use crate::shared::{AppResult, BusinessId, LocationId};
use time::{Duration, OffsetDateTime};

/// §4.9 Alert/Notification Dispatcher: evaluates each business's enabled
/// `AlertRule`s against current state and writes `Notification` rows to
/// every recipient who doesn't already have an unread one for the same
/// condition. Run on a schedule via `/cron/evaluate-alerts`, not per
/// request — the conditions it checks (reorder points, variance,
/// confirmed shrinkage, overdue sessions) only change slowly.
#[derive(Clone)]
pub struct AlertService {
    notification_repo: NotificationRepository,
    role_repo: RoleRepository,
    location_repo: LocationRepository,
    session_repo: SessionRepository,
    par_service: ParService,
    pattern_service: PatternService,
}

/// How long an open session may sit idle before `SessionOverdue` fires
/// (§4.9; distinct from `BusinessSettings.session_auto_lock`, which
/// governs when the cron sweep force-closes it).
const SESSION_OVERDUE_AFTER: Duration = Duration::hours(24);

impl AlertService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        notification_repo: NotificationRepository,
        role_repo: RoleRepository,
        location_repo: LocationRepository,
        session_repo: SessionRepository,
        par_service: ParService,
        pattern_service: PatternService,
    ) -> Self {
        Self {
            notification_repo,
            role_repo,
            location_repo,
            session_repo,
            par_service,
            pattern_service,
        }
    }

    pub async fn upsert_rule(&self, rule: AlertRule) -> AppResult<()> {
        self.notification_repo.upsert_rule(&rule).await
    }

    /// Evaluates every enabled rule for one location and dispatches
    /// notifications to every user with `Manager` role or above there
    /// (§4.9 recipients are location managers and up).
    pub async fn evaluate_location(
        &self,
        business_id: BusinessId,
        location_id: LocationId,
    ) -> AppResult<Vec<Notification>> {
        let rules = self.notification_repo.list_rules_for_business(business_id).await?;
        let recipients = self
            .role_repo
            .users_with_role_at_least(location_id, Role::Manager)
            .await?;
        let now = OffsetDateTime::now_utc();

        let mut dispatched = Vec::new();
        for rule in rules.iter().filter(|r| r.location_id.is_none() || r.location_id == Some(location_id)) {
            let candidates = self.candidates_for_rule(rule, location_id, now).await?;
            for (inventory_item_id, message) in candidates {
                for &recipient_id in &recipients {
                    if self
                        .notification_repo
                        .has_unread_for(location_id, recipient_id, rule.rule_type, inventory_item_id)
                        .await?
                    {
                        continue;
                    }
                    let notification =
                        Notification::new(location_id, recipient_id, rule.rule_type, inventory_item_id, message.clone());
                    self.notification_repo.create_notification(&notification).await?;
                    dispatched.push(notification);
                }
            }
        }
        Ok(dispatched)
    }

    pub async fn evaluate_business(&self, business_id: BusinessId) -> AppResult<Vec<Notification>> {
        let locations = self.location_repo.list_for_business(business_id).await?;
        let mut dispatched = Vec::new();
        for location in locations {
            dispatched.extend(self.evaluate_location(business_id, location.id).await?);
        }
        Ok(dispatched)
    }

    async fn candidates_for_rule(
        &self,
        rule: &AlertRule,
        location_id: LocationId,
        now: OffsetDateTime,
    ) -> AppResult<Vec<(Option<crate::shared::InventoryItemId>, String)>> {
        match rule.rule_type {
            AlertRuleType::BelowReorderPoint => {
                let bundles = self.par_service.suggest_reorders(location_id).await?;
                Ok(bundles
                    .into_iter()
                    .flat_map(|bundle| bundle.suggestions)
                    .map(|s| {
                        (
                            Some(s.inventory_item_id),
                            format!(
                                "item is at {:.1} on hand, below its reorder point (suggest ordering {:.1})",
                                s.current_on_hand, s.suggested_qty
                            ),
                        )
                    })
                    .collect())
            }
            AlertRuleType::VarianceExceedsThreshold => {
                let threshold = rule.threshold_pct.unwrap_or(10.0);
                let snapshots = self.pattern_service.snapshot_location(location_id, now).await?;
                Ok(snapshots
                    .into_iter()
                    .filter(|s| s.exceeds_threshold(threshold))
                    .map(|s| {
                        (
                            Some(s.inventory_item_id),
                            format!("variance of {:.1}% exceeds the {:.1}% threshold", s.variance_pct, threshold),
                        )
                    })
                    .collect())
            }
            AlertRuleType::ShrinkageSuspectConfirmed => {
                let threshold = rule.threshold_pct.unwrap_or(10.0);
                let suspects = self
                    .pattern_service
                    .confirmed_shrinkage_suspects(location_id, threshold, now)
                    .await?;
                Ok(suspects
                    .into_iter()
                    .map(|s| {
                        (
                            Some(s.inventory_item_id),
                            format!(
                                "variance has exceeded threshold for {} consecutive windows",
                                s.consecutive_windows_over_threshold
                            ),
                        )
                    })
                    .collect())
            }
            AlertRuleType::SessionOverdue => {
                let sessions = self.session_repo.list_sessions_for_location(location_id, 20).await?;
                Ok(sessions
                    .into_iter()
                    .filter(|s| s.is_open() && now - s.opened_at > SESSION_OVERDUE_AFTER)
                    .map(|s| {
                        (
                            None,
                            format!("session {} has been open for over 24 hours", s.id),
                        )
                    })
                    .collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_overdue_window_is_24_hours() {
        assert_eq!(SESSION_OVERDUE_AFTER, Duration::hours(24));
    }
}
