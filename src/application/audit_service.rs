use crate::domain::audit::AuditLogEntry;
use crate::infrastructure::{AuditRepository, AuditRepositoryTrait};
use crate::shared::{AppResult, BusinessId, UserId};

/// §4.10 "every role change, every session close, every manual ledger
/// adjustment is audited". Other services don't call this directly — they
/// don't carry an acting user through their own signatures uniformly —
/// so the interfaces layer records the entry once it has both the result
/// and the `AuthUser` that requested it.
#[derive(Clone)]
pub struct AuditService {
    audit_repo: AuditRepository,
}

impl AuditService {
    pub fn new(audit_repo: AuditRepository) -> Self {
        Self { audit_repo }
    }

    pub async fn record(
        &self,
        business_id: BusinessId,
        actor_id: UserId,
        action: impl Into<String>,
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
        detail: Option<serde_json::Value>,
    ) -> AppResult<()> {
        let entry = AuditLogEntry::new(business_id, actor_id, action, entity_type, entity_id, detail);
        self.audit_repo.append(&entry).await
    }

    pub async fn list_for_business(&self, business_id: BusinessId, limit: i64) -> AppResult<Vec<AuditLogEntry>> {
        self.audit_repo.list_for_business(business_id, limit).await
    }

    pub async fn list_for_entity(&self, entity_type: &str, entity_id: &str) -> AppResult<Vec<AuditLogEntry>> {
        self.audit_repo.list_for_entity(entity_type, entity_id).await
    }
}
