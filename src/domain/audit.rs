use crate::shared::{AuditLogEntryId, BusinessId, UserId};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// An immutable record of a sensitive mutation (§3 AuditLogEntry, §4.10
/// "every role change, every session close, every manual ledger
/// adjustment is audited"). Append-only, same as the ledger itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: AuditLogEntryId,
    pub business_id: BusinessId,
    pub actor_id: UserId,
    pub action: String,
    pub entity_type: String,
    pub entity_id: String,
    pub detail: Option<serde_json::Value>,
    pub created_at: OffsetDateTime,
}

impl AuditLogEntry {
    pub fn new(
        business_id: BusinessId,
        actor_id: UserId,
        action: impl Into<String>,
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
        detail: Option<serde_json::Value>,
    ) -> Self {
        Self {
            id: AuditLogEntryId::new(),
            business_id,
            actor_id,
            action: action.into(),
            entity_type: entity_type.into(),
            entity_id: entity_id.into(),
            detail,
            created_at: OffsetDateTime::now_utc(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audit_entry_captures_actor_and_action() {
        let entry = AuditLogEntry::new(
            BusinessId::new(),
            UserId::new(),
            "session.close",
            "inventory_session",
            "11111111-1111-1111-1111-111111111111",
            None,
        );
        assert_eq!(entry.action, "session.close");
        assert_eq!(entry.entity_type, "inventory_session");
    }
}
