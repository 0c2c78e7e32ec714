use crate::shared::{AppError, AppResult, LocationId, UserId};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Strict role hierarchy (§3 Business/Role). Declaration order doubles as
/// the precedence order: `derive(PartialOrd, Ord)` compares variants by
/// their discriminant, so `Role::Staff < Role::Manager` etc. falls out of
/// the enum definition rather than a hand-rolled numeric mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Staff,
    Manager,
    Curator,
    Accounting,
    BusinessAdmin,
    PlatformAdmin,
}

impl Role {
    pub fn from_str(s: &str) -> AppResult<Self> {
        match s.to_lowercase().as_str() {
            "staff" => Ok(Self::Staff),
            "manager" => Ok(Self::Manager),
            "curator" => Ok(Self::Curator),
            "accounting" => Ok(Self::Accounting),
            "business_admin" | "businessadmin" => Ok(Self::BusinessAdmin),
            "platform_admin" | "platformadmin" => Ok(Self::PlatformAdmin),
            _ => Err(AppError::validation(format!("Invalid role: {s}"))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Staff => "staff",
            Self::Manager => "manager",
            Self::Curator => "curator",
            Self::Accounting => "accounting",
            Self::BusinessAdmin => "business_admin",
            Self::PlatformAdmin => "platform_admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A role grant. `location_id = None` means the grant applies business-wide
/// (used for `business_admin` and `platform_admin`, which sit above
/// location scope per §4.10).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserLocationRole {
    pub user_id: UserId,
    pub location_id: Option<LocationId>,
    pub role: Role,
    pub granted_at: OffsetDateTime,
}

impl UserLocationRole {
    pub fn new(user_id: UserId, location_id: Option<LocationId>, role: Role) -> Self {
        Self {
            user_id,
            location_id,
            role,
            granted_at: OffsetDateTime::now_utc(),
        }
    }
}

/// A user's full set of location-scoped grants, used to compute the
/// "effective highest role" (§3) and to answer location-scope checks
/// (§4.10 point 3) without re-querying the database per call.
#[derive(Debug, Clone, Default)]
pub struct RoleAssignments {
    grants: Vec<UserLocationRole>,
}

impl RoleAssignments {
    pub fn new(grants: Vec<UserLocationRole>) -> Self {
        Self { grants }
    }

    /// The highest role held across any location, or business-wide.
    pub fn effective_role(&self) -> Option<Role> {
        self.grants.iter().map(|g| g.role).max()
    }

    /// The role held at a specific location, falling back to any
    /// business-wide (location_id = None) grant at or above it.
    pub fn role_at(&self, location_id: LocationId) -> Option<Role> {
        self.grants
            .iter()
            .filter(|g| g.location_id == Some(location_id) || g.location_id.is_none())
            .map(|g| g.role)
            .max()
    }

    pub fn has_role_at_least(&self, location_id: LocationId, minimum: Role) -> bool {
        self.role_at(location_id).is_some_and(|r| r >= minimum)
    }

    pub fn is_platform_admin(&self) -> bool {
        self.effective_role() == Some(Role::PlatformAdmin)
    }

    pub fn location_ids(&self) -> Vec<LocationId> {
        self.grants.iter().filter_map(|g| g.location_id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_ordering_follows_hierarchy() {
        assert!(Role::Staff < Role::Manager);
        assert!(Role::Manager < Role::Curator);
        assert!(Role::Curator < Role::Accounting);
        assert!(Role::Accounting < Role::BusinessAdmin);
        assert!(Role::BusinessAdmin < Role::PlatformAdmin);
    }

    #[test]
    fn effective_role_is_max_across_locations() {
        let user = UserId::new();
        let loc_a = LocationId::new();
        let loc_b = LocationId::new();
        let assignments = RoleAssignments::new(vec![
            UserLocationRole::new(user, Some(loc_a), Role::Staff),
            UserLocationRole::new(user, Some(loc_b), Role::Manager),
        ]);
        assert_eq!(assignments.effective_role(), Some(Role::Manager));
        assert!(assignments.has_role_at_least(loc_b, Role::Manager));
        assert!(!assignments.has_role_at_least(loc_a, Role::Manager));
    }

    #[test]
    fn business_wide_grant_applies_to_every_location() {
        let user = UserId::new();
        let loc = LocationId::new();
        let assignments = RoleAssignments::new(vec![UserLocationRole::new(user, None, Role::BusinessAdmin)]);
        assert!(assignments.has_role_at_least(loc, Role::Manager));
    }
}
