use crate::domain::Role;
use crate::infrastructure::{RoleRepository, RoleRepositoryTrait};
use crate::shared::{AppError, AppResult, LocationId, UserId};

/// §4.10 points 2-3: role scope and location scope collapsed into one
/// check, since `RoleAssignments::has_role_at_least` already treats a
/// business-wide grant (`location_id = None`) as covering every location.
pub async fn require_role_at_least(
    role_repo: &RoleRepository,
    user_id: UserId,
    location_id: LocationId,
    minimum: Role,
) -> AppResult<()> {
    let assignments = role_repo.assignments_for_user(user_id).await?;
    if assignments.has_role_at_least(location_id, minimum) {
        Ok(())
    } else {
        Err(AppError::authorization("Insufficient role for this operation"))
    }
}

/// Business-wide variant for operations with no single location scope
/// (e.g. creating a location, editing business settings).
pub async fn require_business_role_at_least(
    role_repo: &RoleRepository,
    user_id: UserId,
    minimum: Role,
) -> AppResult<()> {
    let assignments = role_repo.assignments_for_user(user_id).await?;
    if assignments.effective_role().is_some_and(|r| r >= minimum) {
        Ok(())
    } else {
        Err(AppError::authorization("Insufficient role for this operation"))
    }
}
