use crate::domain::{Business, Role, RoleAssignments, User, UserLocationRole};
use crate::infrastructure::{
    BusinessRepository, BusinessRepositoryTrait, RoleRepository, RoleRepositoryTrait,
    UserRepository, UserRepositoryTrait,
};
use crate::shared::{AppError, AppResult, LocationId, UserId};
use serde::Serialize;

#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
    business_repo: BusinessRepository,
    role_repo: RoleRepository,
}

impl UserService {
    pub fn new(user_repo: UserRepository, business_repo: BusinessRepository, role_repo: RoleRepository) -> Self {
        Self {
            user_repo,
            business_repo,
            role_repo,
        }
    }

    pub async fn get_user_with_business(&self, user_id: UserId) -> AppResult<UserWithBusiness> {
        let user = self
            .user_repo
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))?;

        let business = self
            .business_repo
            .find_by_id(user.business_id)
            .await?
            .ok_or_else(|| AppError::not_found("Business not found"))?;

        let roles = self.role_repo.assignments_for_user(user_id).await?;

        Ok(UserWithBusiness { user, business, roles })
    }

    pub async fn update_avatar_url(&self, user_id: UserId, avatar_url: String) -> AppResult<()> {
        self.user_repo.update_avatar_url(user_id, &avatar_url).await
    }

    /// §4.10: "business_admin may edit settings and invite users" extends to
    /// granting the role that invitation confers. `location_id = None` grants
    /// business-wide, matching `RoleAssignments::has_role_at_least`'s own
    /// treatment of a business-wide grant as covering every location.
    pub async fn grant_role(&self, user_id: UserId, location_id: Option<LocationId>, role: Role) -> AppResult<UserLocationRole> {
        let grant = UserLocationRole::new(user_id, location_id, role);
        self.role_repo.grant(&grant).await?;
        Ok(grant)
    }

    pub async fn revoke_role(&self, user_id: UserId, location_id: Option<LocationId>) -> AppResult<()> {
        self.role_repo.revoke(user_id, location_id).await
    }
}

#[derive(Debug, Serialize)]
pub struct UserWithBusiness {
    pub user: User,
    pub business: Business,
    #[serde(skip)]
    pub roles: RoleAssignments,
}
