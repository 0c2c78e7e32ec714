use crate::domain::{
    Business, BusinessName, DisplayName, Email, Password, RefreshToken, Role, User,
    UserLocationRole,
};
use crate::infrastructure::{
    BusinessRepository, BusinessRepositoryTrait, JwtService, PasswordHasher, RefreshTokenRepository,
    RefreshTokenRepositoryTrait, RoleRepository, RoleRepositoryTrait, UserRepository,
    UserRepositoryTrait,
};
use crate::shared::{AppError, AppResult, BusinessId, UserId};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use time::OffsetDateTime;

/// Registration, login, and refresh-token rotation (§4.10 "a business is
/// created with one owning user"). Role is granted rather than assigned as
/// a user field: the registering user gets a business-wide `BusinessAdmin`
/// grant (`location_id = None`), covering every location the business ever
/// creates.
#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    business_repo: BusinessRepository,
    refresh_token_repo: RefreshTokenRepository,
    role_repo: RoleRepository,
    password_hasher: PasswordHasher,
    jwt_service: JwtService,
}

impl AuthService {
    pub fn new(
        user_repo: UserRepository,
        business_repo: BusinessRepository,
        refresh_token_repo: RefreshTokenRepository,
        role_repo: RoleRepository,
        password_hasher: PasswordHasher,
        jwt_service: JwtService,
    ) -> Self {
        Self {
            user_repo,
            business_repo,
            refresh_token_repo,
            role_repo,
            password_hasher,
            jwt_service,
        }
    }

    pub async fn register(&self, command: RegisterCommand) -> AppResult<AuthResponse> {
        let email = Email::new(command.email)?;
        let password = Password::new(command.password)?;
        let business_name = BusinessName::new(command.business_name)?;
        let owner_name = command.owner_name.map(DisplayName::new).transpose()?;

        if self.user_repo.exists_by_email(&email).await? {
            return Err(AppError::conflict("User with this email already exists"));
        }

        let business = Business::new(business_name);
        self.business_repo.create(&business).await?;

        let password_hash = self.password_hasher.hash_password(password.as_str())?;
        let user = User::new(business.id, email, password_hash, owner_name);
        self.user_repo.create(&user).await?;

        self.role_repo
            .grant(&UserLocationRole::new(user.id, None, Role::BusinessAdmin))
            .await?;

        self.issue_tokens(user.id, user.business_id).await
    }

    pub async fn login(&self, command: LoginCommand) -> AppResult<AuthResponse> {
        let email = Email::new(command.email)?;
        let password = Password::new(command.password)?;

        let user = self
            .user_repo
            .find_by_email(&email)
            .await?
            .ok_or_else(|| AppError::authentication("Invalid email or password"))?;

        let password_valid = self
            .password_hasher
            .verify_password(password.as_str(), &user.password_hash)?;
        if !password_valid {
            return Err(AppError::authentication("Invalid email or password"));
        }

        self.user_repo.update_login_stats(user.id).await?;
        self.issue_tokens(user.id, user.business_id).await
    }

    pub async fn refresh(&self, command: RefreshCommand) -> AppResult<AuthResponse> {
        let token_hash = hash_token(&command.refresh_token);

        let stored_token = self
            .refresh_token_repo
            .find_by_token_hash(&token_hash)
            .await?
            .ok_or_else(|| AppError::authentication("Invalid refresh token"))?;

        if !stored_token.is_valid() {
            return Err(AppError::authentication("Refresh token expired or revoked"));
        }

        let user = self
            .user_repo
            .find_by_id(stored_token.user_id)
            .await?
            .ok_or_else(|| AppError::authentication("User not found"))?;

        let access_token = self
            .jwt_service
            .generate_access_token(user.id, user.business_id)?;

        Ok(AuthResponse {
            access_token,
            refresh_token: command.refresh_token,
            user_id: user.id,
            business_id: user.business_id,
        })
    }

    async fn issue_tokens(&self, user_id: UserId, business_id: BusinessId) -> AppResult<AuthResponse> {
        let access_token = self.jwt_service.generate_access_token(user_id, business_id)?;
        let refresh_token_str = self.jwt_service.generate_refresh_token();
        let refresh_token_hash = hash_token(&refresh_token_str);
        let expires_at = OffsetDateTime::now_utc() + self.jwt_service.get_refresh_token_ttl();

        let refresh_token = RefreshToken::new(user_id, refresh_token_hash, expires_at);
        self.refresh_token_repo.create(&refresh_token).await?;

        Ok(AuthResponse {
            access_token,
            refresh_token: refresh_token_str,
            user_id,
            business_id,
        })
    }
}

fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, Deserialize)]
pub struct RegisterCommand {
    pub email: String,
    pub password: String,
    pub business_name: String,
    pub owner_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginCommand {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshCommand {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user_id: UserId,
    pub business_id: BusinessId,
}
