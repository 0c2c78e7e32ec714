use crate::infrastructure::JwtService;
use crate::shared::{AppError, BusinessId, UserId};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts, RequestPartsExt};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

/// The authenticated caller of a protected route (§4.10). Extracted from
/// the bearer token's claims alone — role checks happen per-handler
/// against `RoleAssignments`, not here, since what's "enough" role varies
/// by endpoint.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub user_id: UserId,
    pub business_id: BusinessId,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let jwt_service = parts
            .extensions
            .get::<JwtService>()
            .ok_or_else(|| AppError::internal("JWT service not configured"))?
            .clone();

        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| AppError::authentication("Missing or invalid authorization header"))?;

        let claims = jwt_service.verify_access_token(bearer.token())?;

        Ok(AuthUser {
            user_id: claims.user_id()?,
            business_id: claims.business_id()?,
        })
    }
}

/// Gate for the `/cron/*` sweep endpoints (§4.5 auto-close, §4.9 alert
/// evaluation): a scheduler authenticates with a shared secret rather
/// than a user's JWT, since no human is behind the request.
#[derive(Debug, Clone, Copy)]
pub struct CronCaller;

#[async_trait]
impl<S> FromRequestParts<S> for CronCaller
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let shared_secret = parts
            .extensions
            .get::<crate::infrastructure::CronConfig>()
            .ok_or_else(|| AppError::internal("Cron config not configured"))?
            .shared_secret
            .clone();

        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| AppError::authentication("Missing or invalid authorization header"))?;

        if bearer.token() != shared_secret {
            return Err(AppError::authentication("Invalid cron shared secret"));
        }

        Ok(CronCaller)
    }
}
