use crate::application::UserService;
use crate::interfaces::http::middleware::AuthUser;
use axum::{extract::State, Json};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct BusinessResponse {
    pub id: String,
    pub name: String,
    pub created_at: String,
}

/// The caller's own business (§3 Business). There is no cross-business
/// lookup endpoint — §4.10 point 1 makes tenant scope implicit in every
/// route, so "my business" is the only business a token can ever name.
pub async fn me_handler(
    auth_user: AuthUser,
    State(user_service): State<UserService>,
) -> Result<Json<BusinessResponse>, crate::shared::AppError> {
    let with_business = user_service.get_user_with_business(auth_user.user_id).await?;
    Ok(Json(BusinessResponse {
        id: with_business.business.id.to_string(),
        name: with_business.business.name.to_string(),
        created_at: with_business.business.created_at.to_string(),
    }))
}
