use crate::application::{AuthResponse, AuthService, LoginCommand, RefreshCommand, RegisterCommand};
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    #[validate(length(min = 1, max = 255))]
    pub business_name: String,
    #[validate(length(min = 1, max = 255))]
    pub owner_name: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RefreshRequest {
    #[validate(length(min = 1))]
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct AuthTokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub user_id: String,
    pub business_id: String,
}

impl From<AuthResponse> for AuthTokenResponse {
    fn from(r: AuthResponse) -> Self {
        Self {
            access_token: r.access_token,
            refresh_token: r.refresh_token,
            token_type: "Bearer".to_string(),
            user_id: r.user_id.to_string(),
            business_id: r.business_id.to_string(),
        }
    }
}

pub async fn register_handler(
    State(auth_service): State<AuthService>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<AuthTokenResponse>, crate::shared::AppError> {
    req.validate()
        .map_err(|e| crate::shared::AppError::validation(format!("Validation error: {}", e)))?;

    let response = auth_service
        .register(RegisterCommand {
            email: req.email,
            password: req.password,
            business_name: req.business_name,
            owner_name: req.owner_name,
        })
        .await?;

    Ok(Json(response.into()))
}

pub async fn login_handler(
    State(auth_service): State<AuthService>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthTokenResponse>, crate::shared::AppError> {
    req.validate()
        .map_err(|e| crate::shared::AppError::validation(format!("Validation error: {}", e)))?;

    let response = auth_service
        .login(LoginCommand {
            email: req.email,
            password: req.password,
        })
        .await?;

    Ok(Json(response.into()))
}

pub async fn refresh_handler(
    State(auth_service): State<AuthService>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<AuthTokenResponse>, crate::shared::AppError> {
    req.validate()
        .map_err(|e| crate::shared::AppError::validation(format!("Validation error: {}", e)))?;

    let response = auth_service
        .refresh(RefreshCommand {
            refresh_token: req.refresh_token,
        })
        .await?;

    Ok(Json(response.into()))
}
