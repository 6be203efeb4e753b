use axum::response::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::{generate_jwt, password, Claims};
use crate::config;
use crate::database::manager::DatabaseManager;
use crate::database::users::UserStore;
use crate::error::ApiError;
use crate::middleware::ApiResponse;
use crate::validation::validate_signup;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// POST /auth/register - Create a new user account
///
/// Success means "request accepted", not "session established": the client
/// still has to sign in. Payload is validated before the store is touched;
/// a duplicate email is a 409 with a message suitable for direct display.
pub async fn register(Json(payload): Json<RegisterRequest>) -> Result<ApiResponse<Value>, ApiError> {
    validate_signup(&payload.email, &payload.password, payload.display_name.as_deref())
        .map_err(|field_errors| ApiError::validation_error("Validation failed", field_errors))?;

    let pool = DatabaseManager::pool().await?;

    let password_hash = password::hash_password(&payload.password).map_err(|e| {
        tracing::error!("Password hashing failed: {}", e);
        ApiError::internal_server_error("An error occurred while processing your request")
    })?;

    let user = UserStore::insert(
        &pool,
        &payload.email,
        payload.display_name.as_deref(),
        &password_hash,
    )
    .await?;

    tracing::info!(user_id = %user.id, "registered new user");

    Ok(ApiResponse::created(json!({
        "message": "Registration successful! Please check your email.",
        "user": {
            "id": user.id,
            "email": user.email,
            "display_name": user.display_name,
        }
    })))
}

/// POST /auth/login - Authenticate and receive a JWT token
///
/// Bad credentials produce a single generic message; whether the email was
/// unknown or the password wrong is deliberately not distinguishable.
pub async fn login(Json(payload): Json<LoginRequest>) -> Result<ApiResponse<Value>, ApiError> {
    let pool = DatabaseManager::pool().await?;

    let user = UserStore::find_by_email(&pool, &payload.email)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid email or password"))?;

    let password_valid = password::verify_password(&payload.password, &user.password_hash)
        .map_err(|e| {
            tracing::error!("Password verification error: {}", e);
            ApiError::internal_server_error("An error occurred while processing your request")
        })?;

    if !password_valid {
        return Err(ApiError::unauthorized("Invalid email or password"));
    }

    let claims = Claims::new(user.id, user.email.clone(), user.display_name.clone());
    let token = generate_jwt(claims)?;
    let expires_in = config::config().security.jwt_expiry_hours * 3600;

    tracing::info!(user_id = %user.id, "user logged in");

    Ok(ApiResponse::success(json!({
        "token": token,
        "expires_in": expires_in,
        "user": {
            "id": user.id,
            "email": user.email,
            "display_name": user.display_name,
        }
    })))
}
