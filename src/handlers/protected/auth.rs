use axum::Extension;
use serde_json::{json, Value};

use crate::database::manager::DatabaseManager;
use crate::database::users::UserStore;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, AuthUser};

/// GET /api/auth/whoami - Current user from the validated session
///
/// The token is re-checked against the users table, so a session whose
/// account was removed reads as "no session" rather than echoing stale
/// claims. The response carries the stored profile, not the token's copy.
pub async fn whoami(Extension(user): Extension<AuthUser>) -> Result<ApiResponse<Value>, ApiError> {
    let pool = DatabaseManager::pool().await?;
    let user = UserStore::find_by_id(&pool, user.user_id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Session user no longer exists"))?;

    Ok(ApiResponse::success(json!({
        "id": user.id,
        "email": user.email,
        "display_name": user.display_name,
    })))
}

/// DELETE /api/auth/session - Logout
///
/// Tokens are stateless, so there is nothing to revoke server-side; the
/// endpoint exists so clients have a uniform "end session" call. Clients
/// clear their local session regardless of what this returns.
pub async fn logout(Extension(user): Extension<AuthUser>) -> Result<ApiResponse<()>, ApiError> {
    tracing::info!(user_id = %user.user_id, "user logged out");
    Ok(ApiResponse::no_content())
}
