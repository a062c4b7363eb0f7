use axum::{
    extract::State,
    routing::{delete, get, put},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{extractors::AuthUser, handlers::is_valid_email, repo::User},
    error::{ApiError, ApiResponse},
    state::AppState,
    users::dto::{UpdateUserRequest, UserData, UserProfile},
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(get_user))
        .route("/", put(update_user))
        .route("/", delete(delete_user))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<ApiResponse<UserData>, ApiError> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    Ok(ApiResponse::ok(
        "User fetched successfully",
        UserData {
            user: UserProfile::from(user),
        },
    ))
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<ApiResponse<UserData>, ApiError> {
    if let Some(email) = payload.email.as_deref() {
        if !is_valid_email(email) {
            return Err(ApiError::Validation("Invalid email".into()));
        }
        // Changed email must not belong to another account.
        if let Some(existing) = User::find_by_email(&state.db, email).await? {
            if existing.id != user_id {
                warn!(user_id = %user_id, "email change to taken address");
                return Err(ApiError::Conflict("Email already exists".into()));
            }
        }
    }

    // The pre-check can race a concurrent signup or email change; the
    // UNIQUE constraint on email still reports Conflict, not a 500.
    let user = User::update_profile(
        &state.db,
        user_id,
        payload.first_name.as_deref(),
        payload.last_name.as_deref(),
        payload.email.as_deref(),
    )
    .await
    .map_err(|e| ApiError::conflict_on_unique(e, "Email already exists"))?
    .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    info!(user_id = %user.id, "user updated");
    Ok(ApiResponse::ok(
        "User updated successfully",
        UserData {
            user: UserProfile::from(user),
        },
    ))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<ApiResponse<()>, ApiError> {
    if !User::delete(&state.db, user_id).await? {
        return Err(ApiError::NotFound("User not found".into()));
    }

    // Note rows go with the account (ON DELETE CASCADE).
    info!(user_id = %user_id, "user deleted");
    Ok(ApiResponse::message("User deleted successfully"))
}
