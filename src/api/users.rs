//! Caller profile endpoint

use axum::{extract::State, Json};

use crate::{error::AppResult, models::User, AppState};

use super::AuthenticatedUser;

/// Get the authenticated user's record
pub async fn me(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<User>> {
    let user = state.services.users.me(&claims).await?;
    Ok(Json(user))
}
