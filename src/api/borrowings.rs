//! Borrowing endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use crate::{
    error::AppResult,
    models::{Borrowing, BorrowingDetails, BorrowingQuery, CreateBorrowing, UpdateBorrowing},
    AppState,
};

use super::{AppJson, AuthenticatedUser};

/// Return response with the closed borrowing
#[derive(Serialize)]
pub struct ReturnResponse {
    pub message: String,
    pub borrowing: Borrowing,
}

/// List borrowings (`is_active`, `user_id`, `overdue` filters)
pub async fn list_borrowings(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<BorrowingQuery>,
) -> AppResult<Json<Vec<BorrowingDetails>>> {
    let borrowings = state.services.borrowings.list(&claims, &query).await?;
    Ok(Json(borrowings))
}

/// Get a borrowing by ID
pub async fn get_borrowing(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<BorrowingDetails>> {
    let borrowing = state.services.borrowings.get(&claims, id).await?;
    Ok(Json(borrowing))
}

/// Borrow a book
pub async fn create_borrowing(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    AppJson(request): AppJson<CreateBorrowing>,
) -> AppResult<(StatusCode, Json<Borrowing>)> {
    let borrowing = state.services.borrowings.create(&claims, &request).await?;
    Ok((StatusCode::CREATED, Json(borrowing)))
}

/// Return a borrowed book
pub async fn return_borrowing(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<ReturnResponse>> {
    let borrowing = state.services.borrowings.return_borrowing(&claims, id).await?;

    Ok(Json(ReturnResponse {
        message: "Book returned successfully".to_string(),
        borrowing,
    }))
}

/// Change the expected return date (staff only, inventory untouched)
pub async fn update_borrowing(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    AppJson(request): AppJson<UpdateBorrowing>,
) -> AppResult<Json<Borrowing>> {
    claims.require_staff()?;

    let borrowing = state.services.borrowings.update(id, &request).await?;
    Ok(Json(borrowing))
}

/// Delete a borrowing record (staff only, inventory untouched)
pub async fn delete_borrowing(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    claims.require_staff()?;

    state.services.borrowings.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
