//! Borrow management endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::borrow::{BorrowDetails, CreateBorrow},
};

use super::AuthenticatedUser;

/// Borrow response with due date
#[derive(Serialize, ToSchema)]
pub struct BorrowResponse {
    /// Borrow record ID
    pub id: i32,
    /// Due date (ISO 8601 format)
    pub due_at: DateTime<Utc>,
    /// Copies of the book still available
    pub available_copies: i32,
    /// Status message
    pub message: String,
}

/// Return response
#[derive(Serialize, ToSchema)]
pub struct ReturnResponse {
    pub status: String,
    pub book_title: String,
    pub returned_at: DateTime<Utc>,
}

/// Member's borrow history with counters
#[derive(Serialize, ToSchema)]
pub struct MyBorrowsResponse {
    pub borrows: Vec<BorrowDetails>,
    pub active_count: i64,
    pub overdue_count: i64,
    pub total_count: i64,
    pub max_active_borrows: i64,
}

/// Borrow a book
#[utoipa::path(
    post,
    path = "/borrows",
    tag = "borrows",
    security(("bearer_auth" = [])),
    request_body = CreateBorrow,
    responses(
        (status = 201, description = "Book borrowed", body = BorrowResponse),
        (status = 403, description = "Account is not active"),
        (status = 404, description = "Book not found"),
        (status = 422, description = "Borrow limit reached or no copies available")
    )
)]
pub async fn create_borrow(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateBorrow>,
) -> AppResult<(StatusCode, Json<BorrowResponse>)> {
    let (borrow, book) = state
        .services
        .borrows
        .borrow(claims.user_id, request.book_id)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(BorrowResponse {
            id: borrow.id,
            due_at: borrow.due_at,
            available_copies: book.available_copies,
            message: format!(
                "You have borrowed '{}'. Due date is {}.",
                book.title,
                borrow.due_at.format("%Y-%m-%d")
            ),
        }),
    ))
}

/// Return a borrowed book
#[utoipa::path(
    post,
    path = "/borrows/{id}/return",
    tag = "borrows",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Borrow record ID")
    ),
    responses(
        (status = 200, description = "Book returned", body = ReturnResponse),
        (status = 404, description = "Borrow record not found or not yours"),
        (status = 422, description = "Already returned")
    )
)]
pub async fn return_borrow(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(borrow_id): Path<i32>,
) -> AppResult<Json<ReturnResponse>> {
    let (borrow, book) = state
        .services
        .borrows
        .return_borrow(borrow_id, claims.user_id)
        .await?;

    Ok(Json(ReturnResponse {
        status: "returned".to_string(),
        book_title: book.title,
        returned_at: borrow.returned_at.unwrap_or_else(Utc::now),
    }))
}

/// The authenticated member's borrow history
#[utoipa::path(
    get,
    path = "/borrows/me",
    tag = "borrows",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Borrow history with counters", body = MyBorrowsResponse),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn my_borrows(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<MyBorrowsResponse>> {
    let summary = state.services.borrows.my_borrows(claims.user_id).await?;

    Ok(Json(MyBorrowsResponse {
        borrows: summary.borrows,
        active_count: summary.active_count,
        overdue_count: summary.overdue_count,
        total_count: summary.total_count,
        max_active_borrows: summary.max_active_borrows,
    }))
}
