//! Loan lifecycle endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::AppResult,
    models::loan::{HistoryQuery, LoanRecord, LoanRequest, OverdueReport, ReturnReceipt},
    AppState,
};

/// Current deadline of an active loan
#[derive(Serialize, ToSchema)]
pub struct DeadlineResponse {
    pub isbn: String,
    pub user_id: String,
    pub deadline: DateTime<Utc>,
}

/// Borrow a copy of a book
#[utoipa::path(
    post,
    path = "/loans",
    tag = "loans",
    request_body = LoanRequest,
    responses(
        (status = 201, description = "Loan created", body = LoanRecord),
        (status = 403, description = "Too many overdue loans"),
        (status = 404, description = "Book or user not found"),
        (status = 409, description = "No copy available or already borrowed")
    )
)]
pub async fn borrow(
    State(state): State<AppState>,
    Json(request): Json<LoanRequest>,
) -> AppResult<(StatusCode, Json<LoanRecord>)> {
    request.validate()?;

    let record = state
        .services
        .lifecycle
        .borrow_in_good_standing(&request.isbn, &request.user_id, Utc::now())
        .await?;

    Ok((StatusCode::CREATED, Json(record)))
}

/// Return a borrowed book
#[utoipa::path(
    post,
    path = "/loans/return",
    tag = "loans",
    request_body = LoanRequest,
    responses(
        (status = 200, description = "Book returned", body = ReturnReceipt),
        (status = 404, description = "Book not found"),
        (status = 409, description = "Book not borrowed by this user")
    )
)]
pub async fn return_book(
    State(state): State<AppState>,
    Json(request): Json<LoanRequest>,
) -> AppResult<Json<ReturnReceipt>> {
    request.validate()?;

    let receipt = state
        .services
        .lifecycle
        .return_book(&request.isbn, &request.user_id, Utc::now())
        .await?;

    Ok(Json(receipt))
}

/// Push a loan's deadline back one month
#[utoipa::path(
    post,
    path = "/loans/extend",
    tag = "loans",
    request_body = LoanRequest,
    responses(
        (status = 200, description = "Deadline extended", body = LoanRecord),
        (status = 404, description = "Book not found"),
        (status = 409, description = "Book not borrowed by this user"),
        (status = 422, description = "No extensions left")
    )
)]
pub async fn extend(
    State(state): State<AppState>,
    Json(request): Json<LoanRequest>,
) -> AppResult<Json<LoanRecord>> {
    request.validate()?;

    let record = state
        .services
        .lifecycle
        .renew(&request.isbn, &request.user_id, Utc::now())
        .await?;

    Ok(Json(record))
}

/// Deadline of an active loan
#[utoipa::path(
    get,
    path = "/loans/deadline",
    tag = "loans",
    params(LoanRequest),
    responses(
        (status = 200, description = "Current deadline", body = DeadlineResponse),
        (status = 404, description = "Book or user not found"),
        (status = 409, description = "Book not borrowed by this user")
    )
)]
pub async fn check_deadline(
    State(state): State<AppState>,
    Query(request): Query<LoanRequest>,
) -> AppResult<Json<DeadlineResponse>> {
    request.validate()?;

    let deadline = state
        .services
        .lifecycle
        .deadline_at(&request.isbn, &request.user_id, Utc::now())
        .await?;

    Ok(Json(DeadlineResponse {
        isbn: request.isbn,
        user_id: request.user_id,
        deadline,
    }))
}

/// Auto-extend late loans and report what is still overdue
#[utoipa::path(
    get,
    path = "/users/{id}/overdue",
    tag = "loans",
    params(
        ("id" = String, Path, description = "Username")
    ),
    responses(
        (status = 200, description = "Overdue loans", body = OverdueReport),
        (status = 404, description = "User not found")
    )
)]
pub async fn reconcile_overdue(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<Json<OverdueReport>> {
    let report = state
        .services
        .lifecycle
        .reconcile_overdue(&user_id, Utc::now())
        .await?;
    Ok(Json(report))
}

/// Borrowing history of a user, newest first
#[utoipa::path(
    get,
    path = "/users/{id}/loans",
    tag = "loans",
    params(
        ("id" = String, Path, description = "Username"),
        HistoryQuery
    ),
    responses(
        (status = 200, description = "Loan records", body = Vec<LoanRecord>),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user_loans(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> AppResult<Json<Vec<LoanRecord>>> {
    let records = state
        .services
        .lifecycle
        .history(&user_id, Utc::now(), query.active_only.unwrap_or(false))
        .await?;
    Ok(Json(records))
}
