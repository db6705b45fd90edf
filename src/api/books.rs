//! Catalog endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::AppResult,
    models::book::{Availability, Book, BookQuery, NewBook, RetireBook},
    AppState,
};

/// Stock after an acquisition or retirement
#[derive(Serialize, ToSchema)]
pub struct StockResponse {
    pub isbn: String,
    /// Total copies owned after the operation
    pub stock: i32,
    pub message: String,
}

/// Search the catalog
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    params(BookQuery),
    responses(
        (status = 200, description = "Matching books", body = Vec<Book>)
    )
)]
pub async fn search_books(
    State(state): State<AppState>,
    Query(query): Query<BookQuery>,
) -> AppResult<Json<Vec<Book>>> {
    let books = state.services.catalog.search(&query).await?;
    Ok(Json(books))
}

/// Acquire copies of a book
#[utoipa::path(
    post,
    path = "/books",
    tag = "books",
    request_body = NewBook,
    responses(
        (status = 201, description = "Copies added", body = StockResponse),
        (status = 400, description = "Invalid request")
    )
)]
pub async fn acquire_book(
    State(state): State<AppState>,
    Json(request): Json<NewBook>,
) -> AppResult<(StatusCode, Json<StockResponse>)> {
    request.validate()?;

    let stock = state.services.catalog.acquire(&request).await?;

    Ok((
        StatusCode::CREATED,
        Json(StockResponse {
            isbn: request.isbn,
            stock,
            message: "Added successfully".to_string(),
        }),
    ))
}

/// Get a book by ISBN
#[utoipa::path(
    get,
    path = "/books/{isbn}",
    tag = "books",
    params(
        ("isbn" = String, Path, description = "Book ISBN")
    ),
    responses(
        (status = 200, description = "Book details", body = Book),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book(
    State(state): State<AppState>,
    Path(isbn): Path<String>,
) -> AppResult<Json<Book>> {
    let book = state.services.catalog.get_book(&isbn).await?;
    Ok(Json(book))
}

/// Stock and available copies of a book
#[utoipa::path(
    get,
    path = "/books/{isbn}/availability",
    tag = "books",
    params(
        ("isbn" = String, Path, description = "Book ISBN")
    ),
    responses(
        (status = 200, description = "Current counters", body = Availability),
        (status = 404, description = "Book not found")
    )
)]
pub async fn check_available(
    State(state): State<AppState>,
    Path(isbn): Path<String>,
) -> AppResult<Json<Availability>> {
    let availability = state.services.catalog.check_available(&isbn).await?;
    Ok(Json(availability))
}

/// Retire one copy of a book
#[utoipa::path(
    post,
    path = "/books/{isbn}/retire",
    tag = "books",
    params(
        ("isbn" = String, Path, description = "Book ISBN")
    ),
    request_body = RetireBook,
    responses(
        (status = 200, description = "Copy retired", body = StockResponse),
        (status = 404, description = "Book not found"),
        (status = 422, description = "All copies already retired")
    )
)]
pub async fn retire_book(
    State(state): State<AppState>,
    Path(isbn): Path<String>,
    Json(request): Json<RetireBook>,
) -> AppResult<Json<StockResponse>> {
    request.validate()?;

    let stock = state.services.catalog.retire(&isbn, &request.note).await?;

    Ok(Json(StockResponse {
        isbn,
        stock,
        message: "Removed successfully".to_string(),
    }))
}
