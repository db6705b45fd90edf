//! API handlers for Shelfkeeper REST endpoints

pub mod books;
pub mod health;
pub mod loans;
pub mod openapi;
pub mod users;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::AppState;

/// Create the application router with all routes
pub fn router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API v1 routes
    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Catalog
        .route("/books", get(books::search_books).post(books::acquire_book))
        .route("/books/:isbn", get(books::get_book))
        .route("/books/:isbn/availability", get(books::check_available))
        .route("/books/:isbn/retire", post(books::retire_book))
        // Accounts
        .route("/auth/login", post(users::login))
        .route("/users", post(users::register))
        .route("/users/:id", get(users::get_user))
        .route("/users/:id/credential", post(users::reset_credential))
        .route("/users/:id/overdue", get(loans::reconcile_overdue))
        .route("/users/:id/loans", get(loans::get_user_loans))
        // Loans
        .route("/loans", post(loans::borrow))
        .route("/loans/return", post(loans::return_book))
        .route("/loans/extend", post(loans::extend))
        .route("/loans/deadline", get(loans::check_deadline))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_v1)
        .route("/api-docs/openapi.json", get(openapi::openapi_json))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
