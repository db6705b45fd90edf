//! OpenAPI documentation

use axum::Json;
use utoipa::OpenApi;

use crate::api::{books, health, loans, users};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Shelfkeeper API",
        version = "1.0.0",
        description = "Library inventory, accounts and loan lifecycle REST API"
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Catalog
        books::search_books,
        books::acquire_book,
        books::get_book,
        books::check_available,
        books::retire_book,
        // Accounts
        users::register,
        users::get_user,
        users::reset_credential,
        users::login,
        // Loans
        loans::borrow,
        loans::return_book,
        loans::extend,
        loans::check_deadline,
        loans::reconcile_overdue,
        loans::get_user_loans,
    ),
    components(
        schemas(
            // Catalog
            crate::models::book::Book,
            crate::models::book::NewBook,
            crate::models::book::RetireBook,
            crate::models::book::Availability,
            books::StockResponse,
            // Accounts
            crate::models::user::User,
            crate::models::user::Role,
            crate::models::user::NewUser,
            crate::models::user::RegisterRequest,
            crate::models::user::ResetCredential,
            crate::models::user::LoginRequest,
            users::MessageResponse,
            // Loans
            crate::models::loan::LoanRecord,
            crate::models::loan::LoanRequest,
            crate::models::loan::ReturnReceipt,
            crate::models::loan::OverdueReport,
            loans::DeadlineResponse,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Credential check"),
        (name = "books", description = "Catalog and inventory"),
        (name = "users", description = "Account management"),
        (name = "loans", description = "Borrowing, returns and extensions")
    )
)]
pub struct ApiDoc;

/// Serve the generated OpenAPI document
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
