//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, books, borrows, health, stats, users};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Libris API",
        version = "0.1.0",
        description = "Library Catalog and Borrowing REST API",
        license(name = "MIT")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::register,
        auth::login,
        auth::me,
        // Books
        books::list_books,
        books::get_book,
        books::create_book,
        books::update_book,
        books::delete_book,
        // Borrows
        borrows::create_borrow,
        borrows::return_borrow,
        borrows::my_borrows,
        // Users
        users::list_users,
        users::get_user,
        users::change_status,
        // Stats
        stats::get_home_stats,
        stats::get_dashboard_stats,
    ),
    components(
        schemas(
            // Auth
            auth::LoginRequest,
            auth::LoginResponse,
            auth::UserInfo,
            crate::models::user::RegisterUser,
            crate::models::user::UserStatus,
            crate::models::user::UserRole,
            crate::models::user::ChangeStatus,
            crate::models::user::User,
            users::UserDetails,
            // Books
            crate::models::book::Book,
            crate::models::book::CreateBook,
            crate::models::book::UpdateBook,
            crate::models::book::BookList,
            books::BookListResponse,
            // Borrows
            crate::models::borrow::Borrow,
            crate::models::borrow::BorrowDetails,
            crate::models::borrow::BorrowStatus,
            crate::models::borrow::CreateBorrow,
            borrows::BorrowResponse,
            borrows::ReturnResponse,
            borrows::MyBorrowsResponse,
            // Stats
            stats::HomeStats,
            stats::DashboardStats,
            stats::StatEntry,
            stats::CategoryShare,
            stats::TrendPoint,
            stats::ActivityType,
            stats::RecentActivity,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Authentication endpoints"),
        (name = "books", description = "Catalog management"),
        (name = "borrows", description = "Borrowing and returns"),
        (name = "users", description = "User verification and management"),
        (name = "stats", description = "Statistics")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new().merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
