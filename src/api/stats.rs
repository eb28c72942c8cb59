//! Statistics endpoints

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{error::AppResult, models::book::Book, models::user::User};

use super::AuthenticatedUser;

/// Landing page statistics (public)
#[derive(Serialize, ToSchema)]
pub struct HomeStats {
    /// Total books in the catalog
    pub total_books: i64,
    /// Registered members
    pub members: i64,
    /// Borrows started this calendar month
    pub borrowed_this_month: i64,
    /// Heuristic 1.0–5.0 rating derived from the overdue rate
    pub satisfaction_rating: f64,
    /// Most borrowed available books
    pub featured_books: Vec<Book>,
}

/// Label/count pair
#[derive(Serialize, ToSchema)]
pub struct StatEntry {
    pub label: String,
    pub value: i64,
}

/// Category share of the catalog
#[derive(Serialize, ToSchema)]
pub struct CategoryShare {
    pub label: String,
    pub percentage: f64,
}

/// One month of the borrowing trend
#[derive(Serialize, ToSchema)]
pub struct TrendPoint {
    /// Month label, YYYY-MM
    pub month: String,
    pub borrows: i64,
}

/// Kind of recent activity entry
#[derive(Serialize, ToSchema)]
pub enum ActivityType {
    Borrowed,
    Returned,
    Registered,
    Overdue,
}

/// Recent activity feed entry
#[derive(Serialize, ToSchema)]
pub struct RecentActivity {
    pub user_name: String,
    pub description: String,
    pub activity_type: ActivityType,
    pub timestamp: DateTime<Utc>,
}

/// Admin dashboard statistics
#[derive(Serialize, ToSchema)]
pub struct DashboardStats {
    pub total_users: i64,
    pub active_users: i64,
    pub pending_users: i64,
    pub user_status_counts: Vec<StatEntry>,
    /// Oldest accounts still awaiting verification
    pub pending_users_preview: Vec<User>,
    pub total_books: i64,
    pub available_copies: i64,
    pub category_percentages: Vec<CategoryShare>,
    pub currently_borrowed: i64,
    pub overdue_books: i64,
    /// Borrows per month over the last six months
    pub borrowing_trend: Vec<TrendPoint>,
    /// Borrows, returns, registrations and overdues from the last 7 days
    pub recent_activities: Vec<RecentActivity>,
}

/// Public landing page statistics
#[utoipa::path(
    get,
    path = "/stats/home",
    tag = "stats",
    responses(
        (status = 200, description = "Landing page statistics", body = HomeStats)
    )
)]
pub async fn get_home_stats(
    State(state): State<crate::AppState>,
) -> AppResult<Json<HomeStats>> {
    let stats = state.services.stats.home_stats().await?;
    Ok(Json(stats))
}

/// Admin dashboard statistics
#[utoipa::path(
    get,
    path = "/stats/dashboard",
    tag = "stats",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Dashboard statistics", body = DashboardStats),
        (status = 403, description = "Administrator rights required")
    )
)]
pub async fn get_dashboard_stats(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<DashboardStats>> {
    claims.require_admin()?;

    let stats = state.services.stats.dashboard_stats().await?;
    Ok(Json(stats))
}
