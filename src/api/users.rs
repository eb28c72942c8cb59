//! User management endpoints (admin)

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::user::{ChangeStatus, User, UserQuery, UserStatus},
    policy,
};

use super::{auth::UserInfo, AuthenticatedUser};

/// List users with search and status filter
#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    security(("bearer_auth" = [])),
    params(UserQuery),
    responses(
        (status = 200, description = "List of users", body = Vec<UserInfo>),
        (status = 403, description = "Administrator rights required")
    )
)]
pub async fn list_users(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<UserQuery>,
) -> AppResult<Json<Vec<UserInfo>>> {
    claims.require_admin()?;

    let users = state.services.users.search_users(query).await?;
    Ok(Json(users.into_iter().map(UserInfo::from).collect()))
}

/// Get user details by ID, with the status changes an admin may apply
#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User details", body = UserDetails),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<UserDetails>> {
    claims.require_admin()?;

    let user = state.services.users.get_by_id(id).await?;
    Ok(Json(UserDetails::from(user)))
}

/// User details with allowed status transitions
#[derive(serde::Serialize, utoipa::ToSchema)]
pub struct UserDetails {
    #[serde(flatten)]
    pub user: UserInfo,
    pub student_id_number: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    /// Statuses this account may legally be moved to
    pub allowed_status_changes: Vec<UserStatus>,
}

impl From<User> for UserDetails {
    fn from(user: User) -> Self {
        let allowed_status_changes = user
            .parsed_status()
            .map(|s| policy::allowed_transitions(s).to_vec())
            .unwrap_or_default();
        let student_id_number = user.student_id_number.clone();
        let created_at = user.created_at;
        Self {
            user: user.into(),
            student_id_number,
            created_at,
            allowed_status_changes,
        }
    }
}

/// Change a user's account status
#[utoipa::path(
    put,
    path = "/users/{id}/status",
    tag = "users",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    request_body = ChangeStatus,
    responses(
        (status = 200, description = "Status updated", body = UserInfo),
        (status = 404, description = "User not found"),
        (status = 422, description = "Transition not allowed from the current status")
    )
)]
pub async fn change_status(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<ChangeStatus>,
) -> AppResult<Json<UserInfo>> {
    claims.require_admin()?;

    let user = state
        .services
        .users
        .change_status(id, request.status)
        .await?;
    Ok(Json(user.into()))
}
