//! Users repository for database operations

use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult, ErrorCode},
    models::user::{User, UserQuery, UserStatus},
};

#[derive(Clone)]
pub struct UsersRepository {
    pool: Pool<Postgres>,
}

impl UsersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: Uuid) -> AppResult<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(ErrorCode::NoSuchUser, format!("User with id {} not found", id))
            })
    }

    /// Get user by email
    pub async fn get_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let user =
            sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;
        Ok(user)
    }

    /// Check if email already exists
    pub async fn email_exists(&self, email: &str) -> AppResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(email) = LOWER($1))")
                .bind(email)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    /// Insert a new user account
    pub async fn create(
        &self,
        email: &str,
        password_hash: &str,
        full_name: &str,
        student_id_number: Option<&str>,
        role: &str,
        status: UserStatus,
    ) -> AppResult<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, password_hash, full_name, student_id_number, role, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(password_hash)
        .bind(full_name)
        .bind(student_id_number)
        .bind(role)
        .bind(status.as_str())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    /// Search users by free text and status (admin listing)
    pub async fn search(&self, query: &UserQuery) -> AppResult<Vec<User>> {
        let mut sql = String::from("SELECT * FROM users WHERE TRUE");
        let mut params: Vec<String> = Vec::new();

        if let Some(ref search) = query.search {
            params.push(format!("%{}%", search.to_lowercase()));
            sql.push_str(&format!(
                " AND (LOWER(full_name) LIKE ${n} OR LOWER(email) LIKE ${n} OR LOWER(student_id_number) LIKE ${n})",
                n = params.len()
            ));
        }
        if let Some(ref status) = query.status {
            params.push(status.clone());
            sql.push_str(&format!(" AND status = ${}", params.len()));
        }
        sql.push_str(" ORDER BY created_at DESC");

        let mut q = sqlx::query_as::<_, User>(&sql);
        for p in &params {
            q = q.bind(p);
        }

        Ok(q.fetch_all(&self.pool).await?)
    }

    /// Persist a new account status. The caller has already validated the
    /// transition against the policy table.
    pub async fn set_status(&self, id: Uuid, status: UserStatus) -> AppResult<User> {
        sqlx::query_as::<_, User>("UPDATE users SET status = $1 WHERE id = $2 RETURNING *")
            .bind(status.as_str())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(ErrorCode::NoSuchUser, format!("User with id {} not found", id))
            })
    }

    /// Count all registered users
    pub async fn count_total(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// User counts per status label
    pub async fn status_counts(&self) -> AppResult<Vec<(String, i64)>> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            "SELECT status, COUNT(*) FROM users GROUP BY status ORDER BY status",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Oldest accounts still awaiting verification
    pub async fn pending_preview(&self, limit: i64) -> AppResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE status = $1 ORDER BY created_at LIMIT $2",
        )
        .bind(UserStatus::PendingVerification.as_str())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    /// Users registered since `since`: (name, when)
    pub async fn recent_registrations(
        &self,
        since: DateTime<Utc>,
        limit: i64,
    ) -> AppResult<Vec<(Option<String>, DateTime<Utc>)>> {
        let rows = sqlx::query_as::<_, (Option<String>, DateTime<Utc>)>(
            r#"
            SELECT full_name, created_at FROM users
            WHERE created_at >= $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(since)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
