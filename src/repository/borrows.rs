//! Borrows repository for database operations
//!
//! Borrow creation and return run inside a transaction holding `FOR UPDATE`
//! locks on the borrower and book rows, so two concurrent requests for the
//! last copy cannot both observe it as available and one user's borrows
//! cannot race past the limit. The eligibility decision itself is delegated
//! to [`crate::policy`].

use chrono::{DateTime, Duration, Utc};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult, ErrorCode},
    models::{
        book::Book,
        borrow::{Borrow, BorrowDetails, BorrowStatus},
    },
    policy::{self, BorrowDecision},
};

#[derive(Clone)]
pub struct BorrowsRepository {
    pool: Pool<Postgres>,
}

impl BorrowsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Create a borrow record for a user, checking the borrow policy and
    /// decrementing availability as one atomic unit.
    pub async fn create(
        &self,
        user_id: Uuid,
        book_id: i32,
        loan_period: Duration,
    ) -> AppResult<(Borrow, Book)> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        // Borrower row lock serializes the open-borrow count for one user,
        // so two in-flight borrows of different books cannot both pass the
        // limit check
        sqlx::query_scalar::<_, Uuid>("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(
                    ErrorCode::NoSuchUser,
                    format!("User with id {} not found", user_id),
                )
            })?;

        // Row lock serializes the check-and-decrement per book
        let book = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1 FOR UPDATE")
            .bind(book_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(
                    ErrorCode::NoSuchBook,
                    format!("Book with id {} not found", book_id),
                )
            })?;

        let open_borrows: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM borrows WHERE user_id = $1 AND returned_at IS NULL",
        )
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        let decision = policy::evaluate_borrow(open_borrows, book.available_copies);
        if let Some(reason) = decision.reason() {
            let code = match decision {
                BorrowDecision::DenyLimitReached => ErrorCode::MaxBorrowsReached,
                _ => ErrorCode::BookUnavailable,
            };
            return Err(AppError::BusinessRule(code, reason));
        }

        let borrow = sqlx::query_as::<_, Borrow>(
            r#"
            INSERT INTO borrows (book_id, user_id, borrowed_at, due_at, returned_at, status)
            VALUES ($1, $2, $3, $4, NULL, $5)
            RETURNING *
            "#,
        )
        .bind(book_id)
        .bind(user_id)
        .bind(now)
        .bind(now + loan_period)
        .bind(BorrowStatus::Borrowed.as_str())
        .fetch_one(&mut *tx)
        .await?;

        let book = sqlx::query_as::<_, Book>(
            "UPDATE books SET available_copies = available_copies - 1 WHERE id = $1 RETURNING *",
        )
        .bind(book_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok((borrow, book))
    }

    /// Close an open borrow record owned by `user_id` and free the copy.
    pub async fn return_borrow(&self, borrow_id: i32, user_id: Uuid) -> AppResult<(Borrow, Book)> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let borrow = sqlx::query_as::<_, Borrow>(
            "SELECT * FROM borrows WHERE id = $1 AND user_id = $2 FOR UPDATE",
        )
        .bind(borrow_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(
                ErrorCode::NoSuchBorrow,
                format!("Borrow with id {} not found", borrow_id),
            )
        })?;

        if !borrow.is_open() {
            return Err(AppError::BusinessRule(
                ErrorCode::AlreadyReturned,
                "Borrow has already been returned".to_string(),
            ));
        }

        let borrow = sqlx::query_as::<_, Borrow>(
            "UPDATE borrows SET returned_at = $1, status = $2 WHERE id = $3 RETURNING *",
        )
        .bind(now)
        .bind(BorrowStatus::Returned.as_str())
        .bind(borrow_id)
        .fetch_one(&mut *tx)
        .await?;

        let book = sqlx::query_as::<_, Book>(
            "UPDATE books SET available_copies = available_copies + 1 WHERE id = $1 RETURNING *",
        )
        .bind(borrow.book_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok((borrow, book))
    }

    /// Borrow history for a user, newest first
    pub async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<BorrowDetails>> {
        let borrows = sqlx::query_as::<_, BorrowDetails>(
            r#"
            SELECT b.id, b.book_id, bk.title as book_title, bk.author as book_author,
                   b.borrowed_at, b.due_at, b.returned_at, b.status,
                   (b.returned_at IS NULL AND b.due_at < NOW()) as is_overdue
            FROM borrows b
            JOIN books bk ON b.book_id = bk.id
            WHERE b.user_id = $1
            ORDER BY b.borrowed_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(borrows)
    }

    /// Count of open borrows held by a user
    pub async fn count_open_for_user(&self, user_id: Uuid) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM borrows WHERE user_id = $1 AND returned_at IS NULL",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Count all borrow records ever created
    pub async fn count_total(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM borrows")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Count currently open borrows
    pub async fn count_active(&self) -> AppResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM borrows WHERE returned_at IS NULL")
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    /// Count open borrows past their due date
    pub async fn count_overdue(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM borrows WHERE returned_at IS NULL AND due_at < NOW()",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Count borrows created in [start, end)
    pub async fn count_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM borrows WHERE borrowed_at >= $1 AND borrowed_at < $2",
        )
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Borrow counts per month since `start`, labeled YYYY-MM
    pub async fn monthly_counts(&self, start: DateTime<Utc>) -> AppResult<Vec<(String, i64)>> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            r#"
            SELECT to_char(date_trunc('month', borrowed_at), 'YYYY-MM') as month, COUNT(*)
            FROM borrows
            WHERE borrowed_at >= $1
            GROUP BY 1
            ORDER BY 1
            "#,
        )
        .bind(start)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Recent borrow events since `since`: (borrower name, book title, when)
    pub async fn recent_borrows(
        &self,
        since: DateTime<Utc>,
        limit: i64,
    ) -> AppResult<Vec<(Option<String>, String, DateTime<Utc>)>> {
        let rows = sqlx::query_as::<_, (Option<String>, String, DateTime<Utc>)>(
            r#"
            SELECT u.full_name, bk.title, b.borrowed_at
            FROM borrows b
            JOIN books bk ON b.book_id = bk.id
            JOIN users u ON b.user_id = u.id
            WHERE b.borrowed_at >= $1
            ORDER BY b.borrowed_at DESC
            LIMIT $2
            "#,
        )
        .bind(since)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Recent return events since `since`: (borrower name, book title, when)
    pub async fn recent_returns(
        &self,
        since: DateTime<Utc>,
        limit: i64,
    ) -> AppResult<Vec<(Option<String>, String, DateTime<Utc>)>> {
        let rows = sqlx::query_as::<_, (Option<String>, String, DateTime<Utc>)>(
            r#"
            SELECT u.full_name, bk.title, b.returned_at
            FROM borrows b
            JOIN books bk ON b.book_id = bk.id
            JOIN users u ON b.user_id = u.id
            WHERE b.returned_at IS NOT NULL AND b.returned_at >= $1
            ORDER BY b.returned_at DESC
            LIMIT $2
            "#,
        )
        .bind(since)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Open borrows that fell due since `since`: (borrower name, book title, due date)
    pub async fn recent_overdues(
        &self,
        since: DateTime<Utc>,
        limit: i64,
    ) -> AppResult<Vec<(Option<String>, String, DateTime<Utc>)>> {
        let rows = sqlx::query_as::<_, (Option<String>, String, DateTime<Utc>)>(
            r#"
            SELECT u.full_name, bk.title, b.due_at
            FROM borrows b
            JOIN books bk ON b.book_id = bk.id
            JOIN users u ON b.user_id = u.id
            WHERE b.returned_at IS NULL AND b.due_at < NOW() AND b.due_at >= $1
            ORDER BY b.due_at DESC
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
