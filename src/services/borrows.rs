//! Borrow management service

use chrono::Duration;
use uuid::Uuid;

use crate::{
    config::BorrowsConfig,
    error::{AppError, AppResult},
    models::{
        book::Book,
        borrow::{Borrow, BorrowDetails},
        user::UserStatus,
    },
    policy,
    repository::Repository,
};

/// A member's borrow history with the counters shown alongside it
pub struct BorrowSummary {
    pub borrows: Vec<BorrowDetails>,
    pub active_count: i64,
    pub overdue_count: i64,
    pub total_count: i64,
    pub max_active_borrows: i64,
}

#[derive(Clone)]
pub struct BorrowsService {
    repository: Repository,
    config: BorrowsConfig,
}

impl BorrowsService {
    pub fn new(repository: Repository, config: BorrowsConfig) -> Self {
        Self { repository, config }
    }

    /// Borrowing requires an Active account; status is read fresh so admin
    /// suspensions take effect immediately.
    async fn require_active(&self, user_id: Uuid) -> AppResult<()> {
        let user = self.repository.users.get_by_id(user_id).await?;
        if user.parsed_status() != Some(UserStatus::Active) {
            return Err(AppError::Authorization(
                "Account must be active to borrow books".to_string(),
            ));
        }
        Ok(())
    }

    /// Borrow a book for a member
    pub async fn borrow(&self, user_id: Uuid, book_id: i32) -> AppResult<(Borrow, Book)> {
        self.require_active(user_id).await?;

        let loan_period = Duration::days(self.config.loan_period_days);
        let (borrow, book) = self
            .repository
            .borrows
            .create(user_id, book_id, loan_period)
            .await?;

        tracing::info!(
            user_id = %user_id,
            book_id,
            borrow_id = borrow.id,
            due_at = %borrow.due_at,
            "book borrowed"
        );

        Ok((borrow, book))
    }

    /// Return a borrowed book; only the borrowing member may return it
    pub async fn return_borrow(&self, borrow_id: i32, user_id: Uuid) -> AppResult<(Borrow, Book)> {
        self.require_active(user_id).await?;

        let (borrow, book) = self
            .repository
            .borrows
            .return_borrow(borrow_id, user_id)
            .await?;

        tracing::info!(user_id = %user_id, borrow_id, "book returned");

        Ok((borrow, book))
    }

    /// A member's borrow history with active/overdue/total counts
    pub async fn my_borrows(&self, user_id: Uuid) -> AppResult<BorrowSummary> {
        // Verify user exists
        self.repository.users.get_by_id(user_id).await?;

        let borrows = self.repository.borrows.list_for_user(user_id).await?;
        let active_count = borrows.iter().filter(|b| b.returned_at.is_none()).count() as i64;
        let overdue_count = borrows.iter().filter(|b| b.is_overdue).count() as i64;
        let total_count = borrows.len() as i64;

        Ok(BorrowSummary {
            borrows,
            active_count,
            overdue_count,
            total_count,
            max_active_borrows: policy::MAX_ACTIVE_BORROWS,
        })
    }
}
