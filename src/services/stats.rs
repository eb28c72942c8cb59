//! Statistics service

use chrono::{Datelike, Duration, TimeZone, Utc};

use crate::{
    api::stats::{
        ActivityType, CategoryShare, DashboardStats, HomeStats, RecentActivity, StatEntry,
        TrendPoint,
    },
    error::AppResult,
    models::user::UserStatus,
    repository::Repository,
};

#[derive(Clone)]
pub struct StatsService {
    repository: Repository,
}

impl StatsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Landing page statistics (public)
    pub async fn home_stats(&self) -> AppResult<HomeStats> {
        let total_books = self.repository.books.count_total().await?;
        let members = self.repository.users.count_total().await?;

        let now = Utc::now();
        let start_of_month = Utc
            .with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
            .single()
            .unwrap_or(now);
        let borrowed_this_month = self
            .repository
            .borrows
            .count_between(start_of_month, now)
            .await?;

        let total_borrows = self.repository.borrows.count_total().await?;
        let overdue_borrows = self.repository.borrows.count_overdue().await?;
        let satisfaction_rating = satisfaction_rating(total_borrows, overdue_borrows);

        let featured_books = self.repository.books.featured(3).await?;

        Ok(HomeStats {
            total_books,
            members,
            borrowed_this_month,
            satisfaction_rating,
            featured_books,
        })
    }

    /// Admin dashboard statistics
    pub async fn dashboard_stats(&self) -> AppResult<DashboardStats> {
        let user_status_counts: Vec<StatEntry> = self
            .repository
            .users
            .status_counts()
            .await?
            .into_iter()
            .map(|(label, value)| StatEntry { label, value })
            .collect();

        let count_status = |s: UserStatus| {
            user_status_counts
                .iter()
                .find(|e| e.label == s.as_str())
                .map(|e| e.value)
                .unwrap_or(0)
        };
        let active_users = count_status(UserStatus::Active);
        let pending_users = count_status(UserStatus::PendingVerification);

        let total_users = self.repository.users.count_total().await?;
        let pending_users_preview = self.repository.users.pending_preview(3).await?;

        let total_books = self.repository.books.count_total().await?;
        let available_copies = self.repository.books.sum_available().await?;

        let category_counts = self.repository.books.category_counts().await?;
        let books_in_categories: i64 = category_counts.iter().map(|(_, c)| c).sum();
        let category_percentages = category_counts
            .into_iter()
            .map(|(label, count)| CategoryShare {
                label,
                percentage: if books_in_categories > 0 {
                    count as f64 * 100.0 / books_in_categories as f64
                } else {
                    0.0
                },
            })
            .collect();

        let currently_borrowed = self.repository.borrows.count_active().await?;
        let overdue_books = self.repository.borrows.count_overdue().await?;

        let borrowing_trend = self.borrowing_trend().await?;
        let recent_activities = self.recent_activities().await?;

        Ok(DashboardStats {
            total_users,
            active_users,
            pending_users,
            user_status_counts,
            pending_users_preview,
            total_books,
            available_copies,
            category_percentages,
            currently_borrowed,
            overdue_books,
            borrowing_trend,
            recent_activities,
        })
    }

    /// Borrow counts per month over the last 6 months, months with no
    /// activity included as zero
    async fn borrowing_trend(&self) -> AppResult<Vec<TrendPoint>> {
        let now = Utc::now();
        let mut year = now.year();
        let mut month = now.month() as i32 - 5;
        while month < 1 {
            month += 12;
            year -= 1;
        }
        let start = Utc
            .with_ymd_and_hms(year, month as u32, 1, 0, 0, 0)
            .single()
            .unwrap_or(now);

        let counts = self.repository.borrows.monthly_counts(start).await?;

        let mut trend = Vec::with_capacity(6);
        for i in 0..6 {
            let mut m = month + i;
            let mut y = year;
            if m > 12 {
                m -= 12;
                y += 1;
            }
            let label = format!("{}-{:02}", y, m);
            let borrows = counts
                .iter()
                .find(|(l, _)| *l == label)
                .map(|(_, c)| *c)
                .unwrap_or(0);
            trend.push(TrendPoint { month: label, borrows });
        }

        Ok(trend)
    }

    /// Activity feed over the last 7 days: borrows, returns, registrations
    /// and newly overdue books, newest first
    async fn recent_activities(&self) -> AppResult<Vec<RecentActivity>> {
        let since = Utc::now() - Duration::days(7);
        let mut activities = Vec::new();

        for (user_name, title, at) in self.repository.borrows.recent_borrows(since, 10).await? {
            activities.push(RecentActivity {
                user_name: user_name.unwrap_or_else(|| "Unknown User".to_string()),
                description: format!("Borrowed \"{}\"", title),
                activity_type: ActivityType::Borrowed,
                timestamp: at,
            });
        }

        for (user_name, title, at) in self.repository.borrows.recent_returns(since, 10).await? {
            activities.push(RecentActivity {
                user_name: user_name.unwrap_or_else(|| "Unknown User".to_string()),
                description: format!("Returned \"{}\"", title),
                activity_type: ActivityType::Returned,
                timestamp: at,
            });
        }

        for (user_name, at) in self.repository.users.recent_registrations(since, 10).await? {
            activities.push(RecentActivity {
                user_name: user_name.unwrap_or_else(|| "Unknown User".to_string()),
                description: "Registered".to_string(),
                activity_type: ActivityType::Registered,
                timestamp: at,
            });
        }

        for (user_name, title, due_at) in self.repository.borrows.recent_overdues(since, 5).await? {
            activities.push(RecentActivity {
                user_name: user_name.unwrap_or_else(|| "Unknown User".to_string()),
                description: format!("\"{}\" is overdue", title),
                activity_type: ActivityType::Overdue,
                timestamp: due_at,
            });
        }

        activities.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        activities.truncate(10);

        Ok(activities)
    }
}

/// Presentational satisfaction heuristic: 5 stars, minus 2 per unit of
/// overdue rate, floored at 1.
fn satisfaction_rating(total_borrows: i64, overdue_borrows: i64) -> f64 {
    if total_borrows == 0 {
        return 5.0;
    }
    let overdue_rate = overdue_borrows as f64 / total_borrows as f64;
    (5.0 - overdue_rate * 2.0).max(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_satisfaction_rating() {
        assert_eq!(satisfaction_rating(0, 0), 5.0);
        assert_eq!(satisfaction_rating(100, 0), 5.0);
        assert_eq!(satisfaction_rating(100, 50), 4.0);
        // Floors at 1.0 even when everything is overdue twice over
        assert_eq!(satisfaction_rating(10, 10), 3.0);
        assert_eq!(satisfaction_rating(1, 100), 1.0);
    }
}
