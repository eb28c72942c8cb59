//! Books repository for database operations

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult, ErrorCode},
    models::book::{Book, BookQuery, CreateBook, UpdateBook},
};

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get book by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(ErrorCode::NoSuchBook, format!("Book with id {} not found", id))
            })
    }

    /// Search books by free text, category and availability
    pub async fn search(&self, query: &BookQuery) -> AppResult<Vec<Book>> {
        let mut sql = String::from("SELECT * FROM books WHERE TRUE");
        let mut params: Vec<String> = Vec::new();

        if let Some(ref search) = query.search {
            params.push(format!("%{}%", search.to_lowercase()));
            sql.push_str(&format!(
                " AND (LOWER(title) LIKE ${n} OR LOWER(author) LIKE ${n} OR LOWER(isbn) LIKE ${n})",
                n = params.len()
            ));
        }
        if let Some(ref category) = query.category {
            params.push(category.clone());
            sql.push_str(&format!(" AND category = ${}", params.len()));
        }
        if query.available_only {
            sql.push_str(" AND available_copies > 0");
        }
        sql.push_str(" ORDER BY title");

        let mut q = sqlx::query_as::<_, Book>(&sql);
        for p in &params {
            q = q.bind(p);
        }

        Ok(q.fetch_all(&self.pool).await?)
    }

    /// Distinct categories for the search filter dropdown
    pub async fn list_categories(&self) -> AppResult<Vec<String>> {
        let categories: Vec<String> =
            sqlx::query_scalar("SELECT DISTINCT category FROM books ORDER BY category")
                .fetch_all(&self.pool)
                .await?;
        Ok(categories)
    }

    /// Create a new book; all copies start available
    pub async fn create(&self, book: &CreateBook) -> AppResult<Book> {
        let created = sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (title, author, isbn, category, description, total_copies, available_copies)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            RETURNING *
            "#,
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.isbn)
        .bind(&book.category)
        .bind(&book.description)
        .bind(book.total_copies)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    /// Update an existing book
    pub async fn update(&self, id: i32, book: &UpdateBook) -> AppResult<Book> {
        if book.available_copies > book.total_copies {
            return Err(AppError::Validation(
                "Available copies cannot exceed total copies".to_string(),
            ));
        }

        sqlx::query_as::<_, Book>(
            r#"
            UPDATE books
            SET title = $1, author = $2, isbn = $3, category = $4,
                description = $5, total_copies = $6, available_copies = $7
            WHERE id = $8
            RETURNING *
            "#,
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.isbn)
        .bind(&book.category)
        .bind(&book.description)
        .bind(book.total_copies)
        .bind(book.available_copies)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| {
                AppError::NotFound(ErrorCode::NoSuchBook, format!("Book with id {} not found", id))
            })
    }

    /// Count all books in the catalog
    pub async fn count_total(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Sum of available copies across the catalog
    pub async fn sum_available(&self) -> AppResult<i64> {
        let sum: Option<i64> =
            sqlx::query_scalar("SELECT SUM(available_copies)::bigint FROM books")
                .fetch_one(&self.pool)
                .await?;
        Ok(sum.unwrap_or(0))
    }

    /// Book counts per category
    pub async fn category_counts(&self) -> AppResult<Vec<(String, i64)>> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            "SELECT category, COUNT(*) FROM books GROUP BY category ORDER BY category",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Most borrowed available books, for the landing page
    pub async fn featured(&self, limit: i64) -> AppResult<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>(
            r#"
            SELECT * FROM books
            WHERE available_copies > 0
            ORDER BY total_copies - available_copies DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(books)
    }

    /// Delete a book. Refused while open borrow records reference it.
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let has_open_borrows: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM borrows WHERE book_id = $1 AND returned_at IS NULL)",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        if has_open_borrows {
            return Err(AppError::BusinessRule(
                ErrorCode::BookHasOpenBorrows,
                "Book has copies out on loan and cannot be deleted".to_string(),
            ));
        }

        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(
                ErrorCode::NoSuchBook,
                format!("Book with id {} not found", id),
            ));
        }

        Ok(())
    }
}
