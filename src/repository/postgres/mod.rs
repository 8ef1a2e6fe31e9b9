//! PostgreSQL store

mod books;
mod borrowings;
mod users;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{postgres::PgPoolOptions, Pool, Postgres};

use super::LibraryStore;
use crate::{
    config::DatabaseConfig,
    error::AppResult,
    models::{
        Book, BookFilter, Borrowing, BorrowingDetails, BorrowingFilter, CreateBook, NewBorrowing,
        UpdateBook, User,
    },
};

/// Store backed by a PostgreSQL connection pool
#[derive(Clone)]
pub struct PgStore {
    pool: Pool<Postgres>,
}

impl PgStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Open the pool and bring the schema up to date
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .connect(&config.url)
            .await?;

        tracing::info!("Connected to database");

        sqlx::migrate!("./migrations").run(&pool).await?;

        tracing::info!("Database migrations completed");

        Ok(Self::new(pool))
    }
}

/// Escape LIKE wildcards so the needle matches literally
fn like_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[async_trait]
impl LibraryStore for PgStore {
    async fn list_books(&self, filter: &BookFilter) -> AppResult<Vec<Book>> {
        self.books_list(filter).await
    }

    async fn get_book(&self, id: i32) -> AppResult<Book> {
        self.books_get_by_id(id).await
    }

    async fn create_book(&self, book: &CreateBook) -> AppResult<Book> {
        self.books_create(book).await
    }

    async fn update_book(&self, id: i32, book: &UpdateBook) -> AppResult<Book> {
        self.books_update(id, book).await
    }

    async fn delete_book(&self, id: i32) -> AppResult<()> {
        self.books_delete(id).await
    }

    async fn list_borrowings(&self, filter: &BorrowingFilter) -> AppResult<Vec<BorrowingDetails>> {
        self.borrowings_list(filter).await
    }

    async fn get_borrowing(&self, id: i32) -> AppResult<Borrowing> {
        self.borrowings_get_by_id(id).await
    }

    async fn get_borrowing_details(&self, id: i32) -> AppResult<BorrowingDetails> {
        self.borrowings_get_details(id).await
    }

    async fn open_borrowing(&self, borrowing: &NewBorrowing) -> AppResult<Borrowing> {
        self.borrowings_open(borrowing).await
    }

    async fn close_borrowing(&self, id: i32, returned_on: NaiveDate) -> AppResult<Borrowing> {
        self.borrowings_close(id, returned_on).await
    }

    async fn reschedule_borrowing(&self, id: i32, expected_return_date: NaiveDate) -> AppResult<Borrowing> {
        self.borrowings_reschedule(id, expected_return_date).await
    }

    async fn delete_borrowing(&self, id: i32) -> AppResult<()> {
        self.borrowings_delete(id).await
    }

    async fn get_user(&self, id: i32) -> AppResult<User> {
        self.users_get_by_id(id).await
    }

    async fn upsert_user(&self, user: &User) -> AppResult<User> {
        self.users_upsert(user).await
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
