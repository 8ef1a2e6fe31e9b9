//! Repository layer for storage operations

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::{
    error::AppResult,
    models::{
        Book, BookFilter, Borrowing, BorrowingDetails, BorrowingFilter, CreateBook, NewBorrowing,
        UpdateBook, User,
    },
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Storage for books, borrowings and mirrored users.
///
/// `open_borrowing`, `close_borrowing` and `reschedule_borrowing` are atomic:
/// the book inventory change and the borrowing write either both persist or
/// neither does, and concurrent calls on the same book are serialized.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LibraryStore: Send + Sync {
    async fn list_books(&self, filter: &BookFilter) -> AppResult<Vec<Book>>;
    async fn get_book(&self, id: i32) -> AppResult<Book>;
    async fn create_book(&self, book: &CreateBook) -> AppResult<Book>;
    async fn update_book(&self, id: i32, book: &UpdateBook) -> AppResult<Book>;
    async fn delete_book(&self, id: i32) -> AppResult<()>;

    async fn list_borrowings(&self, filter: &BorrowingFilter) -> AppResult<Vec<BorrowingDetails>>;
    async fn get_borrowing(&self, id: i32) -> AppResult<Borrowing>;
    async fn get_borrowing_details(&self, id: i32) -> AppResult<BorrowingDetails>;
    /// Take a copy of the book and record the borrowing.
    async fn open_borrowing(&self, borrowing: &NewBorrowing) -> AppResult<Borrowing>;
    /// Mark the borrowing returned and put the copy back.
    async fn close_borrowing(&self, id: i32, returned_on: NaiveDate) -> AppResult<Borrowing>;
    /// Change the expected return date. Inventory is untouched.
    async fn reschedule_borrowing(&self, id: i32, expected_return_date: NaiveDate) -> AppResult<Borrowing>;
    /// Remove the record. Inventory is untouched.
    async fn delete_borrowing(&self, id: i32) -> AppResult<()>;

    async fn get_user(&self, id: i32) -> AppResult<User>;
    /// Insert or refresh a user record from the identity provider
    async fn upsert_user(&self, user: &User) -> AppResult<User>;

    /// Check the store is reachable
    async fn ping(&self) -> AppResult<()>;
}

/// Shared handle to the configured store
pub type Repository = Arc<dyn LibraryStore>;
