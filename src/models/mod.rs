//! Data models for the library service

pub mod book;
pub mod borrowing;
pub mod user;

// Re-export commonly used types
pub use book::{Book, BookFilter, BookQuery, Cover, CreateBook, UpdateBook};
pub use borrowing::{
    Borrowing, BorrowingDetails, BorrowingFilter, BorrowingQuery, CreateBorrowing, NewBorrowing,
    UpdateBorrowing,
};
pub use user::{User, UserClaims};
