//! Borrowing lifecycle service
//!
//! Borrow and return are the only entry points that keep book inventory in
//! step with outstanding borrowings. Staff edits and deletes go straight to
//! the record and do not adjust inventory.

use crate::{
    error::{AppError, AppResult},
    models::{
        borrowing::check_expected_return_date, Borrowing, BorrowingDetails, BorrowingFilter,
        BorrowingQuery, CreateBorrowing, NewBorrowing, UpdateBorrowing, User, UserClaims,
    },
    repository::Repository,
};

use super::today;

#[derive(Clone)]
pub struct BorrowingsService {
    repository: Repository,
}

impl BorrowingsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// List borrowings visible to the caller
    pub async fn list(&self, caller: &UserClaims, query: &BorrowingQuery) -> AppResult<Vec<BorrowingDetails>> {
        let filter = BorrowingFilter::for_caller(caller, query, today())?;
        self.repository.list_borrowings(&filter).await
    }

    /// Get one borrowing. Records of other users look missing to non-staff.
    pub async fn get(&self, caller: &UserClaims, id: i32) -> AppResult<BorrowingDetails> {
        let details = self.repository.get_borrowing_details(id).await?;
        if !caller.can_access(details.user.id) {
            return Err(not_found(id));
        }
        Ok(details)
    }

    /// Borrow a book: one copy leaves the shelf and a borrowing is recorded
    pub async fn create(&self, caller: &UserClaims, request: &CreateBorrowing) -> AppResult<Borrowing> {
        let borrow_date = today();
        check_expected_return_date(borrow_date, request.expected_return_date)?;

        self.repository.upsert_user(&User::from(caller)).await?;

        let result = self
            .repository
            .open_borrowing(&NewBorrowing {
                user_id: caller.user_id,
                book_id: request.book_id,
                borrow_date,
                expected_return_date: request.expected_return_date,
            })
            .await;

        match &result {
            Ok(borrowing) => tracing::info!(
                borrowing_id = borrowing.id,
                user_id = caller.user_id,
                book_id = request.book_id,
                "Book borrowed"
            ),
            Err(AppError::OutOfStock { title }) => tracing::info!(
                user_id = caller.user_id,
                book_id = request.book_id,
                "Borrow refused, {} is out of stock",
                title
            ),
            Err(_) => {}
        }

        result
    }

    /// Return a borrowed book
    pub async fn return_borrowing(&self, caller: &UserClaims, id: i32) -> AppResult<Borrowing> {
        let borrowing = self.repository.get_borrowing(id).await?;
        if !caller.can_access(borrowing.user_id) {
            return Err(not_found(id));
        }

        let returned = self.repository.close_borrowing(id, today()).await?;
        tracing::info!(borrowing_id = id, book_id = returned.book_id, "Book returned");
        Ok(returned)
    }

    /// Staff override of the expected return date
    pub async fn update(&self, id: i32, request: &UpdateBorrowing) -> AppResult<Borrowing> {
        let borrowing = self
            .repository
            .reschedule_borrowing(id, request.expected_return_date)
            .await?;
        tracing::info!(
            borrowing_id = id,
            expected_return_date = %borrowing.expected_return_date,
            "Borrowing rescheduled"
        );
        Ok(borrowing)
    }

    /// Staff removal of a borrowing record
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        self.repository.delete_borrowing(id).await?;
        tracing::warn!(borrowing_id = id, "Borrowing deleted without inventory adjustment");
        Ok(())
    }
}

fn not_found(id: i32) -> AppError {
    AppError::NotFound(format!("Borrowing with id {} not found", id))
}
