//! In-process store.
//!
//! Every mutating call holds the write lock for its whole read-check-write
//! sequence, so a borrow either fully happens or leaves no trace.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::NaiveDate;

use super::LibraryStore;
use crate::{
    error::{AppError, AppResult},
    models::{
        Book, BookFilter, Borrowing, BorrowingDetails, BorrowingFilter, CreateBook, NewBorrowing,
        UpdateBook, User,
    },
};

#[derive(Default)]
struct State {
    books: BTreeMap<i32, Book>,
    borrowings: BTreeMap<i32, Borrowing>,
    users: BTreeMap<i32, User>,
    next_book_id: i32,
    next_borrowing_id: i32,
}

impl State {
    fn book(&self, id: i32) -> AppResult<&Book> {
        self.books
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    fn borrowing(&self, id: i32) -> AppResult<&Borrowing> {
        self.borrowings
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("Borrowing with id {} not found", id)))
    }

    fn user(&self, id: i32) -> AppResult<&User> {
        self.users
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    fn details(&self, borrowing: &Borrowing) -> AppResult<BorrowingDetails> {
        Ok(BorrowingDetails {
            id: borrowing.id,
            user: self.user(borrowing.user_id)?.clone(),
            book: self.book(borrowing.book_id)?.clone(),
            borrow_date: borrowing.borrow_date,
            expected_return_date: borrowing.expected_return_date,
            actual_return_date: borrowing.actual_return_date,
        })
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // Guards are never held across an await point.
    fn read(&self) -> AppResult<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|_| AppError::Internal("memory store lock poisoned".to_string()))
    }

    fn write(&self) -> AppResult<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|_| AppError::Internal("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl LibraryStore for MemoryStore {
    async fn list_books(&self, filter: &BookFilter) -> AppResult<Vec<Book>> {
        let state = self.read()?;
        Ok(state
            .books
            .values()
            .filter(|b| filter.matches(b))
            .cloned()
            .collect())
    }

    async fn get_book(&self, id: i32) -> AppResult<Book> {
        self.read()?.book(id).cloned()
    }

    async fn create_book(&self, data: &CreateBook) -> AppResult<Book> {
        let mut state = self.write()?;
        state.next_book_id += 1;
        let book = Book {
            id: state.next_book_id,
            title: data.title.clone(),
            author: data.author.clone(),
            cover: data.cover,
            inventory: data.inventory,
            daily_fee: data.daily_fee,
        };
        state.books.insert(book.id, book.clone());
        Ok(book)
    }

    async fn update_book(&self, id: i32, data: &UpdateBook) -> AppResult<Book> {
        let mut state = self.write()?;
        let mut book = state.book(id)?.clone();
        data.apply_to(&mut book);
        state.books.insert(id, book.clone());
        Ok(book)
    }

    async fn delete_book(&self, id: i32) -> AppResult<()> {
        let mut state = self.write()?;
        state.book(id)?;
        state.books.remove(&id);
        // cascade
        state.borrowings.retain(|_, b| b.book_id != id);
        Ok(())
    }

    async fn list_borrowings(&self, filter: &BorrowingFilter) -> AppResult<Vec<BorrowingDetails>> {
        let state = self.read()?;
        state
            .borrowings
            .values()
            .filter(|b| filter.matches(b))
            .map(|b| state.details(b))
            .collect()
    }

    async fn get_borrowing(&self, id: i32) -> AppResult<Borrowing> {
        self.read()?.borrowing(id).cloned()
    }

    async fn get_borrowing_details(&self, id: i32) -> AppResult<BorrowingDetails> {
        let state = self.read()?;
        state.details(state.borrowing(id)?)
    }

    async fn open_borrowing(&self, new: &NewBorrowing) -> AppResult<Borrowing> {
        let mut state = self.write()?;
        state.user(new.user_id)?;
        let mut book = state.book(new.book_id)?.clone();
        book.take_copy()?;

        state.next_borrowing_id += 1;
        let borrowing = Borrowing {
            id: state.next_borrowing_id,
            user_id: new.user_id,
            book_id: new.book_id,
            borrow_date: new.borrow_date,
            expected_return_date: new.expected_return_date,
            actual_return_date: None,
        };
        state.books.insert(book.id, book);
        state.borrowings.insert(borrowing.id, borrowing.clone());
        Ok(borrowing)
    }

    async fn close_borrowing(&self, id: i32, returned_on: NaiveDate) -> AppResult<Borrowing> {
        let mut state = self.write()?;
        let mut borrowing = state.borrowing(id)?.clone();
        borrowing.mark_returned(returned_on)?;
        let mut book = state.book(borrowing.book_id)?.clone();
        book.put_back_copy();

        state.books.insert(book.id, book);
        state.borrowings.insert(id, borrowing.clone());
        Ok(borrowing)
    }

    async fn reschedule_borrowing(&self, id: i32, expected_return_date: NaiveDate) -> AppResult<Borrowing> {
        let mut state = self.write()?;
        let mut borrowing = state.borrowing(id)?.clone();
        borrowing.reschedule(expected_return_date)?;
        state.borrowings.insert(id, borrowing.clone());
        Ok(borrowing)
    }

    async fn delete_borrowing(&self, id: i32) -> AppResult<()> {
        let mut state = self.write()?;
        state.borrowing(id)?;
        state.borrowings.remove(&id);
        Ok(())
    }

    async fn get_user(&self, id: i32) -> AppResult<User> {
        self.read()?.user(id).cloned()
    }

    async fn upsert_user(&self, user: &User) -> AppResult<User> {
        self.write()?.users.insert(user.id, user.clone());
        Ok(user.clone())
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}
