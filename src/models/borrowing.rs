//! Borrowing model, lifecycle rules and list filtering

use chrono::NaiveDate;
use serde::{ser::SerializeStruct, Deserialize, Serialize, Serializer};
use sqlx::FromRow;

use super::{book::Book, user::{User, UserClaims}};
use crate::error::{AppError, AppResult};

/// Borrowing record from database.
///
/// A borrowing is active while `actual_return_date` is unset. The only
/// transition is Active -> Returned, and it is terminal.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Borrowing {
    pub id: i32,
    pub user_id: i32,
    pub book_id: i32,
    pub borrow_date: NaiveDate,
    pub expected_return_date: NaiveDate,
    pub actual_return_date: Option<NaiveDate>,
}

impl Borrowing {
    pub fn is_active(&self) -> bool {
        self.actual_return_date.is_none()
    }

    /// Close an active borrowing.
    pub fn mark_returned(&mut self, returned_on: NaiveDate) -> AppResult<()> {
        if !self.is_active() {
            return Err(AppError::AlreadyReturned);
        }
        self.actual_return_date = Some(returned_on);
        Ok(())
    }

    /// Move the expected return date (administrative edit).
    pub fn reschedule(&mut self, expected_return_date: NaiveDate) -> AppResult<()> {
        if !self.is_active() {
            return Err(AppError::AlreadyReturned);
        }
        check_expected_return_date(self.borrow_date, expected_return_date)?;
        self.expected_return_date = expected_return_date;
        Ok(())
    }
}

impl Serialize for Borrowing {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Borrowing", 7)?;
        s.serialize_field("id", &self.id)?;
        s.serialize_field("user_id", &self.user_id)?;
        s.serialize_field("book_id", &self.book_id)?;
        s.serialize_field("borrow_date", &self.borrow_date)?;
        s.serialize_field("expected_return_date", &self.expected_return_date)?;
        s.serialize_field("actual_return_date", &self.actual_return_date)?;
        s.serialize_field("is_active", &self.is_active())?;
        s.end()
    }
}

/// Expected return date must not precede the borrow date.
pub fn check_expected_return_date(borrow_date: NaiveDate, expected: NaiveDate) -> AppResult<()> {
    if expected < borrow_date {
        return Err(AppError::validation(
            "expected_return_date",
            "Expected return date cannot be earlier than borrowing date.",
        ));
    }
    Ok(())
}

/// Borrowing with the referenced book and user, for display
#[derive(Debug, Clone, PartialEq)]
pub struct BorrowingDetails {
    pub id: i32,
    pub user: User,
    pub book: Book,
    pub borrow_date: NaiveDate,
    pub expected_return_date: NaiveDate,
    pub actual_return_date: Option<NaiveDate>,
}

impl BorrowingDetails {
    pub fn is_active(&self) -> bool {
        self.actual_return_date.is_none()
    }
}

impl Serialize for BorrowingDetails {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("BorrowingDetails", 7)?;
        s.serialize_field("id", &self.id)?;
        s.serialize_field("user", &self.user)?;
        s.serialize_field("book", &self.book)?;
        s.serialize_field("borrow_date", &self.borrow_date)?;
        s.serialize_field("expected_return_date", &self.expected_return_date)?;
        s.serialize_field("actual_return_date", &self.actual_return_date)?;
        s.serialize_field("is_active", &self.is_active())?;
        s.end()
    }
}

/// Data for a new borrowing row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBorrowing {
    pub user_id: i32,
    pub book_id: i32,
    pub borrow_date: NaiveDate,
    pub expected_return_date: NaiveDate,
}

/// Create borrowing request
#[derive(Debug, Clone, Deserialize)]
pub struct CreateBorrowing {
    #[serde(alias = "book")]
    pub book_id: i32,
    pub expected_return_date: NaiveDate,
}

/// Update borrowing request (staff only)
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateBorrowing {
    pub expected_return_date: NaiveDate,
}

/// Borrowing list query parameters, as received
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BorrowingQuery {
    pub is_active: Option<String>,
    pub user_id: Option<String>,
    pub overdue: Option<String>,
}

/// Effective borrowing filter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BorrowingFilter {
    pub user_id: Option<i32>,
    pub is_active: Option<bool>,
    /// Only active borrowings due before this date
    pub overdue_before: Option<NaiveDate>,
}

fn parse_flag(value: &Option<String>) -> Option<bool> {
    match value.as_deref().map(str::to_lowercase).as_deref() {
        Some("true") => Some(true),
        Some("false") => Some(false),
        _ => None,
    }
}

impl BorrowingFilter {
    /// Build the filter a caller is allowed to run.
    ///
    /// Staff see every borrowing and may narrow by `user_id`; anyone else is
    /// restricted to their own records whatever `user_id` says.
    pub fn for_caller(caller: &UserClaims, query: &BorrowingQuery, today: NaiveDate) -> AppResult<Self> {
        let user_id = if caller.is_privileged() {
            match query.user_id.as_deref().map(str::trim) {
                None | Some("") => None,
                Some(raw) => Some(raw.parse::<i32>().map_err(|_| {
                    AppError::validation("user_id", format!("'{}' is not a valid user id", raw))
                })?),
            }
        } else {
            Some(caller.user_id)
        };

        let overdue_before = match parse_flag(&query.overdue) {
            Some(true) => Some(today),
            _ => None,
        };

        Ok(Self {
            user_id,
            is_active: parse_flag(&query.is_active),
            overdue_before,
        })
    }

    pub fn matches(&self, borrowing: &Borrowing) -> bool {
        if let Some(user_id) = self.user_id {
            if borrowing.user_id != user_id {
                return false;
            }
        }
        if let Some(active) = self.is_active {
            if borrowing.is_active() != active {
                return false;
            }
        }
        if let Some(date) = self.overdue_before {
            if !borrowing.is_active() || borrowing.expected_return_date >= date {
                return false;
            }
        }
        true
    }
}
