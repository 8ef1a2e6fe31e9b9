//! Borrowing ledger on PgStore.
//!
//! Lifecycle writes run in one transaction and lock the rows they touch with
//! `FOR UPDATE`, so two borrowers cannot both see the last copy. Returning
//! early with `?` drops the transaction, which rolls it back.

use chrono::NaiveDate;
use sqlx::{postgres::PgRow, PgConnection, Postgres, QueryBuilder, Row};

use super::PgStore;
use crate::{
    error::{AppError, AppResult},
    models::{Book, Borrowing, BorrowingDetails, BorrowingFilter, NewBorrowing, User},
};

const BORROWING_COLUMNS: &str =
    "id, user_id, book_id, borrow_date, expected_return_date, actual_return_date";

const DETAILS_QUERY: &str = r#"
    SELECT br.id, br.borrow_date, br.expected_return_date, br.actual_return_date,
           b.id AS book_id, b.title, b.author, b.cover, b.inventory, b.daily_fee,
           u.id AS user_id, u.email, u.is_staff
    FROM borrowings br
    JOIN books b ON b.id = br.book_id
    JOIN users u ON u.id = br.user_id
"#;

fn details_from_row(row: &PgRow) -> Result<BorrowingDetails, sqlx::Error> {
    Ok(BorrowingDetails {
        id: row.try_get("id")?,
        user: User {
            id: row.try_get("user_id")?,
            email: row.try_get("email")?,
            is_staff: row.try_get("is_staff")?,
        },
        book: Book {
            id: row.try_get("book_id")?,
            title: row.try_get("title")?,
            author: row.try_get("author")?,
            cover: row.try_get("cover")?,
            inventory: row.try_get("inventory")?,
            daily_fee: row.try_get("daily_fee")?,
        },
        borrow_date: row.try_get("borrow_date")?,
        expected_return_date: row.try_get("expected_return_date")?,
        actual_return_date: row.try_get("actual_return_date")?,
    })
}

fn borrowing_not_found(id: i32) -> AppError {
    AppError::NotFound(format!("Borrowing with id {} not found", id))
}

async fn lock_book(conn: &mut PgConnection, id: i32) -> AppResult<Book> {
    sqlx::query_as::<_, Book>(
        "SELECT id, title, author, cover, inventory, daily_fee FROM books WHERE id = $1 FOR UPDATE",
    )
    .bind(id)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
}

async fn lock_borrowing(conn: &mut PgConnection, id: i32) -> AppResult<Borrowing> {
    sqlx::query_as::<_, Borrowing>(&format!(
        "SELECT {} FROM borrowings WHERE id = $1 FOR UPDATE",
        BORROWING_COLUMNS
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| borrowing_not_found(id))
}

async fn store_inventory(conn: &mut PgConnection, book: &Book) -> AppResult<()> {
    sqlx::query("UPDATE books SET inventory = $1 WHERE id = $2")
        .bind(book.inventory)
        .bind(book.id)
        .execute(conn)
        .await?;
    Ok(())
}

impl PgStore {
    /// List borrowings with book and user
    pub async fn borrowings_list(&self, filter: &BorrowingFilter) -> AppResult<Vec<BorrowingDetails>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(DETAILS_QUERY);
        builder.push(" WHERE TRUE");

        if let Some(user_id) = filter.user_id {
            builder.push(" AND br.user_id = ").push_bind(user_id);
        }
        match filter.is_active {
            Some(true) => {
                builder.push(" AND br.actual_return_date IS NULL");
            }
            Some(false) => {
                builder.push(" AND br.actual_return_date IS NOT NULL");
            }
            None => {}
        }
        if let Some(date) = filter.overdue_before {
            builder
                .push(" AND br.actual_return_date IS NULL AND br.expected_return_date < ")
                .push_bind(date);
        }
        builder.push(" ORDER BY br.id");

        let rows = builder.build().fetch_all(&self.pool).await?;
        let details = rows
            .iter()
            .map(details_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(details)
    }

    /// Get borrowing by ID
    pub async fn borrowings_get_by_id(&self, id: i32) -> AppResult<Borrowing> {
        sqlx::query_as::<_, Borrowing>(&format!(
            "SELECT {} FROM borrowings WHERE id = $1",
            BORROWING_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| borrowing_not_found(id))
    }

    /// Get borrowing by ID with book and user
    pub async fn borrowings_get_details(&self, id: i32) -> AppResult<BorrowingDetails> {
        let row = sqlx::query(&format!("{} WHERE br.id = $1", DETAILS_QUERY))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| borrowing_not_found(id))?;
        Ok(details_from_row(&row)?)
    }

    /// Take a copy and insert the borrowing, atomically
    pub async fn borrowings_open(&self, new: &NewBorrowing) -> AppResult<Borrowing> {
        let mut tx = self.pool.begin().await?;

        let mut book = lock_book(&mut tx, new.book_id).await?;
        book.take_copy()?;
        store_inventory(&mut tx, &book).await?;

        let borrowing = sqlx::query_as::<_, Borrowing>(&format!(
            r#"
            INSERT INTO borrowings (user_id, book_id, borrow_date, expected_return_date)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            BORROWING_COLUMNS
        ))
        .bind(new.user_id)
        .bind(new.book_id)
        .bind(new.borrow_date)
        .bind(new.expected_return_date)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(borrowing)
    }

    /// Mark returned and put the copy back, atomically
    pub async fn borrowings_close(&self, id: i32, returned_on: NaiveDate) -> AppResult<Borrowing> {
        let mut tx = self.pool.begin().await?;

        let mut borrowing = lock_borrowing(&mut tx, id).await?;
        borrowing.mark_returned(returned_on)?;

        let mut book = lock_book(&mut tx, borrowing.book_id).await?;
        book.put_back_copy();
        store_inventory(&mut tx, &book).await?;

        sqlx::query("UPDATE borrowings SET actual_return_date = $1 WHERE id = $2")
            .bind(borrowing.actual_return_date)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(borrowing)
    }

    /// Change the expected return date
    pub async fn borrowings_reschedule(&self, id: i32, expected_return_date: NaiveDate) -> AppResult<Borrowing> {
        let mut tx = self.pool.begin().await?;

        let mut borrowing = lock_borrowing(&mut tx, id).await?;
        borrowing.reschedule(expected_return_date)?;

        sqlx::query("UPDATE borrowings SET expected_return_date = $1 WHERE id = $2")
            .bind(borrowing.expected_return_date)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(borrowing)
    }

    /// Delete borrowing record
    pub async fn borrowings_delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM borrowings WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(borrowing_not_found(id));
        }
        Ok(())
    }
}
