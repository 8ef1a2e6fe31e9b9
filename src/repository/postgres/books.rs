//! Book queries on PgStore

use sqlx::{Postgres, QueryBuilder};

use super::{like_pattern, PgStore};
use crate::{
    error::{AppError, AppResult},
    models::{Book, BookFilter, CreateBook, UpdateBook},
};

const BOOK_COLUMNS: &str = "id, title, author, cover, inventory, daily_fee";

impl PgStore {
    /// List books matching the filter
    pub async fn books_list(&self, filter: &BookFilter) -> AppResult<Vec<Book>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM books WHERE TRUE", BOOK_COLUMNS));

        if let Some(ref title) = filter.title {
            builder.push(" AND title ILIKE ").push_bind(like_pattern(title));
        }
        if let Some(ref author) = filter.author {
            builder.push(" AND author ILIKE ").push_bind(like_pattern(author));
        }
        builder.push(" ORDER BY id");

        let books = builder
            .build_query_as::<Book>()
            .fetch_all(&self.pool)
            .await?;
        Ok(books)
    }

    /// Get book by ID
    pub async fn books_get_by_id(&self, id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(&format!("SELECT {} FROM books WHERE id = $1", BOOK_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// Create book
    pub async fn books_create(&self, data: &CreateBook) -> AppResult<Book> {
        let book = sqlx::query_as::<_, Book>(&format!(
            r#"
            INSERT INTO books (title, author, cover, inventory, daily_fee)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            BOOK_COLUMNS
        ))
        .bind(&data.title)
        .bind(&data.author)
        .bind(data.cover)
        .bind(data.inventory)
        .bind(data.daily_fee)
        .fetch_one(&self.pool)
        .await?;
        Ok(book)
    }

    /// Update book descriptive fields. Inventory is left alone.
    pub async fn books_update(&self, id: i32, data: &UpdateBook) -> AppResult<Book> {
        let book = sqlx::query_as::<_, Book>(&format!(
            r#"
            UPDATE books SET
                title = COALESCE($2, title),
                author = COALESCE($3, author),
                cover = COALESCE($4, cover),
                daily_fee = COALESCE($5, daily_fee)
            WHERE id = $1
            RETURNING {}
            "#,
            BOOK_COLUMNS
        ))
        .bind(id)
        .bind(&data.title)
        .bind(&data.author)
        .bind(data.cover)
        .bind(data.daily_fee)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))?;
        Ok(book)
    }

    /// Delete book (borrowings cascade)
    pub async fn books_delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }
        Ok(())
    }
}
