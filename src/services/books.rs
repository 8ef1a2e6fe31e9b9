//! Book catalogue service

use validator::Validate;

use crate::{
    error::AppResult,
    models::{Book, BookFilter, BookQuery, CreateBook, UpdateBook},
    repository::Repository,
};

#[derive(Clone)]
pub struct BooksService {
    repository: Repository,
}

impl BooksService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list(&self, query: &BookQuery) -> AppResult<Vec<Book>> {
        self.repository.list_books(&BookFilter::from(query)).await
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        self.repository.get_book(id).await
    }

    pub async fn create(&self, data: &CreateBook) -> AppResult<Book> {
        data.validate()?;
        let book = self.repository.create_book(data).await?;
        tracing::info!(book_id = book.id, inventory = book.inventory, "Book created: {}", book.title);
        Ok(book)
    }

    pub async fn update(&self, id: i32, data: &UpdateBook) -> AppResult<Book> {
        data.validate()?;
        self.repository.update_book(id, data).await
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        self.repository.delete_book(id).await?;
        tracing::info!(book_id = id, "Book deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::AppError, models::Cover, repository::MemoryStore};
    use rust_decimal::Decimal;
    use std::sync::Arc;

    fn create(title: &str, author: &str) -> CreateBook {
        CreateBook {
            title: title.to_string(),
            author: author.to_string(),
            cover: Cover::Soft,
            inventory: 3,
            daily_fee: Decimal::new(200, 2),
        }
    }

    #[tokio::test]
    async fn test_search_by_title_and_author() {
        let service = BooksService::new(Arc::new(MemoryStore::new()));
        service.create(&create("Book one", "Author One")).await.unwrap();
        service.create(&create("Book two", "Author Two")).await.unwrap();

        let by_title = service
            .list(&BookQuery { title: Some("Book One".to_string()), author: None })
            .await
            .unwrap();
        assert_eq!(by_title.len(), 1);
        assert_eq!(by_title[0].title, "Book one");

        let by_author = service
            .list(&BookQuery { title: None, author: Some("author two".to_string()) })
            .await
            .unwrap();
        assert_eq!(by_author.len(), 1);
        assert_eq!(by_author[0].author, "Author Two");

        let all = service.list(&BookQuery::default()).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_book() {
        let service = BooksService::new(Arc::new(MemoryStore::new()));
        let mut request = create("", "Author");
        request.daily_fee = Decimal::new(-1, 0);

        let result = service.create(&request).await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
        assert!(service.list(&BookQuery::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_missing_book() {
        let service = BooksService::new(Arc::new(MemoryStore::new()));
        let result = service.update(42, &UpdateBook::default()).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
