//! Book model and related types

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use validator::{Validate, ValidationError};

use crate::error::{AppError, AppResult};

/// Cover type of a book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cover {
    Hard,
    Soft,
}

impl Cover {
    pub fn as_str(&self) -> &'static str {
        match self {
            Cover::Hard => "Hard",
            Cover::Soft => "Soft",
        }
    }
}

impl std::fmt::Display for Cover {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Cover {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hard" => Ok(Cover::Hard),
            "soft" => Ok(Cover::Soft),
            _ => Err(format!("Invalid cover type: {}", s)),
        }
    }
}

// Stored as TEXT
impl sqlx::Type<Postgres> for Cover {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<Postgres>>::compatible(ty)
    }
}

impl<'r> Decode<'r, Postgres> for Cover {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: &str = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for Cover {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <&str as Encode<Postgres>>::encode(self.as_str(), buf)
    }
}

/// Book record. `inventory` counts the copies currently on the shelf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub cover: Cover,
    pub inventory: i32,
    pub daily_fee: Decimal,
}

impl Book {
    /// Take one copy off the shelf for a new borrowing.
    pub fn take_copy(&mut self) -> AppResult<()> {
        if self.inventory < 1 {
            return Err(AppError::OutOfStock {
                title: self.title.clone(),
            });
        }
        self.inventory -= 1;
        Ok(())
    }

    /// Put a returned copy back on the shelf.
    pub fn put_back_copy(&mut self) {
        self.inventory += 1;
    }
}

/// Fees are stored as NUMERIC(8, 2): at most two decimal places, below one million.
fn validate_daily_fee(fee: &Decimal) -> Result<(), ValidationError> {
    let message = if !fee.is_sign_positive() || fee.is_zero() {
        "Daily fee must be greater than zero"
    } else if fee.normalize().scale() > 2 {
        "Ensure that there are no more than 2 decimal places."
    } else if *fee >= Decimal::new(1_000_000, 0) {
        "Ensure that there are no more than 8 digits in total."
    } else {
        return Ok(());
    };

    let mut err = ValidationError::new("daily_fee");
    err.message = Some(message.into());
    Err(err)
}

/// Create book request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateBook {
    #[validate(length(min = 1, message = "Title may not be blank"))]
    pub title: String,
    #[validate(length(min = 1, message = "Author may not be blank"))]
    pub author: String,
    pub cover: Cover,
    #[validate(range(min = 0, message = "Inventory cannot be negative"))]
    pub inventory: i32,
    #[validate(custom(function = "validate_daily_fee"))]
    pub daily_fee: Decimal,
}

/// Update book request. Inventory is not editable here: it only moves
/// through borrow and return.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateBook {
    #[validate(length(min = 1, message = "Title may not be blank"))]
    pub title: Option<String>,
    #[validate(length(min = 1, message = "Author may not be blank"))]
    pub author: Option<String>,
    pub cover: Option<Cover>,
    #[validate(custom(function = "validate_daily_fee"))]
    pub daily_fee: Option<Decimal>,
}

impl UpdateBook {
    pub fn apply_to(&self, book: &mut Book) {
        if let Some(ref title) = self.title {
            book.title = title.clone();
        }
        if let Some(ref author) = self.author {
            book.author = author.clone();
        }
        if let Some(cover) = self.cover {
            book.cover = cover;
        }
        if let Some(fee) = self.daily_fee {
            book.daily_fee = fee;
        }
    }
}

/// Book list query parameters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookQuery {
    pub title: Option<String>,
    pub author: Option<String>,
}

/// Effective book filter: case-insensitive substring on title and author,
/// combined with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookFilter {
    pub title: Option<String>,
    pub author: Option<String>,
}

impl From<&BookQuery> for BookFilter {
    fn from(query: &BookQuery) -> Self {
        fn needle(value: &Option<String>) -> Option<String> {
            value
                .as_deref()
                .filter(|v| !v.is_empty())
                .map(str::to_lowercase)
        }

        Self {
            title: needle(&query.title),
            author: needle(&query.author),
        }
    }
}

impl BookFilter {
    pub fn matches(&self, book: &Book) -> bool {
        let contains = |haystack: &str, needle: &Option<String>| {
            needle
                .as_deref()
                .map_or(true, |n| haystack.to_lowercase().contains(n))
        };

        contains(&book.title, &self.title) && contains(&book.author, &self.author)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn book(title: &str, author: &str, inventory: i32) -> Book {
        Book {
            id: 1,
            title: title.to_string(),
            author: author.to_string(),
            cover: Cover::Hard,
            inventory,
            daily_fee: Decimal::new(150, 2),
        }
    }

    #[test]
    fn test_take_copy_decrements() {
        let mut b = book("Book one", "Author One", 1);
        assert!(b.take_copy().is_ok());
        assert_eq!(b.inventory, 0);
    }

    #[test]
    fn test_take_copy_out_of_stock() {
        let mut b = book("Book one", "Author One", 0);
        match b.take_copy() {
            Err(AppError::OutOfStock { title }) => assert_eq!(title, "Book one"),
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(b.inventory, 0);
    }

    #[test]
    fn test_cover_parse() {
        assert_eq!("hard".parse::<Cover>(), Ok(Cover::Hard));
        assert_eq!("Soft".parse::<Cover>(), Ok(Cover::Soft));
        assert!("paper".parse::<Cover>().is_err());
    }

    #[test]
    fn test_filter_title_case_insensitive() {
        let filter = BookFilter::from(&BookQuery {
            title: Some("Book One".to_string()),
            author: None,
        });
        assert!(filter.matches(&book("Book one", "Author One", 5)));
        assert!(filter.matches(&book("The BOOK ONE saga", "Someone", 5)));
        assert!(!filter.matches(&book("Book two", "Author Two", 3)));
    }

    #[test]
    fn test_filter_title_and_author_combined() {
        let filter = BookFilter::from(&BookQuery {
            title: Some("book".to_string()),
            author: Some("two".to_string()),
        });
        assert!(!filter.matches(&book("Book one", "Author One", 5)));
        assert!(filter.matches(&book("Book two", "Author Two", 3)));
    }

    #[test]
    fn test_empty_filter_values_are_ignored() {
        let filter = BookFilter::from(&BookQuery {
            title: Some(String::new()),
            author: None,
        });
        assert_eq!(filter, BookFilter::default());
    }

    #[test]
    fn test_create_book_validation() {
        let request = CreateBook {
            title: String::new(),
            author: "Author".to_string(),
            cover: Cover::Soft,
            inventory: -1,
            daily_fee: Decimal::ZERO,
        };
        let errors = request.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("title"));
        assert!(fields.contains_key("inventory"));
        assert!(fields.contains_key("daily_fee"));
    }

    #[test]
    fn test_daily_fee_fits_storage() {
        assert!(validate_daily_fee(&Decimal::new(150, 2)).is_ok());
        assert!(validate_daily_fee(&Decimal::new(1500, 3)).is_ok());
        assert!(validate_daily_fee(&Decimal::new(99_999_999, 2)).is_ok());

        let too_precise = validate_daily_fee(&Decimal::new(1, 3)).unwrap_err();
        assert_eq!(
            too_precise.message.as_deref(),
            Some("Ensure that there are no more than 2 decimal places.")
        );
        assert!(validate_daily_fee(&Decimal::new(1_000_000, 0)).is_err());
        assert!(validate_daily_fee(&Decimal::ZERO).is_err());
    }

    #[test]
    fn test_update_book_rejects_unstorable_fee() {
        let request = UpdateBook {
            daily_fee: Some(Decimal::new(1001, 3)),
            ..Default::default()
        };
        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("daily_fee"));
    }

    #[test]
    fn test_update_book_leaves_inventory() {
        let mut b = book("Book one", "Author One", 4);
        UpdateBook {
            title: Some("Updated book".to_string()),
            ..Default::default()
        }
        .apply_to(&mut b);
        assert_eq!(b.title, "Updated book");
        assert_eq!(b.author, "Author One");
        assert_eq!(b.inventory, 4);
    }
}
