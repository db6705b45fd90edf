//! Book (catalog entry) model and related types

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Book as stored in the inventory ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub isbn: String,
    pub title: String,
    pub author: String,
    pub publisher: String,
    /// Copies owned by the library
    pub stock: i32,
    /// Copies currently on the shelf
    pub available: i32,
    /// Accumulated removal notes, most recent first
    #[sqlx(rename = "removeinfo")]
    pub remove_info: Option<String>,
}

impl Book {
    /// Whether every copy of this book has been retired
    pub fn is_retired(&self) -> bool {
        self.stock <= 0
    }
}

/// Acquisition request: adds `quantity` copies, creating the book if unseen
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct NewBook {
    #[validate(length(min = 1, max = 16, message = "ISBN must be 1-16 characters"))]
    pub isbn: String,
    #[validate(length(min = 1, max = 256, message = "Title must be 1-256 characters"))]
    pub title: String,
    #[validate(length(min = 1, max = 256, message = "Author must be 1-256 characters"))]
    pub author: String,
    #[validate(length(min = 1, max = 256, message = "Publisher must be 1-256 characters"))]
    pub publisher: String,
    #[validate(range(min = 1, message = "Quantity must be a positive integer"))]
    pub quantity: i32,
}

/// Retirement request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RetireBook {
    #[validate(length(min = 1, message = "A removal note is required"))]
    pub note: String,
}

/// Stock and availability snapshot for one book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct Availability {
    pub stock: i32,
    pub available: i32,
}

/// Catalog search filters
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BookQuery {
    /// Title substring
    pub title: Option<String>,
    /// Author substring
    pub author: Option<String>,
    /// Exact ISBN
    pub isbn: Option<String>,
    /// Also list books whose copies have all been retired
    pub include_retired: Option<bool>,
}

impl BookQuery {
    pub fn by_title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    pub fn by_author(author: impl Into<String>) -> Self {
        Self {
            author: Some(author.into()),
            ..Default::default()
        }
    }

    pub fn by_isbn(isbn: impl Into<String>) -> Self {
        Self {
            isbn: Some(isbn.into()),
            ..Default::default()
        }
    }

    /// In-process filter, shared by backends that cannot push it down
    pub fn matches(&self, book: &Book) -> bool {
        if book.is_retired() && !self.include_retired.unwrap_or(false) {
            return false;
        }
        if let Some(ref isbn) = self.isbn {
            if &book.isbn != isbn {
                return false;
            }
        }
        if let Some(ref title) = self.title {
            if !book.title.to_lowercase().contains(&title.to_lowercase()) {
                return false;
            }
        }
        if let Some(ref author) = self.author {
            if !book.author.to_lowercase().contains(&author.to_lowercase()) {
                return false;
            }
        }
        true
    }
}

/// Search result ordering: shorter titles first, then alphabetical
pub fn sort_by_title(books: &mut [Book]) {
    books.sort_by(|a, b| {
        a.title
            .chars()
            .count()
            .cmp(&b.title.chars().count())
            .then_with(|| a.title.cmp(&b.title))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(isbn: &str, title: &str, author: &str, stock: i32) -> Book {
        Book {
            isbn: isbn.to_string(),
            title: title.to_string(),
            author: author.to_string(),
            publisher: "Folio".to_string(),
            stock,
            available: stock,
            remove_info: None,
        }
    }

    #[test]
    fn test_query_skips_retired_by_default() {
        let retired = book("1", "Dune", "Herbert", 0);
        assert!(!BookQuery::by_title("dune").matches(&retired));

        let query = BookQuery {
            include_retired: Some(true),
            ..BookQuery::by_title("dune")
        };
        assert!(query.matches(&retired));
    }

    #[test]
    fn test_query_author_is_case_insensitive() {
        let b = book("1", "Dune", "Frank Herbert", 2);
        assert!(BookQuery::by_author("herbert").matches(&b));
        assert!(!BookQuery::by_author("asimov").matches(&b));
    }

    #[test]
    fn test_sort_by_title_length_then_name() {
        let mut books = vec![
            book("1", "Foundation", "Asimov", 1),
            book("2", "Dune", "Herbert", 1),
            book("3", "Emma", "Austen", 1),
        ];
        sort_by_title(&mut books);
        let titles: Vec<_> = books.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, vec!["Dune", "Emma", "Foundation"]);
    }

    #[test]
    fn test_new_book_rejects_zero_quantity() {
        let request = NewBook {
            isbn: "9780441013593".to_string(),
            title: "Dune".to_string(),
            author: "Frank Herbert".to_string(),
            publisher: "Ace".to_string(),
            quantity: 0,
        };
        assert!(request.validate().is_err());
    }
}
