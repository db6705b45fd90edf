//! Catalog management service (inventory ledger operations)

use crate::{
    error::AppResult,
    models::book::{Availability, Book, BookQuery, NewBook},
    repository::{InventoryLedger, Repository},
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Add copies of a book. Returns the new total stock.
    pub async fn acquire(&self, new_book: &NewBook) -> AppResult<i32> {
        let mut tx = self.repository.begin().await?;
        let stock = tx.acquire(new_book).await?;
        tx.commit().await?;

        tracing::info!(isbn = %new_book.isbn, stock, "Added successfully");
        Ok(stock)
    }

    /// Retire one copy. Returns the remaining stock.
    pub async fn retire(&self, isbn: &str, note: &str) -> AppResult<i32> {
        let mut tx = self.repository.begin().await?;
        let stock = match tx.retire(isbn, note).await {
            Ok(stock) => stock,
            Err(e) => {
                tracing::warn!(isbn, "Retire failed: {}", e);
                return Err(e);
            }
        };
        tx.commit().await?;

        tracing::info!(isbn, stock, "Removed successfully");
        Ok(stock)
    }

    pub async fn check_available(&self, isbn: &str) -> AppResult<Availability> {
        let mut tx = self.repository.begin().await?;
        tx.check_available(isbn).await
    }

    pub async fn get_book(&self, isbn: &str) -> AppResult<Book> {
        let mut tx = self.repository.begin().await?;
        tx.get_book(isbn).await
    }

    pub async fn search(&self, query: &BookQuery) -> AppResult<Vec<Book>> {
        let mut tx = self.repository.begin().await?;
        let books = tx.search_books(query).await?;
        tracing::debug!("Catalog search returned {} book(s)", books.len());
        Ok(books)
    }
}
