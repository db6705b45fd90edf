//! Inventory ledger: stock and availability counters per book

use async_trait::async_trait;

use crate::{
    error::{AppError, AppResult},
    models::book::{Availability, Book, BookQuery, NewBook},
};

use super::postgres::PgLedgerTx;

const BOOK_COLUMNS: &str = "title, isbn, author, publisher, stock, available, removeinfo";

/// `ILIKE` pattern matching `needle` anywhere, with `%`, `_` and `\` taken literally
fn contains_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Book counters. Backends supply row access; the counter rules live in the
/// provided methods so every backend enforces them identically.
#[async_trait]
pub trait InventoryLedger: Send {
    async fn find_book(&mut self, isbn: &str) -> AppResult<Option<Book>>;

    async fn insert_book(&mut self, book: &Book) -> AppResult<()>;

    /// Persist `stock`, `available` and `remove_info` of an existing book
    async fn store_book(&mut self, book: &Book) -> AppResult<()>;

    async fn search_books(&mut self, query: &BookQuery) -> AppResult<Vec<Book>>;

    async fn get_book(&mut self, isbn: &str) -> AppResult<Book> {
        self.find_book(isbn)
            .await?
            .ok_or_else(|| AppError::BookNotFound(isbn.to_string()))
    }

    /// Add copies, creating the book on first acquisition. Returns the new stock.
    async fn acquire(&mut self, new_book: &NewBook) -> AppResult<i32> {
        match self.find_book(&new_book.isbn).await? {
            Some(mut book) => {
                let (Some(stock), Some(available)) = (
                    book.stock.checked_add(new_book.quantity),
                    book.available.checked_add(new_book.quantity),
                ) else {
                    return Err(AppError::Validation(format!(
                        "Stock out of range for {}",
                        new_book.isbn
                    )));
                };
                book.stock = stock;
                book.available = available;
                self.store_book(&book).await?;
                Ok(book.stock)
            }
            None => {
                let book = Book {
                    isbn: new_book.isbn.clone(),
                    title: new_book.title.clone(),
                    author: new_book.author.clone(),
                    publisher: new_book.publisher.clone(),
                    stock: new_book.quantity,
                    available: new_book.quantity,
                    remove_info: None,
                };
                self.insert_book(&book).await?;
                Ok(book.stock)
            }
        }
    }

    /// Remove one copy and record why. Returns the remaining stock.
    async fn retire(&mut self, isbn: &str, note: &str) -> AppResult<i32> {
        let mut book = self.get_book(isbn).await?;
        if book.stock <= 0 {
            return Err(AppError::AllCopiesRetired(isbn.to_string()));
        }

        book.stock -= 1;
        // The retired copy may be one that is out on loan
        book.available = (book.available - 1).max(0);
        book.remove_info = Some(match book.remove_info.take() {
            Some(previous) if !previous.is_empty() => format!("{}\n{}", note, previous),
            _ => note.to_string(),
        });

        self.store_book(&book).await?;
        Ok(book.stock)
    }

    async fn check_available(&mut self, isbn: &str) -> AppResult<Availability> {
        let book = self.get_book(isbn).await?;
        Ok(Availability {
            stock: book.stock,
            available: book.available,
        })
    }

    /// Take one copy off the shelf for a loan
    async fn take_copy(&mut self, isbn: &str) -> AppResult<Book> {
        let mut book = match self.find_book(isbn).await? {
            Some(book) if !book.is_retired() => book,
            _ => return Err(AppError::BookNotFound(isbn.to_string())),
        };
        if book.available <= 0 {
            return Err(AppError::NoCopyAvailable(isbn.to_string()));
        }

        book.available -= 1;
        self.store_book(&book).await?;
        Ok(book)
    }

    /// Put a returned copy back, never above stock
    async fn restore_copy(&mut self, isbn: &str) -> AppResult<Book> {
        let mut book = self.get_book(isbn).await?;
        book.available = (book.available + 1).min(book.stock);
        self.store_book(&book).await?;
        Ok(book)
    }
}

#[async_trait]
impl InventoryLedger for PgLedgerTx {
    async fn find_book(&mut self, isbn: &str) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>(&format!(
            "SELECT {} FROM booklist WHERE isbn = $1",
            BOOK_COLUMNS
        ))
        .bind(isbn)
        .fetch_optional(self.conn())
        .await?;

        Ok(book)
    }

    async fn insert_book(&mut self, book: &Book) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO booklist (title, isbn, author, publisher, stock, available, removeinfo)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&book.title)
        .bind(&book.isbn)
        .bind(&book.author)
        .bind(&book.publisher)
        .bind(book.stock)
        .bind(book.available)
        .bind(&book.remove_info)
        .execute(self.conn())
        .await?;

        Ok(())
    }

    async fn store_book(&mut self, book: &Book) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE booklist SET stock = $2, available = $3, removeinfo = $4 WHERE isbn = $1",
        )
        .bind(&book.isbn)
        .bind(book.stock)
        .bind(book.available)
        .bind(&book.remove_info)
        .execute(self.conn())
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::BookNotFound(book.isbn.clone()));
        }
        Ok(())
    }

    async fn search_books(&mut self, query: &BookQuery) -> AppResult<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>(&format!(
            r#"
            SELECT {} FROM booklist
            WHERE ($1::text IS NULL OR isbn = $1)
              AND ($2::text IS NULL OR title ILIKE $2 ESCAPE '\')
              AND ($3::text IS NULL OR author ILIKE $3 ESCAPE '\')
              AND ($4 OR stock > 0)
            ORDER BY LENGTH(title) ASC, title ASC
            "#,
            BOOK_COLUMNS
        ))
        .bind(&query.isbn)
        .bind(query.title.as_deref().map(contains_pattern))
        .bind(query.author.as_deref().map(contains_pattern))
        .bind(query.include_retired.unwrap_or(false))
        .fetch_all(self.conn())
        .await?;

        Ok(books)
    }
}
