//! In-memory storage backend
//!
//! A transaction holds the store's only lock for its whole lifetime and works
//! on a private copy of the state, so transactions are fully serialized and a
//! dropped transaction leaves nothing behind. The same checks the SQL schema
//! declares are enforced on every write.

use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    error::{AppError, AppResult, StorageError},
    models::{
        book::{sort_by_title, Book, BookQuery},
        loan::{LoanRecord, EXTENSION_CAP},
        user::{Role, User},
    },
};

use super::{AccountLedger, InventoryLedger, LedgerTx, LoanRecordStore, Storage};

#[derive(Debug, Clone, Default)]
struct LibraryState {
    books: BTreeMap<String, Book>,
    users: BTreeMap<String, User>,
    records: BTreeMap<i32, LoanRecord>,
    last_record_id: i32,
}

fn constraint(message: impl Into<String>) -> AppError {
    AppError::Storage(StorageError::Constraint(message.into()))
}

impl LibraryState {
    fn check_book(book: &Book) -> AppResult<()> {
        if book.available < 0 || book.available > book.stock {
            return Err(constraint(format!(
                "booklist: stock >= available >= 0 violated for {} ({}/{})",
                book.isbn, book.available, book.stock
            )));
        }
        Ok(())
    }

    fn check_record(&self, record: &LoanRecord) -> AppResult<()> {
        if record.deadline < record.borrow_date {
            return Err(constraint("recordlist: deadline >= borrow_date violated"));
        }
        if !(0..=EXTENSION_CAP).contains(&record.extensions) {
            return Err(constraint("recordlist: extendtimes out of range"));
        }
        if !self.books.contains_key(&record.book_id) {
            return Err(constraint(format!("recordlist: unknown book {}", record.book_id)));
        }
        if !self.users.contains_key(&record.user_id) {
            return Err(constraint(format!("recordlist: unknown user {}", record.user_id)));
        }
        let duplicate = !record.returned
            && self.records.values().any(|other| {
                other.id != record.id
                    && !other.returned
                    && other.book_id == record.book_id
                    && other.user_id == record.user_id
            });
        if duplicate {
            return Err(constraint(format!(
                "recordlist: second active loan of {} for {}",
                record.book_id, record.user_id
            )));
        }
        Ok(())
    }

    fn put_record(&mut self, record: LoanRecord) -> AppResult<()> {
        self.check_record(&record)?;
        self.records.insert(record.id, record);
        Ok(())
    }

    fn record_mut(&mut self, record_id: i32) -> AppResult<&mut LoanRecord> {
        self.records
            .get_mut(&record_id)
            .ok_or_else(|| constraint(format!("no loan record with id {}", record_id)))
    }
}

/// Process-local storage, used for tests and throwaway deployments
#[derive(Clone, Default)]
pub struct MemoryStorage {
    state: Arc<Mutex<LibraryState>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn begin(&self) -> AppResult<Box<dyn LedgerTx>> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryLedgerTx { guard, working }))
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}

pub struct MemoryLedgerTx {
    guard: OwnedMutexGuard<LibraryState>,
    working: LibraryState,
}

#[async_trait]
impl LedgerTx for MemoryLedgerTx {
    async fn commit(self: Box<Self>) -> AppResult<()> {
        let MemoryLedgerTx { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}

#[async_trait]
impl InventoryLedger for MemoryLedgerTx {
    async fn find_book(&mut self, isbn: &str) -> AppResult<Option<Book>> {
        Ok(self.working.books.get(isbn).cloned())
    }

    async fn insert_book(&mut self, book: &Book) -> AppResult<()> {
        if self.working.books.contains_key(&book.isbn) {
            return Err(constraint(format!("booklist: duplicate isbn {}", book.isbn)));
        }
        LibraryState::check_book(book)?;
        self.working.books.insert(book.isbn.clone(), book.clone());
        Ok(())
    }

    async fn store_book(&mut self, book: &Book) -> AppResult<()> {
        LibraryState::check_book(book)?;
        let stored = self
            .working
            .books
            .get_mut(&book.isbn)
            .ok_or_else(|| AppError::BookNotFound(book.isbn.clone()))?;
        stored.stock = book.stock;
        stored.available = book.available;
        stored.remove_info = book.remove_info.clone();
        Ok(())
    }

    async fn search_books(&mut self, query: &BookQuery) -> AppResult<Vec<Book>> {
        let mut books: Vec<Book> = self
            .working
            .books
            .values()
            .filter(|book| query.matches(book))
            .cloned()
            .collect();
        sort_by_title(&mut books);
        Ok(books)
    }
}

#[async_trait]
impl LoanRecordStore for MemoryLedgerTx {
    async fn find_active(&mut self, isbn: &str, user_id: &str) -> AppResult<Option<LoanRecord>> {
        Ok(self
            .working
            .records
            .values()
            .find(|r| !r.returned && r.book_id == isbn && r.user_id == user_id)
            .cloned())
    }

    async fn create_loan(
        &mut self,
        isbn: &str,
        user_id: &str,
        borrow_date: DateTime<Utc>,
        deadline: DateTime<Utc>,
    ) -> AppResult<LoanRecord> {
        let record = LoanRecord {
            id: self.working.last_record_id + 1,
            book_id: isbn.to_string(),
            user_id: user_id.to_string(),
            returned: false,
            borrow_date,
            return_date: None,
            deadline,
            extensions: 0,
        };
        self.working.put_record(record.clone())?;
        self.working.last_record_id = record.id;
        Ok(record)
    }

    async fn update_deadline(
        &mut self,
        record_id: i32,
        deadline: DateTime<Utc>,
        extensions: i32,
    ) -> AppResult<()> {
        let mut record = self.working.record_mut(record_id)?.clone();
        record.deadline = deadline;
        record.extensions = extensions;
        self.working.put_record(record)
    }

    async fn mark_returned(&mut self, record_id: i32, return_date: DateTime<Utc>) -> AppResult<()> {
        let record = self.working.record_mut(record_id)?;
        record.returned = true;
        record.return_date = Some(return_date);
        Ok(())
    }

    async fn list_by_user(&mut self, user_id: &str, active_only: bool) -> AppResult<Vec<LoanRecord>> {
        let mut records: Vec<LoanRecord> = self
            .working
            .records
            .values()
            .filter(|r| r.user_id == user_id && (!active_only || !r.returned))
            .cloned()
            .collect();
        records.sort_by(|a, b| {
            b.borrow_date
                .cmp(&a.borrow_date)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(records)
    }
}

#[async_trait]
impl AccountLedger for MemoryLedgerTx {
    async fn find_user(&mut self, user_id: &str) -> AppResult<Option<User>> {
        Ok(self.working.users.get(user_id).cloned())
    }

    async fn insert_user(&mut self, user: &User) -> AppResult<()> {
        if self.working.users.contains_key(&user.id) {
            return Err(AppError::UserExists(user.id.clone()));
        }
        if user.role == Role::Guest {
            return Err(constraint("userlist: guest accounts are not stored"));
        }
        if user.overdue < 0 {
            return Err(constraint("userlist: overdue >= 0 violated"));
        }
        self.working.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn set_credential(&mut self, user_id: &str, password: &str) -> AppResult<()> {
        let user = self
            .working
            .users
            .get_mut(user_id)
            .ok_or_else(|| AppError::UserNotFound(user_id.to_string()))?;
        user.password = password.to_string();
        Ok(())
    }

    async fn set_overdue(&mut self, user_id: &str, overdue: i32) -> AppResult<()> {
        if overdue < 0 {
            return Err(constraint("userlist: overdue >= 0 violated"));
        }
        let user = self
            .working
            .users
            .get_mut(user_id)
            .ok_or_else(|| AppError::UserNotFound(user_id.to_string()))?;
        user.overdue = overdue;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::book::NewBook;
    use chrono::TimeZone;

    fn dune(quantity: i32) -> NewBook {
        NewBook {
            isbn: "9780441013593".to_string(),
            title: "Dune".to_string(),
            author: "Frank Herbert".to_string(),
            publisher: "Ace".to_string(),
            quantity,
        }
    }

    #[tokio::test]
    async fn test_commit_publishes_changes() {
        let storage = MemoryStorage::new();

        let mut tx = storage.begin().await.unwrap();
        tx.acquire(&dune(2)).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = storage.begin().await.unwrap();
        let availability = tx.check_available("9780441013593").await.unwrap();
        assert_eq!((availability.stock, availability.available), (2, 2));
    }

    #[tokio::test]
    async fn test_dropped_transaction_rolls_back() {
        let storage = MemoryStorage::new();

        {
            let mut tx = storage.begin().await.unwrap();
            tx.acquire(&dune(2)).await.unwrap();
        }

        let mut tx = storage.begin().await.unwrap();
        assert!(tx.find_book("9780441013593").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_write_leaves_committed_state_alone() {
        let storage = MemoryStorage::new();
        let mut tx = storage.begin().await.unwrap();
        tx.acquire(&dune(1)).await.unwrap();
        tx.commit().await.unwrap();

        // Copy taken, then the loan insert fails on the unknown user
        let mut tx = storage.begin().await.unwrap();
        tx.take_copy("9780441013593").await.unwrap();
        let now = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        let err = tx
            .create_loan("9780441013593", "ghost", now, now)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Storage(_)));
        drop(tx);

        let mut tx = storage.begin().await.unwrap();
        let availability = tx.check_available("9780441013593").await.unwrap();
        assert_eq!(availability.available, 1);
    }

    #[tokio::test]
    async fn test_available_cannot_exceed_stock() {
        let storage = MemoryStorage::new();
        let mut tx = storage.begin().await.unwrap();
        tx.acquire(&dune(1)).await.unwrap();

        let mut book = tx.get_book("9780441013593").await.unwrap();
        book.available = 2;
        assert!(tx.store_book(&book).await.is_err());
    }
}
