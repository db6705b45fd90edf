//! Loan record store

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    error::{AppError, AppResult, StorageError},
    models::loan::LoanRecord,
};

use super::postgres::PgLedgerTx;

const RECORD_COLUMNS: &str =
    "record_id, book_id, user_id, isreturned, borrow_date, return_date, deadline, extendtimes";

#[async_trait]
pub trait LoanRecordStore: Send {
    /// The unreturned record for a (book, user) pair, if any
    async fn find_active(&mut self, isbn: &str, user_id: &str) -> AppResult<Option<LoanRecord>>;

    /// Insert a fresh record with no extensions
    async fn create_loan(
        &mut self,
        isbn: &str,
        user_id: &str,
        borrow_date: DateTime<Utc>,
        deadline: DateTime<Utc>,
    ) -> AppResult<LoanRecord>;

    async fn update_deadline(
        &mut self,
        record_id: i32,
        deadline: DateTime<Utc>,
        extensions: i32,
    ) -> AppResult<()>;

    async fn mark_returned(&mut self, record_id: i32, return_date: DateTime<Utc>) -> AppResult<()>;

    /// Newest borrow first
    async fn list_by_user(&mut self, user_id: &str, active_only: bool) -> AppResult<Vec<LoanRecord>>;

    async fn require_active(&mut self, isbn: &str, user_id: &str) -> AppResult<LoanRecord> {
        self.find_active(isbn, user_id)
            .await?
            .ok_or_else(|| AppError::NotBorrowed(isbn.to_string()))
    }
}

fn missing_record(record_id: i32) -> AppError {
    AppError::Storage(StorageError::Constraint(format!(
        "no loan record with id {}",
        record_id
    )))
}

#[async_trait]
impl LoanRecordStore for PgLedgerTx {
    async fn find_active(&mut self, isbn: &str, user_id: &str) -> AppResult<Option<LoanRecord>> {
        let record = sqlx::query_as::<_, LoanRecord>(&format!(
            "SELECT {} FROM recordlist WHERE book_id = $1 AND user_id = $2 AND NOT isreturned",
            RECORD_COLUMNS
        ))
        .bind(isbn)
        .bind(user_id)
        .fetch_optional(self.conn())
        .await?;

        Ok(record)
    }

    async fn create_loan(
        &mut self,
        isbn: &str,
        user_id: &str,
        borrow_date: DateTime<Utc>,
        deadline: DateTime<Utc>,
    ) -> AppResult<LoanRecord> {
        let record = sqlx::query_as::<_, LoanRecord>(&format!(
            r#"
            INSERT INTO recordlist (book_id, user_id, isreturned, borrow_date, deadline, extendtimes)
            VALUES ($1, $2, FALSE, $3, $4, 0)
            RETURNING {}
            "#,
            RECORD_COLUMNS
        ))
        .bind(isbn)
        .bind(user_id)
        .bind(borrow_date)
        .bind(deadline)
        .fetch_one(self.conn())
        .await?;

        Ok(record)
    }

    async fn update_deadline(
        &mut self,
        record_id: i32,
        deadline: DateTime<Utc>,
        extensions: i32,
    ) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE recordlist SET deadline = $2, extendtimes = $3 WHERE record_id = $1",
        )
        .bind(record_id)
        .bind(deadline)
        .bind(extensions)
        .execute(self.conn())
        .await?;

        if result.rows_affected() == 0 {
            return Err(missing_record(record_id));
        }
        Ok(())
    }

    async fn mark_returned(&mut self, record_id: i32, return_date: DateTime<Utc>) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE recordlist SET isreturned = TRUE, return_date = $2 WHERE record_id = $1",
        )
        .bind(record_id)
        .bind(return_date)
        .execute(self.conn())
        .await?;

        if result.rows_affected() == 0 {
            return Err(missing_record(record_id));
        }
        Ok(())
    }

    async fn list_by_user(&mut self, user_id: &str, active_only: bool) -> AppResult<Vec<LoanRecord>> {
        let records = sqlx::query_as::<_, LoanRecord>(&format!(
            r#"
            SELECT {} FROM recordlist
            WHERE user_id = $1 AND (NOT $2 OR NOT isreturned)
            ORDER BY borrow_date DESC, record_id DESC
            "#,
            RECORD_COLUMNS
        ))
        .bind(user_id)
        .bind(active_only)
        .fetch_all(self.conn())
        .await?;

        Ok(records)
    }
}
