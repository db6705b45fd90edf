//! Loan lifecycle engine: borrow, return, extend and overdue reconciliation
//!
//! Every public operation runs in exactly one ledger transaction and commits
//! only on success. The `*_in` helpers hold the rules and work on an already
//! open transaction, so composite operations (reconcile then borrow,
//! reconcile then extend) are atomic as a whole.

use chrono::{DateTime, Utc};

use crate::{
    error::{AppError, AppResult},
    models::loan::{one_month_after, LoanRecord, OverdueReport, ReturnReceipt, SUSPENSION_THRESHOLD},
    repository::{AccountLedger, InventoryLedger, LedgerTx, LoanRecordStore, Repository},
};

#[derive(Clone)]
pub struct LifecycleService {
    repository: Repository,
}

impl LifecycleService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Lend one copy of `isbn` to `user_id`, due one month after `now`
    pub async fn borrow(&self, isbn: &str, user_id: &str, now: DateTime<Utc>) -> AppResult<LoanRecord> {
        let mut tx = self.repository.begin().await?;
        let record = borrow_in(tx.as_mut(), isbn, user_id, now).await?;
        tx.commit().await?;

        tracing::info!(isbn, user_id, record_id = record.id, deadline = %record.deadline, "Borrowed successfully");
        Ok(record)
    }

    /// Reconcile first, then refuse users over the suspension threshold
    pub async fn borrow_in_good_standing(
        &self,
        isbn: &str,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<LoanRecord> {
        let mut tx = self.repository.begin().await?;
        let report = reconcile_in(tx.as_mut(), user_id, now).await?;
        if report.overdue > SUSPENSION_THRESHOLD {
            tracing::warn!(user_id, overdue = report.overdue, "Account suspended, borrow refused");
            return Err(AppError::UserSuspended(report.overdue));
        }
        let record = borrow_in(tx.as_mut(), isbn, user_id, now).await?;
        tx.commit().await?;

        tracing::info!(isbn, user_id, record_id = record.id, deadline = %record.deadline, "Borrowed successfully");
        Ok(record)
    }

    /// Auto-extend late loans and recompute the user's overdue count
    pub async fn reconcile_overdue(&self, user_id: &str, now: DateTime<Utc>) -> AppResult<OverdueReport> {
        let mut tx = self.repository.begin().await?;
        let report = reconcile_in(tx.as_mut(), user_id, now).await?;
        tx.commit().await?;
        Ok(report)
    }

    /// Push the deadline of an active loan back one month
    pub async fn extend_deadline(&self, isbn: &str, user_id: &str) -> AppResult<LoanRecord> {
        let mut tx = self.repository.begin().await?;
        let record = extend_in(tx.as_mut(), isbn, user_id).await?;
        tx.commit().await?;

        tracing::info!(isbn, user_id, extensions = record.extensions, "Extended successfully");
        Ok(record)
    }

    /// Reconcile, then extend, so passive extensions are counted first
    pub async fn renew(&self, isbn: &str, user_id: &str, now: DateTime<Utc>) -> AppResult<LoanRecord> {
        let mut tx = self.repository.begin().await?;
        reconcile_in(tx.as_mut(), user_id, now).await?;
        let record = extend_in(tx.as_mut(), isbn, user_id).await?;
        tx.commit().await?;

        tracing::info!(isbn, user_id, extensions = record.extensions, "Extended successfully");
        Ok(record)
    }

    pub async fn return_book(&self, isbn: &str, user_id: &str, now: DateTime<Utc>) -> AppResult<ReturnReceipt> {
        let mut tx = self.repository.begin().await?;
        let receipt = return_in(tx.as_mut(), isbn, user_id, now).await?;
        tx.commit().await?;

        tracing::info!(isbn, user_id, was_overdue = receipt.was_overdue, "Returned successfully");
        Ok(receipt)
    }

    pub async fn check_deadline(&self, isbn: &str, user_id: &str) -> AppResult<DateTime<Utc>> {
        let mut tx = self.repository.begin().await?;
        deadline_in(tx.as_mut(), isbn, user_id).await
    }

    /// Reconcile, then read the deadline
    pub async fn deadline_at(&self, isbn: &str, user_id: &str, now: DateTime<Utc>) -> AppResult<DateTime<Utc>> {
        let mut tx = self.repository.begin().await?;
        reconcile_in(tx.as_mut(), user_id, now).await?;
        let deadline = deadline_in(tx.as_mut(), isbn, user_id).await?;
        tx.commit().await?;
        Ok(deadline)
    }

    /// Loans of a user, newest first, without touching overdue state
    pub async fn list_loans(&self, user_id: &str, active_only: bool) -> AppResult<Vec<LoanRecord>> {
        let mut tx = self.repository.begin().await?;
        tx.get_user(user_id).await?;
        tx.list_by_user(user_id, active_only).await
    }

    /// Reconcile, then list loans
    pub async fn history(&self, user_id: &str, now: DateTime<Utc>, active_only: bool) -> AppResult<Vec<LoanRecord>> {
        let mut tx = self.repository.begin().await?;
        reconcile_in(tx.as_mut(), user_id, now).await?;
        let records = tx.list_by_user(user_id, active_only).await?;
        tx.commit().await?;
        Ok(records)
    }
}

async fn borrow_in(tx: &mut dyn LedgerTx, isbn: &str, user_id: &str, now: DateTime<Utc>) -> AppResult<LoanRecord> {
    tx.get_user(user_id).await?;

    if tx.find_active(isbn, user_id).await?.is_some() {
        tracing::warn!(isbn, user_id, "The book is already borrowed");
        return Err(AppError::AlreadyBorrowed(isbn.to_string()));
    }

    if let Err(e) = tx.take_copy(isbn).await {
        tracing::warn!(isbn, user_id, "Borrow refused: {}", e);
        return Err(e);
    }

    let deadline = one_month_after(now)?;
    tx.create_loan(isbn, user_id, now, deadline).await
}

async fn reconcile_in(tx: &mut dyn LedgerTx, user_id: &str, now: DateTime<Utc>) -> AppResult<OverdueReport> {
    tx.get_user(user_id).await?;

    let mut overdue = Vec::new();
    for mut record in tx.list_by_user(user_id, true).await? {
        if record.auto_extend(now)? {
            tracing::debug!(
                record_id = record.id,
                extensions = record.extensions,
                deadline = %record.deadline,
                "Loan auto-extended"
            );
            tx.update_deadline(record.id, record.deadline, record.extensions).await?;
        }
        if record.is_overdue_at(now) {
            overdue.push(record);
        }
    }

    let count = i32::try_from(overdue.len())
        .map_err(|_| AppError::Internal(format!("Overdue count out of range for {}", user_id)))?;
    tx.set_overdue(user_id, count).await?;

    Ok(OverdueReport {
        user_id: user_id.to_string(),
        overdue: count,
        records: overdue,
    })
}

async fn extend_in(tx: &mut dyn LedgerTx, isbn: &str, user_id: &str) -> AppResult<LoanRecord> {
    tx.get_book(isbn).await?;
    let mut record = tx.require_active(isbn, user_id).await?;

    if let Err(e) = record.extend() {
        tracing::warn!(isbn, user_id, "{}", e);
        return Err(e);
    }
    tx.update_deadline(record.id, record.deadline, record.extensions).await?;
    Ok(record)
}

async fn return_in(
    tx: &mut dyn LedgerTx,
    isbn: &str,
    user_id: &str,
    now: DateTime<Utc>,
) -> AppResult<ReturnReceipt> {
    tx.get_book(isbn).await?;
    let mut record = tx.require_active(isbn, user_id).await?;

    let was_overdue = record.is_overdue_at(now);
    tx.mark_returned(record.id, now).await?;
    record.returned = true;
    record.return_date = Some(now);

    if was_overdue {
        tx.release_overdue(user_id, 1).await?;
    }
    tx.restore_copy(isbn).await?;

    Ok(ReturnReceipt { record, was_overdue })
}

async fn deadline_in(tx: &mut dyn LedgerTx, isbn: &str, user_id: &str) -> AppResult<DateTime<Utc>> {
    tx.get_book(isbn).await?;
    Ok(tx.require_active(isbn, user_id).await?.deadline)
}
