//! Loan record model and deadline arithmetic

use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::error::{AppError, AppResult};

/// A loan may be pushed back at most this many times
pub const EXTENSION_CAP: i32 = 3;

/// Users with more overdue loans than this may not borrow
pub const SUSPENSION_THRESHOLD: i32 = 3;

/// Same day next month, clamped to the last day when the next month is
/// shorter (Jan 31 -> Feb 28/29). Time of day is kept; computed in UTC.
pub fn one_month_after(date: DateTime<Utc>) -> AppResult<DateTime<Utc>> {
    date.checked_add_months(Months::new(1))
        .ok_or_else(|| AppError::Internal(format!("Deadline out of range after {}", date)))
}

/// Borrowing record, active until `returned` is set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct LoanRecord {
    #[sqlx(rename = "record_id")]
    pub id: i32,
    pub book_id: String,
    pub user_id: String,
    #[sqlx(rename = "isreturned")]
    pub returned: bool,
    pub borrow_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub deadline: DateTime<Utc>,
    #[sqlx(rename = "extendtimes")]
    pub extensions: i32,
}

impl LoanRecord {
    pub fn is_overdue_at(&self, now: DateTime<Utc>) -> bool {
        now > self.deadline
    }

    /// Push the deadline back one month on explicit request
    pub fn extend(&mut self) -> AppResult<()> {
        if self.extensions >= EXTENSION_CAP {
            return Err(AppError::NoMoreExtensions);
        }
        self.deadline = one_month_after(self.deadline)?;
        self.extensions += 1;
        Ok(())
    }

    /// Consume remaining extensions until the deadline is no longer behind
    /// `now`. Returns whether anything changed.
    pub fn auto_extend(&mut self, now: DateTime<Utc>) -> AppResult<bool> {
        let mut changed = false;
        while self.extensions < EXTENSION_CAP && self.is_overdue_at(now) {
            self.deadline = one_month_after(self.deadline)?;
            self.extensions += 1;
            changed = true;
        }
        Ok(changed)
    }
}

/// Outcome of a return
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReturnReceipt {
    pub record: LoanRecord,
    pub was_overdue: bool,
}

/// Outcome of an overdue reconciliation
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OverdueReport {
    pub user_id: String,
    pub overdue: i32,
    /// Loans still past their deadline after auto-extension
    pub records: Vec<LoanRecord>,
}

/// Borrow / return / extend request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LoanRequest {
    #[validate(length(min = 1, max = 16, message = "ISBN must be 1-16 characters"))]
    pub isbn: String,
    #[validate(length(min = 1, max = 16, message = "Username must be 1-16 characters"))]
    pub user_id: String,
}

/// History listing filters
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HistoryQuery {
    /// Only list loans that are not yet returned
    pub active_only: Option<bool>,
}
