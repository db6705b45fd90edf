//! Data models for Shelfkeeper

pub mod book;
pub mod loan;
pub mod user;

// Re-export commonly used types
pub use book::{Availability, Book, BookQuery, NewBook};
pub use loan::{LoanRecord, OverdueReport, ReturnReceipt};
pub use user::{NewUser, Role, User};
