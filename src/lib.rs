//! Shelfkeeper Library Lending Server
//!
//! Tracks a lending library's inventory and per-user borrowing state: stock
//! and availability, loan records, due dates, extensions and overdue counts.
//! The loan lifecycle engine lives in [`services::lifecycle`]; storage sits
//! behind the ledger traits in [`repository`].

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
