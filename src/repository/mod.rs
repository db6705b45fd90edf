//! Repository layer: the three ledgers and the storage backends behind them

pub mod books;
pub mod loans;
pub mod memory;
pub mod postgres;
pub mod users;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::AppResult;

pub use books::InventoryLedger;
pub use loans::LoanRecordStore;
pub use memory::MemoryStorage;
pub use postgres::PostgresStorage;
pub use users::AccountLedger;

/// One unit of work spanning inventory, loan records and accounts.
///
/// Nothing is visible to other transactions until [`LedgerTx::commit`];
/// dropping the handle discards every change made through it.
#[async_trait]
pub trait LedgerTx: InventoryLedger + LoanRecordStore + AccountLedger + Send {
    async fn commit(self: Box<Self>) -> AppResult<()>;
}

/// A backend able to open ledger transactions
#[async_trait]
pub trait Storage: Send + Sync {
    async fn begin(&self) -> AppResult<Box<dyn LedgerTx>>;

    /// Cheap connectivity check for readiness probes
    async fn ping(&self) -> AppResult<()>;
}

/// Storage handle shared by all services
#[derive(Clone)]
pub struct Repository {
    storage: Arc<dyn Storage>,
}

impl Repository {
    pub fn new(storage: impl Storage + 'static) -> Self {
        Self {
            storage: Arc::new(storage),
        }
    }

    /// Open a transaction against the backing store
    pub async fn begin(&self) -> AppResult<Box<dyn LedgerTx>> {
        self.storage.begin().await
    }

    pub async fn ping(&self) -> AppResult<()> {
        self.storage.ping().await
    }
}
