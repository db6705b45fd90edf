//! Business logic services

pub mod accounts;
pub mod catalog;
pub mod credentials;
pub mod lifecycle;

use std::sync::Arc;

use crate::repository::Repository;

use credentials::CredentialHasher;

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub accounts: accounts::AccountsService,
    pub lifecycle: lifecycle::LifecycleService,
    repository: Repository,
}

impl Services {
    /// Create all services over the given repository
    pub fn new(repository: Repository, hasher: Arc<dyn CredentialHasher>) -> Self {
        Self {
            catalog: catalog::CatalogService::new(repository.clone()),
            accounts: accounts::AccountsService::new(repository.clone(), hasher),
            lifecycle: lifecycle::LifecycleService::new(repository.clone()),
            repository,
        }
    }

    /// Whether the backing store answers
    pub async fn ping(&self) -> crate::error::AppResult<()> {
        self.repository.ping().await
    }
}
