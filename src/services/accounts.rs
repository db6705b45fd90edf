//! Account registration and credential service

use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::user::{LoginRequest, NewUser, Role, User},
    repository::{AccountLedger, Repository},
};

use super::credentials::CredentialHasher;

const BAD_CREDENTIALS: &str = "Username and password don't match";
const ADMIN_ONLY: &str = "Only an administrator can create administrator accounts";

#[derive(Clone)]
pub struct AccountsService {
    repository: Repository,
    hasher: Arc<dyn CredentialHasher>,
}

impl AccountsService {
    pub fn new(repository: Repository, hasher: Arc<dyn CredentialHasher>) -> Self {
        Self { repository, hasher }
    }

    /// Register a new account; the key must be unused
    pub async fn register(&self, new_user: &NewUser) -> AppResult<User> {
        let user = User {
            id: new_user.id.clone(),
            name: new_user.name.clone(),
            password: self.hasher.hash(&new_user.password)?,
            overdue: 0,
            role: new_user.role,
        };

        let mut tx = self.repository.begin().await?;
        if let Err(e) = tx.register(&user).await {
            tracing::warn!(user_id = %user.id, "Registration rejected: {}", e);
            return Err(e);
        }
        tx.commit().await?;

        tracing::info!(user_id = %user.id, role = %user.role, "Registered successfully");
        Ok(user)
    }

    /// Register on behalf of a caller. Administrator accounts are only
    /// created when `registrar` authenticates as an administrator.
    pub async fn register_by(
        &self,
        registrar: Option<&LoginRequest>,
        new_user: &NewUser,
    ) -> AppResult<User> {
        if new_user.role == Role::Administrator {
            let registrar = registrar.ok_or_else(|| AppError::Forbidden(ADMIN_ONLY.to_string()))?;
            let caller = self.authenticate(&registrar.id, &registrar.password).await?;
            if caller.role != Role::Administrator {
                tracing::warn!(user_id = %new_user.id, registrar = %caller.id, "{}", ADMIN_ONLY);
                return Err(AppError::Forbidden(ADMIN_ONLY.to_string()));
            }
        }
        self.register(new_user).await
    }

    /// Check a key/secret pair. Unknown keys and wrong secrets fail alike.
    pub async fn authenticate(&self, user_id: &str, password: &str) -> AppResult<User> {
        let mut tx = self.repository.begin().await?;
        let user = tx
            .find_user(user_id)
            .await?
            .ok_or_else(|| AppError::Authentication(BAD_CREDENTIALS.to_string()))?;

        if !self.hasher.verify(password, &user.password)? {
            tracing::warn!(user_id, "Login failed");
            return Err(AppError::Authentication(BAD_CREDENTIALS.to_string()));
        }

        tracing::info!(user_id, "Login successfully");
        Ok(user)
    }

    pub async fn reset_credential(&self, user_id: &str, password: &str) -> AppResult<()> {
        let hashed = self.hasher.hash(password)?;

        let mut tx = self.repository.begin().await?;
        tx.reset_credential(user_id, &hashed).await?;
        tx.commit().await?;

        tracing::info!(user_id, "Password changed");
        Ok(())
    }

    pub async fn get_user(&self, user_id: &str) -> AppResult<User> {
        let mut tx = self.repository.begin().await?;
        tx.get_user(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        repository::MemoryStorage,
        services::credentials::MockCredentialHasher,
    };

    fn new_user(id: &str, role: Role) -> NewUser {
        NewUser {
            id: id.to_string(),
            name: "Alicia".to_string(),
            password: "578152".to_string(),
            role,
        }
    }

    fn service(hasher: MockCredentialHasher) -> AccountsService {
        AccountsService::new(Repository::new(MemoryStorage::new()), Arc::new(hasher))
    }

    #[tokio::test]
    async fn test_register_stores_hashed_secret() {
        let mut hasher = MockCredentialHasher::new();
        hasher
            .expect_hash()
            .times(1)
            .returning(|secret| Ok(format!("hashed:{}", secret)));
        let accounts = service(hasher);

        let user = accounts.register(&new_user("alicia", Role::Standard)).await.unwrap();
        assert_eq!(user.password, "hashed:578152");
        assert_eq!(accounts.get_user("alicia").await.unwrap().password, "hashed:578152");
    }

    #[tokio::test]
    async fn test_duplicate_registration_is_rejected() {
        let mut hasher = MockCredentialHasher::new();
        hasher.expect_hash().returning(|s| Ok(format!("hashed:{}", s)));
        let accounts = service(hasher);

        accounts.register(&new_user("alicia", Role::Standard)).await.unwrap();
        let err = accounts
            .register(&new_user("alicia", Role::Administrator))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UserExists(_)));
    }

    #[tokio::test]
    async fn test_guest_is_never_persisted() {
        let mut hasher = MockCredentialHasher::new();
        hasher.expect_hash().returning(|s| Ok(format!("hashed:{}", s)));
        let accounts = service(hasher);

        let err = accounts.register(&new_user("visitor", Role::Guest)).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(matches!(
            accounts.get_user("visitor").await,
            Err(AppError::UserNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_authenticate_uses_verifier() {
        let mut hasher = MockCredentialHasher::new();
        hasher.expect_hash().returning(|s| Ok(format!("hashed:{}", s)));
        hasher
            .expect_verify()
            .returning(|secret, stored| Ok(stored == format!("hashed:{}", secret)));
        let accounts = service(hasher);
        accounts.register(&new_user("alicia", Role::Standard)).await.unwrap();

        assert_eq!(accounts.authenticate("alicia", "578152").await.unwrap().id, "alicia");
        assert!(matches!(
            accounts.authenticate("alicia", "123456").await,
            Err(AppError::Authentication(_))
        ));
        assert!(matches!(
            accounts.authenticate("nobody", "578152").await,
            Err(AppError::Authentication(_))
        ));
    }

    #[tokio::test]
    async fn test_reset_credential() {
        let mut hasher = MockCredentialHasher::new();
        hasher.expect_hash().returning(|s| Ok(format!("hashed:{}", s)));
        let accounts = service(hasher);
        accounts.register(&new_user("brandon", Role::Standard)).await.unwrap();

        accounts.reset_credential("brandon", "asdfa").await.unwrap();
        assert_eq!(accounts.get_user("brandon").await.unwrap().password, "hashed:asdfa");

        assert!(matches!(
            accounts.reset_credential("nobody", "asdfa").await,
            Err(AppError::UserNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_only_administrators_create_administrators() {
        let mut hasher = MockCredentialHasher::new();
        hasher.expect_hash().returning(|s| Ok(format!("hashed:{}", s)));
        hasher
            .expect_verify()
            .returning(|secret, stored| Ok(stored == format!("hashed:{}", secret)));
        let accounts = service(hasher);
        accounts.register(&new_user("root", Role::Administrator)).await.unwrap();
        accounts.register(&new_user("alicia", Role::Standard)).await.unwrap();

        let as_root = LoginRequest {
            id: "root".to_string(),
            password: "578152".to_string(),
        };
        let as_alicia = LoginRequest {
            id: "alicia".to_string(),
            password: "578152".to_string(),
        };

        assert!(matches!(
            accounts.register_by(None, &new_user("mallory", Role::Administrator)).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            accounts
                .register_by(Some(&as_alicia), &new_user("mallory", Role::Administrator))
                .await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            accounts.get_user("mallory").await,
            Err(AppError::UserNotFound(_))
        ));

        let admin = accounts
            .register_by(Some(&as_root), &new_user("brandon", Role::Administrator))
            .await
            .unwrap();
        assert_eq!(admin.role, Role::Administrator);

        let standard = accounts
            .register_by(None, &new_user("carol", Role::Standard))
            .await
            .unwrap();
        assert_eq!(standard.role, Role::Standard);
    }
}
