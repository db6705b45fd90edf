//! Account ledger: registered users and their overdue counters

use async_trait::async_trait;

use crate::{
    error::{AppError, AppResult},
    models::user::{Role, User, UserRow},
};

use super::postgres::PgLedgerTx;

#[async_trait]
pub trait AccountLedger: Send {
    async fn find_user(&mut self, user_id: &str) -> AppResult<Option<User>>;

    /// Insert a new account; a duplicate key fails with `UserExists`
    async fn insert_user(&mut self, user: &User) -> AppResult<()>;

    async fn set_credential(&mut self, user_id: &str, password: &str) -> AppResult<()>;

    async fn set_overdue(&mut self, user_id: &str, overdue: i32) -> AppResult<()>;

    async fn get_user(&mut self, user_id: &str) -> AppResult<User> {
        self.find_user(user_id)
            .await?
            .ok_or_else(|| AppError::UserNotFound(user_id.to_string()))
    }

    async fn register(&mut self, user: &User) -> AppResult<()> {
        if user.role == Role::Guest {
            return Err(AppError::Validation(
                "Guest accounts cannot be registered".to_string(),
            ));
        }
        if self.find_user(&user.id).await?.is_some() {
            return Err(AppError::UserExists(user.id.clone()));
        }
        self.insert_user(user).await
    }

    async fn reset_credential(&mut self, user_id: &str, password: &str) -> AppResult<()> {
        self.get_user(user_id).await?;
        self.set_credential(user_id, password).await
    }

    /// Lower the overdue counter by `count`, stopping at zero
    async fn release_overdue(&mut self, user_id: &str, count: i32) -> AppResult<i32> {
        let user = self.get_user(user_id).await?;
        let overdue = (user.overdue - count).max(0);
        self.set_overdue(user_id, overdue).await?;
        Ok(overdue)
    }
}

#[async_trait]
impl AccountLedger for PgLedgerTx {
    async fn find_user(&mut self, user_id: &str) -> AppResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, name, password, overdue, type FROM userlist WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(self.conn())
        .await?;

        row.map(User::try_from).transpose()
    }

    async fn insert_user(&mut self, user: &User) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO userlist (id, name, password, overdue, type) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.password)
        .bind(user.overdue)
        .bind(user.role.code())
        .execute(self.conn())
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                AppError::UserExists(user.id.clone())
            }
            other => other.into(),
        })?;

        Ok(())
    }

    async fn set_credential(&mut self, user_id: &str, password: &str) -> AppResult<()> {
        let result = sqlx::query("UPDATE userlist SET password = $2 WHERE id = $1")
            .bind(user_id)
            .bind(password)
            .execute(self.conn())
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::UserNotFound(user_id.to_string()));
        }
        Ok(())
    }

    async fn set_overdue(&mut self, user_id: &str, overdue: i32) -> AppResult<()> {
        let result = sqlx::query("UPDATE userlist SET overdue = $2 WHERE id = $1")
            .bind(user_id)
            .bind(overdue)
            .execute(self.conn())
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::UserNotFound(user_id.to_string()));
        }
        Ok(())
    }
}
