//! User model and related types

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::error::AppError;

/// Role tag; guests browse the catalog but are never persisted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Administrator,
    #[default]
    Standard,
    Guest,
}

impl Role {
    /// Legacy numeric tag stored in the `type` column
    pub fn code(self) -> i32 {
        match self {
            Role::Administrator => 0,
            Role::Standard => 1,
            Role::Guest => 2,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Role::Administrator),
            1 => Some(Role::Standard),
            2 => Some(Role::Guest),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Role::Administrator => "administrator",
            Role::Standard => "standard",
            Role::Guest => "guest",
        };
        write!(f, "{}", name)
    }
}

/// Registered account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct User {
    pub id: String,
    pub name: String,
    /// Opaque credential (argon2 PHC string)
    #[serde(skip_serializing)]
    pub password: String,
    /// Loans past their final deadline, as of the last reconciliation
    pub overdue: i32,
    pub role: Role,
}

/// Raw `userlist` row
#[derive(Debug, FromRow)]
pub struct UserRow {
    pub id: String,
    pub name: String,
    pub password: String,
    pub overdue: i32,
    #[sqlx(rename = "type")]
    pub kind: i32,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = Role::from_code(row.kind)
            .ok_or_else(|| AppError::Internal(format!("Unknown role tag {} for {}", row.kind, row.id)))?;
        Ok(User {
            id: row.id,
            name: row.name,
            password: row.password,
            overdue: row.overdue,
            role,
        })
    }
}

/// Registration request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct NewUser {
    #[validate(length(min = 1, max = 16, message = "Username must be 1-16 characters"))]
    pub id: String,
    #[validate(length(min = 1, max = 256, message = "Name must be 1-256 characters"))]
    pub name: String,
    #[validate(length(min = 4, message = "Password must be at least 4 characters"))]
    pub password: String,
    #[serde(default)]
    pub role: Role,
}

/// Registration over HTTP. Creating an administrator needs the credentials
/// of an existing administrator in `registrar`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    #[serde(flatten)]
    pub account: NewUser,
    pub registrar: Option<LoginRequest>,
}

/// Credential reset request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ResetCredential {
    #[validate(length(min = 4, message = "Password must be at least 4 characters"))]
    pub password: String,
}

/// Login request
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub id: String,
    pub password: String,
}
