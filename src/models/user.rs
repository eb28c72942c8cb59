//! User model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::error::AppError;

/// Account lifecycle status.
///
/// Stored as TEXT in the users table; rows are decoded as plain strings and
/// parsed lazily so that an unrecognized stored value degrades to "no legal
/// transitions" instead of failing the whole query (see [`crate::policy`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum UserStatus {
    PendingVerification,
    Active,
    Suspended,
    Banned,
    Rejected,
    Inactive,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::PendingVerification => "PendingVerification",
            UserStatus::Active => "Active",
            UserStatus::Suspended => "Suspended",
            UserStatus::Banned => "Banned",
            UserStatus::Rejected => "Rejected",
            UserStatus::Inactive => "Inactive",
        }
    }
}

impl std::fmt::Display for UserStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for UserStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PendingVerification" => Ok(UserStatus::PendingVerification),
            "Active" => Ok(UserStatus::Active),
            "Suspended" => Ok(UserStatus::Suspended),
            "Banned" => Ok(UserStatus::Banned),
            "Rejected" => Ok(UserStatus::Rejected),
            "Inactive" => Ok(UserStatus::Inactive),
            _ => Err(format!("Invalid user status: {}", s)),
        }
    }
}

/// User role for authorization checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum UserRole {
    Member,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Member => "Member",
            UserRole::Admin => "Admin",
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Member" => Ok(UserRole::Member),
            "Admin" => Ok(UserRole::Admin),
            _ => Err(format!("Invalid user role: {}", s)),
        }
    }
}

/// User model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub full_name: Option<String>,
    pub student_id_number: Option<String>,
    pub role: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Parsed account status; `None` when the stored value is unrecognized.
    pub fn parsed_status(&self) -> Option<UserStatus> {
        self.status.parse().ok()
    }

    pub fn parsed_role(&self) -> UserRole {
        self.role.parse().unwrap_or(UserRole::Member)
    }
}

/// Registration request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterUser {
    #[validate(email(message = "A valid email address is required"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[validate(length(min = 1, message = "Full name is required"))]
    pub full_name: String,
    pub student_id_number: Option<String>,
}

/// User search query (admin listing)
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct UserQuery {
    /// Matches against full name, email or student id number
    pub search: Option<String>,
    /// Status filter; defaults to PendingVerification when absent
    pub status: Option<String>,
}

/// Status change request
#[derive(Debug, Deserialize, ToSchema)]
pub struct ChangeStatus {
    pub status: UserStatus,
}

/// JWT claims carried by authenticated requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    pub user_id: Uuid,
    pub role: UserRole,
    pub exp: i64,
    pub iat: i64,
}

impl UserClaims {
    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Authorization(
                "Administrator rights required".to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for s in [
            UserStatus::PendingVerification,
            UserStatus::Active,
            UserStatus::Suspended,
            UserStatus::Banned,
            UserStatus::Rejected,
            UserStatus::Inactive,
        ] {
            assert_eq!(s.as_str().parse::<UserStatus>(), Ok(s));
        }
    }

    #[test]
    fn test_unknown_status_does_not_parse() {
        assert!("Deleted".parse::<UserStatus>().is_err());
        assert!("active".parse::<UserStatus>().is_err());
        assert!("".parse::<UserStatus>().is_err());
    }
}
