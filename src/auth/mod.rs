//! Auth module
//!
//! Password hashing, session tokens and sign-in.

pub mod password;
pub mod token;

use serde::{Deserialize, Serialize};

use crate::domain::{DomainError, UserSummary};
use crate::error::AppResult;
use crate::store::{UserDirectory, UserFilter};

pub use token::{Claims, TokenService};

/// Returned for an unknown email and a wrong password alike.
pub const WRONG_CREDENTIALS: &str = "Wrong username or password";

/// The caller, as decoded from the bearer token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: i64,
    pub name: String,
    pub email: String,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.id,
            name: claims.name,
            email: claims.email,
        }
    }
}

/// Check credentials and issue a token.
pub async fn sign_in(
    directory: &UserDirectory,
    tokens: &TokenService,
    email: &str,
    plain_password: &str,
) -> AppResult<String> {
    let user = directory
        .find_one(&UserFilter::by_email(email))
        .await?
        .ok_or_else(|| DomainError::validation(WRONG_CREDENTIALS))?;

    let matches = password::verify_blocking(plain_password.to_string(), user.password.clone()).await?;
    if !matches {
        tracing::info!(user_id = user.id, "Rejected sign-in");
        return Err(DomainError::validation(WRONG_CREDENTIALS).into());
    }

    tokens.issue(&UserSummary::from(user))
}
