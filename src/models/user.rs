//! User model and caller identity

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::AppError;

/// User record, mirrored from the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i32,
    pub email: String,
    pub is_staff: bool,
}

impl From<&UserClaims> for User {
    fn from(claims: &UserClaims) -> Self {
        User {
            id: claims.user_id,
            email: claims.email.clone(),
            is_staff: claims.is_staff,
        }
    }
}

/// JWT claims identifying the caller.
///
/// Tokens are issued by the identity provider; this service only verifies
/// them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    pub user_id: i32,
    pub email: String,
    #[serde(default)]
    pub is_staff: bool,
    pub exp: i64,
    pub iat: i64,
}

impl UserClaims {
    /// Sign these claims (HS256). Used by tooling and tests.
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse and verify a JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    /// Staff members see and manage every user's records
    pub fn is_privileged(&self) -> bool {
        self.is_staff
    }

    pub fn require_staff(&self) -> Result<(), AppError> {
        if self.is_privileged() {
            Ok(())
        } else {
            Err(AppError::Authorization(
                "You do not have permission to perform this action".to_string(),
            ))
        }
    }

    /// Whether the caller may see a record owned by `owner_id`
    pub fn can_access(&self, owner_id: i32) -> bool {
        self.is_privileged() || self.user_id == owner_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn claims(is_staff: bool) -> UserClaims {
        let now = Utc::now().timestamp();
        UserClaims {
            sub: "user@user.com".to_string(),
            user_id: 5,
            email: "user@user.com".to_string(),
            is_staff,
            exp: now + 3600,
            iat: now,
        }
    }

    #[test]
    fn test_token_round_trip() {
        let token = claims(true).create_token("secret").unwrap();
        let parsed = UserClaims::from_token(&token, "secret").unwrap();
        assert_eq!(parsed.user_id, 5);
        assert!(parsed.is_staff);
    }

    #[test]
    fn test_token_with_wrong_secret_rejected() {
        let token = claims(false).create_token("secret").unwrap();
        assert!(UserClaims::from_token(&token, "other").is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let mut c = claims(false);
        c.exp = Utc::now().timestamp() - 3600;
        let token = c.create_token("secret").unwrap();
        assert!(UserClaims::from_token(&token, "secret").is_err());
    }

    #[test]
    fn test_access_rules() {
        let regular = claims(false);
        assert!(regular.can_access(5));
        assert!(!regular.can_access(6));
        assert!(matches!(regular.require_staff(), Err(AppError::Authorization(_))));

        let staff = claims(true);
        assert!(staff.can_access(6));
        assert!(staff.require_staff().is_ok());
    }
}
