//! Caller identity handed to every core operation

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::enums::Role;
use crate::error::AppError;

/// Already-authenticated caller: who they are, which unit they belong to,
/// and what role they hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Identity {
    pub user_id: String,
    pub user_name: String,
    pub unit: String,
    pub role: Role,
}

impl Identity {
    pub fn new(
        user_id: impl Into<String>,
        user_name: impl Into<String>,
        unit: impl Into<String>,
        role: Role,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            user_name: user_name.into(),
            unit: unit.into(),
            role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden("Administrator role required".to_string()))
        }
    }

    /// Membership check against the unit owning a record
    pub fn require_unit(&self, unit: &str) -> Result<(), AppError> {
        if self.unit == unit {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "User {} is not a member of unit {}",
                self.user_id, unit
            )))
        }
    }
}

/// JWT claims carrying the identity context.
///
/// Tokens are minted by the authentication collaborator; the server only
/// verifies them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityClaims {
    pub sub: String,
    pub name: String,
    pub unit: String,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

impl IdentityClaims {
    pub fn new(identity: &Identity, ttl_hours: i64) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub: identity.user_id.clone(),
            name: identity.user_name.clone(),
            unit: identity.unit.clone(),
            role: identity.role,
            exp: now + ttl_hours * 3600,
            iat: now,
        }
    }

    /// Create a signed JWT token
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
}

impl From<IdentityClaims> for Identity {
    fn from(claims: IdentityClaims) -> Self {
        Self {
            user_id: claims.sub,
            user_name: claims.name,
            unit: claims.unit,
            role: claims.role,
        }
    }
}
