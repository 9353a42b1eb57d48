//! Token claims, permissions and the actor capability passed to every operation

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Named capabilities a user can be granted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    /// Lending administration: renewals, returns, catalog edits
    #[serde(rename = "catalog.can_mark_returned")]
    CanMarkReturned,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::CanMarkReturned => "catalog.can_mark_returned",
        }
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "catalog.can_mark_returned" => Ok(Permission::CanMarkReturned),
            _ => Err(format!("Unknown permission: {}", s)),
        }
    }
}

/// The authenticated caller of an operation.
///
/// Built from verified token claims and handed explicitly to the services;
/// nothing reads the current user from ambient request state.
#[derive(Debug, Clone)]
pub struct Actor {
    pub user_id: Uuid,
    pub username: String,
    permissions: HashSet<Permission>,
}

impl Actor {
    pub fn new(
        user_id: Uuid,
        username: impl Into<String>,
        permissions: impl IntoIterator<Item = Permission>,
    ) -> Self {
        Self {
            user_id,
            username: username.into(),
            permissions: permissions.into_iter().collect(),
        }
    }

    /// A librarian: an actor holding `catalog.can_mark_returned`
    pub fn librarian(user_id: Uuid, username: impl Into<String>) -> Self {
        Self::new(user_id, username, [Permission::CanMarkReturned])
    }

    pub fn has_perm(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }

    pub fn require(&self, permission: Permission) -> Result<(), AppError> {
        if self.has_perm(permission) {
            Ok(())
        } else {
            Err(AppError::Authorization(format!("Permission {} required", permission)))
        }
    }
}

/// JWT Claims for authenticated users
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    pub user_id: Uuid,
    pub username: String,
    /// Permission names, e.g. `catalog.can_mark_returned`
    #[serde(default)]
    pub permissions: Vec<String>,
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

    /// Capability token for the services. Unknown permission names are ignored.
    pub fn actor(&self) -> Actor {
        let permissions = self
            .permissions
            .iter()
            .filter_map(|p| match p.parse::<Permission>() {
                Ok(permission) => Some(permission),
                Err(e) => {
                    tracing::debug!(user = %self.username, "Ignoring claim: {}", e);
                    None
                }
            });
        Actor::new(self.user_id, self.username.clone(), permissions)
    }
}
