//! User model and related functionality

use chrono::{DateTime, Utc};
use common::{jwt::TokenSubject, models::Role};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User entity
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub approved: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn token_subject(&self) -> TokenSubject {
        TokenSubject {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
            approved: self.approved,
        }
    }
}

/// New user creation payload; the password is hashed by the repository
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Identity returned to the client after login or from the session endpoint
#[derive(Debug, Clone, Serialize)]
pub struct SessionUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub approved: bool,
}

impl From<&User> for SessionUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            approved: user.approved,
        }
    }
}
