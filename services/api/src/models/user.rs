//! User payloads seen by the api service

use chrono::{DateTime, Utc};
use common::models::Role;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User row without the password hash
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub approved: bool,
    pub created_at: DateTime<Utc>,
}

/// Admin edit of another user's profile
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateUserRequest {
    pub name: String,
    pub email: String,
    pub approved: bool,
}

/// Result of an admin user edit
#[derive(Debug)]
pub enum UserUpdate {
    Updated(UserSummary),
    NotFound,
    EmailTaken,
}
