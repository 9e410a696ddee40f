//! Users and the actors that act on the database.

use serde::{Deserialize, Serialize};

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(Self::Admin),
            "user" => Some(Self::User),
            _ => None,
        }
    }
}

/// A registered account. Credentials are handled by the external auth layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub role: Role,
    pub email_confirmed: bool,
    pub auth_id: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: Option<String>,
    pub role: Role,
    pub auth_id: Option<String>,
}

/// Whoever is performing an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    Visitor,
    Contributor { id: i64, username: String },
    Admin { id: i64, username: String },
}

impl Actor {
    pub fn from_user(user: &User) -> Self {
        match user.role {
            Role::Admin => Self::Admin {
                id: user.id,
                username: user.username.clone(),
            },
            Role::User => Self::Contributor {
                id: user.id,
                username: user.username.clone(),
            },
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin { .. })
    }

    pub fn user_id(&self) -> Option<i64> {
        match self {
            Self::Visitor => None,
            Self::Contributor { id, .. } | Self::Admin { id, .. } => Some(*id),
        }
    }

    pub fn username(&self) -> Option<&str> {
        match self {
            Self::Visitor => None,
            Self::Contributor { username, .. } | Self::Admin { username, .. } => Some(username),
        }
    }
}
