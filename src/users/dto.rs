use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::users::store::{User, STATUS_ACTIVE, STATUS_INACTIVE};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Public part of a user returned to clients. Scopes and the password hash
/// stay server-side.
#[derive(Debug, Serialize)]
pub struct UserData {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub status: String,
    pub data: Option<serde_json::Value>,
}

impl From<User> for UserData {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            status: user.status,
            data: user.data,
        }
    }
}

/// Partial update for the current user; only fields present in the body are
/// applied.
#[derive(Debug, Clone, Deserialize)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub status: Option<String>,
    pub data: Option<serde_json::Value>,
}

impl UserUpdate {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(name) = &self.name {
            if name.is_empty() {
                return Err("name must not be empty".to_string());
            }
        }
        if let Some(email) = &self.email {
            if !is_valid_email(email) {
                return Err("invalid email".to_string());
            }
        }
        if let Some(status) = &self.status {
            if status != STATUS_ACTIVE && status != STATUS_INACTIVE {
                return Err(format!(
                    "status must be {STATUS_ACTIVE} or {STATUS_INACTIVE}"
                ));
            }
        }
        Ok(())
    }

    pub fn apply_to(&self, user: &mut User) {
        if let Some(name) = &self.name {
            user.name = Some(name.clone());
        }
        if let Some(email) = &self.email {
            user.email = Some(email.clone());
        }
        if let Some(status) = &self.status {
            user.status = status.clone();
        }
        if let Some(data) = &self.data {
            user.data = Some(data.clone());
        }
    }
}
