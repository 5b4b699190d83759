use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{User, UserDraft, UserRole, UserStatus};
use crate::error::ApiError;

pub const NAME_MIN_CHARS: usize = 2;
pub const NAME_MAX_CHARS: usize = 100;

lazy_static! {
    static ref EMAIL_RE: Regex =
        Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").unwrap();
    static ref PHONE_RE: Regex = Regex::new(r"^\+[1-9]\d{7,14}$").unwrap();
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub(crate) fn is_valid_phone(phone: &str) -> bool {
    PHONE_RE.is_match(phone)
}

/// Request body for create and full update. Unknown fields such as `role` or
/// `status` are ignored.
#[derive(Debug, Deserialize)]
pub struct UserRequest {
    pub name: String,
    pub email: String,
    pub phone_number: String,
}

impl UserRequest {
    /// Trims and validates every field, reporting all problems at once.
    pub fn into_draft(self) -> Result<UserDraft, ApiError> {
        let name = self.name.trim().to_string();
        let email = self.email.trim().to_string();
        let phone_number = self.phone_number.trim().to_string();

        let mut errors = Vec::new();
        let name_len = name.chars().count();
        if name.is_empty() {
            errors.push("name: Name is required.".to_string());
        } else if !(NAME_MIN_CHARS..=NAME_MAX_CHARS).contains(&name_len) {
            errors.push(format!(
                "name: Name must consist of at least {NAME_MIN_CHARS} and at most {NAME_MAX_CHARS} characters."
            ));
        }
        if email.is_empty() {
            errors.push("email: Email is required.".to_string());
        } else if !is_valid_email(&email) {
            errors.push("email: Invalid email address.".to_string());
        }
        if phone_number.is_empty() {
            errors.push("phone_number: Phone number is required.".to_string());
        } else if !is_valid_phone(&phone_number) {
            errors.push("phone_number: Invalid phone number format.".to_string());
        }

        if !errors.is_empty() {
            return Err(ApiError::bad_request(errors.join("; ")));
        }
        Ok(UserDraft {
            name,
            email,
            phone_number,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: UserRole,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: UserStatus,
}

/// Query string for `GET /users`.
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub search: Option<String>,
    pub status: Option<UserStatus>,
    pub role: Option<UserRole>,
    pub page: Option<u32>,
    pub size: Option<u32>,
}

/// User as returned to the client.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone_number: String,
    pub role: UserRole,
    pub status: UserStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            phone_number: u.phone_number,
            role: u.role,
            status: u.status,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}
