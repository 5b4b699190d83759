use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Role granted to a user. Only changed through an explicit role update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    User,
    Admin,
}

/// Account status. Only changed through an explicit status update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserStatus {
    Active,
    Inactive,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    kind: &'static str,
    value: String,
}

impl UserRole {
    pub fn as_str(self) -> &'static str {
        match self {
            UserRole::User => "USER",
            UserRole::Admin => "ADMIN",
        }
    }
}

impl UserStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            UserStatus::Active => "ACTIVE",
            UserStatus::Inactive => "INACTIVE",
        }
    }
}

impl FromStr for UserRole {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USER" => Ok(UserRole::User),
            "ADMIN" => Ok(UserRole::Admin),
            _ => Err(UnknownVariant {
                kind: "role",
                value: s.to_string(),
            }),
        }
    }
}

impl FromStr for UserStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ACTIVE" => Ok(UserStatus::Active),
            "INACTIVE" => Ok(UserStatus::Inactive),
            _ => Err(UnknownVariant {
                kind: "status",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User record as held by the directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,                    // assigned once, never reused
    pub name: String,                // 2..=100 chars
    pub email: String,               // unique
    pub phone_number: String,        // unique, E.164
    pub role: UserRole,
    pub status: UserStatus,
    pub created_at: OffsetDateTime,  // immutable after creation
    pub updated_at: OffsetDateTime,  // refreshed on every mutation
}

/// Caller-supplied fields for a new user. Role, status, id and timestamps
/// are never taken from the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDraft {
    pub name: String,
    pub email: String,
    pub phone_number: String,
}

/// Raw row in the `users` table; enums are stored as text.
#[derive(Debug, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone_number: String,
    pub role: String,
    pub status: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl TryFrom<UserRow> for User {
    type Error = UnknownVariant;

    fn try_from(r: UserRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            name: r.name,
            email: r.email,
            phone_number: r.phone_number,
            role: r.role.parse()?,
            status: r.status.parse()?,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn enums_parse_case_insensitively() {
        assert_eq!("admin".parse::<UserRole>().unwrap(), UserRole::Admin);
        assert_eq!(" Inactive ".parse::<UserStatus>().unwrap(), UserStatus::Inactive);
        let err = "owner".parse::<UserRole>().unwrap_err();
        assert_eq!(err.to_string(), "unknown role 'owner'");
    }

    #[test]
    fn enums_serialize_upper_case() {
        assert_eq!(serde_json::to_string(&UserRole::Admin).unwrap(), "\"ADMIN\"");
        assert_eq!(serde_json::to_string(&UserStatus::Active).unwrap(), "\"ACTIVE\"");
        let status: UserStatus = serde_json::from_str("\"INACTIVE\"").unwrap();
        assert_eq!(status, UserStatus::Inactive);
        assert!(serde_json::from_str::<UserRole>("\"admin\"").is_err());
    }

    #[test]
    fn row_converts_to_user() {
        let ts = datetime!(2025-01-01 10:00 UTC);
        let row = UserRow {
            id: Uuid::new_v4(),
            name: "Ana Li".into(),
            email: "ana@x.com".into(),
            phone_number: "+10000000001".into(),
            role: "ADMIN".into(),
            status: "ACTIVE".into(),
            created_at: ts,
            updated_at: ts,
        };
        let user = User::try_from(row).unwrap();
        assert_eq!(user.role, UserRole::Admin);
        assert_eq!(user.status, UserStatus::Active);

        let bad = UserRow {
            id: Uuid::new_v4(),
            name: "Bo".into(),
            email: "bo@x.com".into(),
            phone_number: "+10000000002".into(),
            role: "ROOT".into(),
            status: "ACTIVE".into(),
            created_at: ts,
            updated_at: ts,
        };
        assert!(User::try_from(bad).is_err());
    }
}
