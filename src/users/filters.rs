//! Search criteria and the predicate tree they compose into.
//!
//! A [`UserPredicate`] is a plain value: the in-memory store evaluates it with
//! [`UserPredicate::matches`], the Postgres store renders it to SQL. Both must
//! agree on semantics, so text matching here is a literal, case-insensitive
//! substring test.

use super::repo_types::{User, UserRole, UserStatus};

/// Optional search criteria. Absent or blank values do not constrain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFilter {
    pub search: Option<String>,
    pub status: Option<UserStatus>,
    pub role: Option<UserRole>,
}

/// Text columns that free-text search looks into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserField {
    Name,
    Email,
    PhoneNumber,
}

impl UserField {
    pub const SEARCHABLE: [UserField; 3] =
        [UserField::Name, UserField::Email, UserField::PhoneNumber];

    pub fn column(self) -> &'static str {
        match self {
            UserField::Name => "name",
            UserField::Email => "email",
            UserField::PhoneNumber => "phone_number",
        }
    }

    fn value(self, user: &User) -> &str {
        match self {
            UserField::Name => &user.name,
            UserField::Email => &user.email,
            UserField::PhoneNumber => &user.phone_number,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserPredicate {
    /// Matches every record.
    All,
    StatusIs(UserStatus),
    RoleIs(UserRole),
    /// Case-insensitive substring; the needle is stored lower-cased.
    Contains(UserField, String),
    And(Vec<UserPredicate>),
    Or(Vec<UserPredicate>),
}

impl UserPredicate {
    pub fn contains(field: UserField, needle: &str) -> Self {
        UserPredicate::Contains(field, needle.to_lowercase())
    }

    /// Free-text match on any searchable field.
    pub fn text(needle: &str) -> Self {
        UserPredicate::Or(
            UserField::SEARCHABLE
                .iter()
                .map(|f| UserPredicate::contains(*f, needle))
                .collect(),
        )
    }

    /// Logical AND where `All` is the identity.
    pub fn and(self, other: UserPredicate) -> UserPredicate {
        match (self, other) {
            (UserPredicate::All, p) | (p, UserPredicate::All) => p,
            (UserPredicate::And(mut left), UserPredicate::And(right)) => {
                left.extend(right);
                UserPredicate::And(left)
            }
            (UserPredicate::And(mut left), p) => {
                left.push(p);
                UserPredicate::And(left)
            }
            (p, UserPredicate::And(mut right)) => {
                right.insert(0, p);
                UserPredicate::And(right)
            }
            (left, right) => UserPredicate::And(vec![left, right]),
        }
    }

    pub fn is_unrestricted(&self) -> bool {
        matches!(self, UserPredicate::All)
    }

    pub fn matches(&self, user: &User) -> bool {
        match self {
            UserPredicate::All => true,
            UserPredicate::StatusIs(status) => user.status == *status,
            UserPredicate::RoleIs(role) => user.role == *role,
            UserPredicate::Contains(field, needle) => {
                field.value(user).to_lowercase().contains(needle.as_str())
            }
            UserPredicate::And(parts) => parts.iter().all(|p| p.matches(user)),
            UserPredicate::Or(parts) => parts.iter().any(|p| p.matches(user)),
        }
    }
}

/// Folds the present criteria into one predicate, AND-ed together.
pub fn compose(filter: &UserFilter) -> UserPredicate {
    let search = filter
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(UserPredicate::text);

    [
        filter.status.map(UserPredicate::StatusIs),
        filter.role.map(UserPredicate::RoleIs),
        search,
    ]
    .into_iter()
    .flatten()
    .fold(UserPredicate::All, UserPredicate::and)
}
