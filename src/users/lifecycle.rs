use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use super::repo_types::{User, UserDraft, UserRole, UserStatus};

/// Role and status assigned to every new user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserDefaults {
    pub role: UserRole,
    pub status: UserStatus,
}

impl Default for UserDefaults {
    fn default() -> Self {
        Self {
            role: UserRole::User,
            status: UserStatus::Active,
        }
    }
}

/// Owns creation defaults and timestamp rules. Every function here is a pure
/// field-setting step; callers resolve the record before mutating it.
#[derive(Debug, Clone, Copy, Default)]
pub struct Lifecycle {
    defaults: UserDefaults,
}

impl Lifecycle {
    pub fn new(defaults: UserDefaults) -> Self {
        Self { defaults }
    }

    pub fn defaults(&self) -> UserDefaults {
        self.defaults
    }

    pub fn initialize_for_create(&self, draft: UserDraft) -> User {
        let now = now_micros();
        User {
            id: Uuid::new_v4(),
            name: draft.name,
            email: draft.email,
            phone_number: draft.phone_number,
            role: self.defaults.role,
            status: self.defaults.status,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply_full_update(
        &self,
        mut user: User,
        name: String,
        email: String,
        phone_number: String,
    ) -> User {
        user.name = name;
        user.email = email;
        user.phone_number = phone_number;
        touch(&mut user);
        user
    }

    pub fn apply_role_change(&self, mut user: User, role: UserRole) -> User {
        user.role = role;
        touch(&mut user);
        user
    }

    pub fn apply_status_change(&self, mut user: User, status: UserStatus) -> User {
        user.status = status;
        touch(&mut user);
        user
    }
}

/// Current time at microsecond precision, the resolution of TIMESTAMPTZ.
fn now_micros() -> OffsetDateTime {
    let now = OffsetDateTime::now_utc();
    now - Duration::nanoseconds(i64::from(now.nanosecond() % 1_000))
}

// updated_at must move forward even if the clock has not ticked since the
// previous write.
fn touch(user: &mut User) {
    let now = now_micros();
    user.updated_at = if now > user.updated_at {
        now
    } else {
        user.updated_at + Duration::microseconds(1)
    };
}
