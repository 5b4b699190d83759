use tracing::debug;

use super::repo::UserStore;
use super::repo_types::User;
use super::services::DirectoryError;

/// Rejects any email or phone number already held by some record.
///
/// This is a read-then-write check at the service level; two concurrent writes
/// can both pass it. The store's unique constraints settle that race.
pub async fn check_unique(
    store: &dyn UserStore,
    email: &str,
    phone_number: &str,
) -> Result<(), DirectoryError> {
    if store.exists_by_email_or_phone(email, phone_number).await? {
        debug!(%email, %phone_number, "email or phone number already in use");
        return Err(DirectoryError::Conflict);
    }
    Ok(())
}

/// True when an update changes either identity field, which is when the
/// uniqueness check has to run. Both fields are then checked together.
pub fn identity_changed(current: &User, email: &str, phone_number: &str) -> bool {
    current.email != email || current.phone_number != phone_number
}
