use std::sync::Arc;

use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::filters::{compose, UserFilter};
use super::guard::{check_unique, identity_changed};
use super::lifecycle::Lifecycle;
use super::repo::{Page, PageRequest, StoreError, UserStore};
use super::repo_types::{User, UserDraft, UserRole, UserStatus};

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("User not found with id: {0}")]
    NotFound(Uuid),
    #[error("Email or phone number already in use.")]
    Conflict,
    #[error(transparent)]
    Store(anyhow::Error),
}

impl From<StoreError> for DirectoryError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => DirectoryError::NotFound(id),
            StoreError::Duplicate => DirectoryError::Conflict,
            StoreError::Backend(e) => DirectoryError::Store(e),
        }
    }
}

/// Entry point for every user operation. Each call is one self-contained unit
/// of work against the store; nothing is retried.
///
/// Mutations go through [`UserStore::modify`], so the lifecycle step always
/// sees the record as currently stored and concurrent changes to one user
/// are applied in turn rather than overwriting each other.
#[derive(Clone)]
pub struct DirectoryService {
    store: Arc<dyn UserStore>,
    lifecycle: Lifecycle,
}

impl DirectoryService {
    pub fn new(store: Arc<dyn UserStore>, lifecycle: Lifecycle) -> Self {
        Self { store, lifecycle }
    }

    #[instrument(skip(self, draft), fields(email = %draft.email))]
    pub async fn create(&self, draft: UserDraft) -> Result<User, DirectoryError> {
        info!("creating user");
        check_unique(self.store.as_ref(), &draft.email, &draft.phone_number).await?;

        let user = self.lifecycle.initialize_for_create(draft);
        let user = self.store.insert(user).await?;

        info!(user_id = %user.id, "user created");
        Ok(user)
    }

    #[instrument(skip(self))]
    pub async fn get_by_id(&self, id: Uuid) -> Result<User, DirectoryError> {
        self.load(id).await
    }

    #[instrument(skip(self))]
    pub async fn search(
        &self,
        filter: &UserFilter,
        request: PageRequest,
    ) -> Result<Page<User>, DirectoryError> {
        let predicate = compose(filter);
        debug!(unrestricted = predicate.is_unrestricted(), "search predicate composed");
        let page = self.store.find_page(&predicate, request).await?;
        info!(
            returned = page.content.len(),
            total = page.total_elements,
            "users listed"
        );
        Ok(page)
    }

    #[instrument(skip(self, changes), fields(email = %changes.email))]
    pub async fn full_update(&self, id: Uuid, changes: UserDraft) -> Result<User, DirectoryError> {
        info!("updating user");
        let current = self.load(id).await?;

        if identity_changed(&current, &changes.email, &changes.phone_number) {
            check_unique(self.store.as_ref(), &changes.email, &changes.phone_number).await?;
        }

        let UserDraft {
            name,
            email,
            phone_number,
        } = changes;
        let lifecycle = self.lifecycle;
        let user = self
            .store
            .modify(
                id,
                Box::new(move |stored: User| {
                    lifecycle.apply_full_update(stored, name, email, phone_number)
                }),
            )
            .await?;

        info!("user updated");
        Ok(user)
    }

    #[instrument(skip(self))]
    pub async fn update_role(&self, id: Uuid, role: UserRole) -> Result<User, DirectoryError> {
        let lifecycle = self.lifecycle;
        let user = self
            .store
            .modify(
                id,
                Box::new(move |stored: User| lifecycle.apply_role_change(stored, role)),
            )
            .await?;
        info!("user role updated");
        Ok(user)
    }

    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        id: Uuid,
        status: UserStatus,
    ) -> Result<User, DirectoryError> {
        let lifecycle = self.lifecycle;
        let user = self
            .store
            .modify(
                id,
                Box::new(move |stored: User| lifecycle.apply_status_change(stored, status)),
            )
            .await?;
        info!("user status updated");
        Ok(user)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), DirectoryError> {
        self.store.delete(id).await?;
        info!("user deleted");
        Ok(())
    }

    async fn load(&self, id: Uuid) -> Result<User, DirectoryError> {
        self.store
            .get_by_id(id)
            .await?
            .ok_or(DirectoryError::NotFound(id))
    }
}
