use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use super::filters::UserPredicate;
use super::repo_types::User;

/// Change applied to the stored record while the store holds it exclusively.
pub type Mutation = Box<dyn FnOnce(User) -> User + Send>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("user {0} not found")]
    NotFound(Uuid),
    /// A unique constraint on email or phone number rejected the write.
    #[error("email or phone number already stored")]
    Duplicate,
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Zero-based page index plus a positive page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
}

impl PageRequest {
    pub fn offset(&self) -> u64 {
        u64::from(self.page) * u64::from(self.size)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total_elements: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, request: PageRequest, total_elements: u64) -> Self {
        let size = u64::from(request.size.max(1));
        Self {
            content,
            page: request.page,
            size: request.size,
            total_elements,
            total_pages: total_elements.div_ceil(size),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            page: self.page,
            size: self.size,
            total_elements: self.total_elements,
            total_pages: self.total_pages,
        }
    }
}

/// Durable keyed storage for user records.
///
/// Implementations serialize writes per id and must reject a write that would
/// give two records the same email or phone number with
/// [`StoreError::Duplicate`]; that check is the only race-safe one.
/// Pages are ordered by `(created_at, id)`.
///
/// There is no blind whole-record replace: [`UserStore::modify`] reads,
/// mutates and writes one record as a single step, so concurrent changes to
/// the same id apply one after the other.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    async fn exists_by_email_or_phone(
        &self,
        email: &str,
        phone_number: &str,
    ) -> Result<bool, StoreError>;
    async fn insert(&self, user: User) -> Result<User, StoreError>;
    /// Applies `mutation` to the current record for `id` and stores the result.
    /// `created_at` and `id` are never written back.
    async fn modify(&self, id: Uuid, mutation: Mutation) -> Result<User, StoreError>;
    async fn delete(&self, id: Uuid) -> Result<(), StoreError>;
    async fn find_page(
        &self,
        predicate: &UserPredicate,
        request: PageRequest,
    ) -> Result<Page<User>, StoreError>;
}
