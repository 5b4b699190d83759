use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::filters::UserPredicate;
use super::repo::{Mutation, Page, PageRequest, StoreError, UserStore};
use super::repo_types::User;

/// In-process store. A single lock covers the uniqueness check and the write,
/// so it gives the same guarantees as the database constraints.
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<Uuid, User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn clashes(users: &HashMap<Uuid, User>, candidate: &User) -> bool {
    users.values().any(|u| {
        u.id != candidate.id
            && (u.email == candidate.email || u.phone_number == candidate.phone_number)
    })
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn exists_by_email_or_phone(
        &self,
        email: &str,
        phone_number: &str,
    ) -> Result<bool, StoreError> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .any(|u| u.email == email || u.phone_number == phone_number))
    }

    async fn insert(&self, user: User) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.id) || clashes(&users, &user) {
            return Err(StoreError::Duplicate);
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn modify(&self, id: Uuid, mutation: Mutation) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        let current = users.get(&id).cloned().ok_or(StoreError::NotFound(id))?;
        let created_at = current.created_at;

        let mut next = mutation(current);
        next.id = id;
        next.created_at = created_at;
        if clashes(&users, &next) {
            return Err(StoreError::Duplicate);
        }
        users.insert(id, next.clone());
        Ok(next)
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        self.users
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound(id))
    }

    async fn find_page(
        &self,
        predicate: &UserPredicate,
        request: PageRequest,
    ) -> Result<Page<User>, StoreError> {
        let users = self.users.read().await;
        let mut matching: Vec<&User> = users.values().filter(|u| predicate.matches(u)).collect();
        matching.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));

        let total = matching.len() as u64;
        let offset = usize::try_from(request.offset()).unwrap_or(usize::MAX);
        let content = matching
            .into_iter()
            .skip(offset)
            .take(request.size as usize)
            .cloned()
            .collect();
        Ok(Page::new(content, request, total))
    }
}
