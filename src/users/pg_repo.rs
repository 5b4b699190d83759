use anyhow::Context;
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::debug;
use uuid::Uuid;

use super::filters::UserPredicate;
use super::repo::{Mutation, Page, PageRequest, StoreError, UserStore};
use super::repo_types::{User, UserRow};

const USER_COLUMNS: &str =
    "id, name, email, phone_number, role, status, created_at, updated_at";

/// `users` table backed by Postgres. Email and phone uniqueness is enforced by
/// the table's unique constraints.
#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn map_db_error(e: sqlx::Error, what: &'static str) -> StoreError {
    if e
        .as_database_error()
        .is_some_and(|db| db.is_unique_violation())
    {
        return StoreError::Duplicate;
    }
    StoreError::Backend(anyhow::Error::new(e).context(what))
}

fn into_user(row: UserRow) -> Result<User, StoreError> {
    User::try_from(row)
        .context("decode users row")
        .map_err(StoreError::Backend)
}

/// Escapes LIKE wildcards so the needle matches literally.
fn like_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Appends `predicate` as a boolean SQL expression with bound parameters.
pub(crate) fn push_predicate(qb: &mut QueryBuilder<'_, Postgres>, predicate: &UserPredicate) {
    match predicate {
        UserPredicate::All => {
            qb.push("TRUE");
        }
        UserPredicate::StatusIs(status) => {
            qb.push("status = ").push_bind(status.as_str());
        }
        UserPredicate::RoleIs(role) => {
            qb.push("role = ").push_bind(role.as_str());
        }
        UserPredicate::Contains(field, needle) => {
            qb.push("lower(")
                .push(field.column())
                .push(") LIKE ")
                .push_bind(like_pattern(needle))
                .push(" ESCAPE '\\'");
        }
        UserPredicate::And(parts) => push_joined(qb, parts, " AND ", "TRUE"),
        UserPredicate::Or(parts) => push_joined(qb, parts, " OR ", "FALSE"),
    }
}

fn push_joined(
    qb: &mut QueryBuilder<'_, Postgres>,
    parts: &[UserPredicate],
    separator: &str,
    empty: &str,
) {
    if parts.is_empty() {
        qb.push(empty);
        return;
    }
    qb.push("(");
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            qb.push(separator);
        }
        push_predicate(qb, part);
    }
    qb.push(")");
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| map_db_error(e, "select user by id"))?;
        row.map(into_user).transpose()
    }

    async fn exists_by_email_or_phone(
        &self,
        email: &str,
        phone_number: &str,
    ) -> Result<bool, StoreError> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM users WHERE email = $1 OR phone_number = $2
            )
            "#,
        )
        .bind(email)
        .bind(phone_number)
        .fetch_one(&self.db)
        .await
        .map_err(|e| map_db_error(e, "check email/phone existence"))
    }

    async fn insert(&self, user: User) -> Result<User, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users ({USER_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.phone_number)
        .bind(user.role.as_str())
        .bind(user.status.as_str())
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(&self.db)
        .await
        .map_err(|e| map_db_error(e, "insert user"))?;
        debug!(user_id = %row.id, "user row inserted");
        into_user(row)
    }

    async fn modify(&self, id: Uuid, mutation: Mutation) -> Result<User, StoreError> {
        let mut tx = self
            .db
            .begin()
            .await
            .map_err(|e| map_db_error(e, "begin user transaction"))?;

        // Row lock held until commit; other writers to this id wait here.
        let current = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_db_error(e, "lock user row"))?
        .ok_or(StoreError::NotFound(id))?;

        let next = mutation(into_user(current)?);
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            UPDATE users
               SET name = $2, email = $3, phone_number = $4,
                   role = $5, status = $6, updated_at = $7
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&next.name)
        .bind(&next.email)
        .bind(&next.phone_number)
        .bind(next.role.as_str())
        .bind(next.status.as_str())
        .bind(next.updated_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_db_error(e, "update user"))?;

        tx.commit()
            .await
            .map_err(|e| map_db_error(e, "commit user update"))?;
        into_user(row)
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .map_err(|e| map_db_error(e, "delete user"))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    async fn find_page(
        &self,
        predicate: &UserPredicate,
        request: PageRequest,
    ) -> Result<Page<User>, StoreError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users WHERE ");
        push_predicate(&mut count, predicate);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.db)
            .await
            .map_err(|e| map_db_error(e, "count users"))?;

        let offset = i64::try_from(request.offset()).context("page offset overflow")?;
        let mut select =
            QueryBuilder::<Postgres>::new(format!("SELECT {USER_COLUMNS} FROM users WHERE "));
        push_predicate(&mut select, predicate);
        select
            .push(" ORDER BY created_at ASC, id ASC LIMIT ")
            .push_bind(i64::from(request.size))
            .push(" OFFSET ")
            .push_bind(offset);

        let rows = select
            .build_query_as::<UserRow>()
            .fetch_all(&self.db)
            .await
            .map_err(|e| map_db_error(e, "select users page"))?;
        let content = rows
            .into_iter()
            .map(into_user)
            .collect::<Result<Vec<_>, _>>()?;

        let total = u64::try_from(total).context("negative user count")?;
        Ok(Page::new(content, request, total))
    }
}
