use std::collections::BTreeMap;
use std::sync::Arc;

use axum::async_trait;
use tokio::sync::RwLock;

use crate::error::{AppError, AppResult};
use crate::users::repo::UserRepository;
use crate::users::repo_types::{normalize_email, Audit, NewUser, User, UserPatch};

/// In-memory `UserRepository` for tests. The email check and insert happen
/// under one write lock, which stands in for the unique index.
#[derive(Debug, Default, Clone)]
pub struct InMemoryUserRepository {
    inner: Arc<RwLock<Inner>>,
}

#[derive(Debug, Default)]
struct Inner {
    next_id: i64,
    users: BTreeMap<i64, User>,
}

impl Inner {
    fn email_taken(&self, email: &str, except: Option<i64>) -> bool {
        self.users
            .values()
            .any(|u| Some(u.id) != except && u.email == email)
    }
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.users.len()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: NewUser, audit: Audit) -> AppResult<User> {
        let mut inner = self.inner.write().await;
        let email = normalize_email(&user.email);
        if inner.email_taken(&email, None) {
            return Err(AppError::DuplicateEmail);
        }
        inner.next_id += 1;
        let row = User {
            id: inner.next_id,
            name: user.name,
            email,
            password_hash: user.password_hash,
            city: user.city,
            country: user.country,
            phone: user.phone,
            postal_code: user.postal_code,
            created_at: audit.at,
            created_from: audit.from,
            updated_at: None,
            updated_from: None,
        };
        inner.users.insert(row.id, row.clone());
        Ok(row)
    }

    async fn get_by_id(&self, id: i64) -> AppResult<Option<User>> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn get_all(&self) -> AppResult<Vec<User>> {
        Ok(self.inner.read().await.users.values().cloned().collect())
    }

    async fn update(&self, id: i64, patch: UserPatch, audit: Audit) -> AppResult<Option<User>> {
        let mut inner = self.inner.write().await;
        let email = patch.email.as_deref().map(normalize_email);
        if let Some(email) = &email {
            if inner.email_taken(email, Some(id)) {
                return Err(AppError::DuplicateEmail);
            }
        }
        let Some(row) = inner.users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(v) = patch.name {
            row.name = Some(v);
        }
        if let Some(v) = email {
            row.email = v;
        }
        if let Some(v) = patch.password_hash {
            row.password_hash = v;
        }
        if let Some(v) = patch.city {
            row.city = Some(v);
        }
        if let Some(v) = patch.country {
            row.country = Some(v);
        }
        if let Some(v) = patch.phone {
            row.phone = Some(v);
        }
        if let Some(v) = patch.postal_code {
            row.postal_code = Some(v);
        }
        row.updated_at = Some(audit.at);
        row.updated_from = audit.from;
        Ok(Some(row.clone()))
    }

    async fn delete(&self, id: i64) -> AppResult<bool> {
        Ok(self.inner.write().await.users.remove(&id).is_some())
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let email = normalize_email(email);
        let inner = self.inner.read().await;
        Ok(inner.users.values().find(|u| u.email == email).cloned())
    }

    async fn exists_by_email(&self, email: &str) -> AppResult<bool> {
        let email = normalize_email(email);
        Ok(self.inner.read().await.email_taken(&email, None))
    }

    async fn update_password(
        &self,
        email: &str,
        password_hash: &str,
        audit: Audit,
    ) -> AppResult<bool> {
        let email = normalize_email(email);
        let mut inner = self.inner.write().await;
        match inner.users.values_mut().find(|u| u.email == email) {
            Some(row) => {
                row.password_hash = password_hash.to_string();
                row.updated_at = Some(audit.at);
                row.updated_from = audit.from;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: Some("Alice".into()),
            email: email.into(),
            password_hash: "$argon2id$fake".into(),
            city: None,
            country: None,
            phone: None,
            postal_code: None,
        }
    }

    #[tokio::test]
    async fn create_rejects_case_variant_email() {
        let repo = InMemoryUserRepository::new();
        repo.create(new_user("alice@x.com"), Audit::now(None))
            .await
            .unwrap();
        let err = repo
            .create(new_user("ALICE@x.com"), Audit::now(None))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DuplicateEmail));
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn update_keeps_absent_fields() {
        let repo = InMemoryUserRepository::new();
        let mut nu = new_user("bob@x.com");
        nu.city = Some("Pune".into());
        let created = repo.create(nu, Audit::now(None)).await.unwrap();

        let patch = UserPatch {
            phone: Some("555".into()),
            ..Default::default()
        };
        let updated = repo
            .update(created.id, patch, Audit::now(Some("10.0.0.1".into())))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.city.as_deref(), Some("Pune"));
        assert_eq!(updated.phone.as_deref(), Some("555"));
        assert_eq!(updated.password_hash, created.password_hash);
        assert_eq!(updated.updated_from.as_deref(), Some("10.0.0.1"));
    }

    #[tokio::test]
    async fn delete_reports_missing_row() {
        let repo = InMemoryUserRepository::new();
        let created = repo
            .create(new_user("carol@x.com"), Audit::now(None))
            .await
            .unwrap();
        assert!(repo.delete(created.id).await.unwrap());
        assert!(!repo.delete(created.id).await.unwrap());
    }
}
