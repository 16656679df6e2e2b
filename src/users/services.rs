use std::sync::Arc;

use tracing::{info, warn};

use crate::{
    auth::{password::CredentialHasher, services::is_valid_email},
    error::{AppError, AppResult},
    users::{
        dto::{PublicUser, UpdateUserRequest},
        repo::UserRepository,
        repo_types::{normalize_email, Audit, UserPatch},
    },
};

/// Profile reads, updates and deletes.
#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserRepository>,
    hasher: Arc<dyn CredentialHasher>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserRepository>, hasher: Arc<dyn CredentialHasher>) -> Self {
        Self { users, hasher }
    }

    pub async fn list(&self) -> AppResult<Vec<PublicUser>> {
        let users = self.users.get_all().await?;
        Ok(users.into_iter().map(PublicUser::from).collect())
    }

    pub async fn get(&self, id: i64) -> AppResult<PublicUser> {
        self.users
            .get_by_id(id)
            .await?
            .map(PublicUser::from)
            .ok_or_else(|| AppError::NotFound("User not found.".into()))
    }

    pub async fn update(
        &self,
        id: i64,
        req: UpdateUserRequest,
        origin: Option<String>,
    ) -> AppResult<PublicUser> {
        let email = match req.email {
            Some(e) if e.trim().is_empty() => return Err(AppError::invalid("Email cannot be empty.")),
            Some(e) => {
                let e = normalize_email(&e);
                if !is_valid_email(&e) {
                    return Err(AppError::invalid("Invalid email"));
                }
                Some(e)
            }
            None => None,
        };

        let password_hash = match req.password {
            Some(p) if p.trim().is_empty() => {
                return Err(AppError::invalid("Password cannot be empty."))
            }
            Some(p) => Some(self.hasher.hash(&p)?),
            None => None,
        };

        let patch = UserPatch {
            name: req.name,
            email,
            password_hash,
            city: req.city,
            country: req.country,
            phone: req.phone,
            postal_code: req.postal_code,
        };

        match self.users.update(id, patch, Audit::now(origin)).await? {
            Some(user) => {
                info!(user_id = id, "user updated");
                Ok(user.into())
            }
            None => {
                warn!(user_id = id, "update of missing user");
                Err(AppError::NotFound("User not found.".into()))
            }
        }
    }

    pub async fn delete(&self, id: i64) -> AppResult<()> {
        if self.users.delete(id).await? {
            info!(user_id = id, "user deleted");
            Ok(())
        } else {
            Err(AppError::NotFound("User not found.".into()))
        }
    }
}
