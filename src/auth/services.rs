use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use crate::{
    auth::{
        dto::{LoginRequest, LoginResponse, RegisterRequest},
        jwt::TokenIssuer,
        password::{CredentialHasher, Verification},
    },
    error::{AppError, AppResult},
    users::{
        dto::ResetPasswordRequest,
        repo::UserRepository,
        repo_types::{normalize_email, Audit, NewUser, User},
    },
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

/// Registration, login and password reset.
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    hasher: Arc<dyn CredentialHasher>,
    tokens: Arc<dyn TokenIssuer>,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        hasher: Arc<dyn CredentialHasher>,
        tokens: Arc<dyn TokenIssuer>,
    ) -> Self {
        Self {
            users,
            hasher,
            tokens,
        }
    }

    pub async fn email_taken(&self, email: &str) -> AppResult<bool> {
        self.users.exists_by_email(email).await
    }

    pub async fn register(&self, req: RegisterRequest, origin: Option<String>) -> AppResult<User> {
        if is_blank(&req.email) || is_blank(&req.password) {
            return Err(AppError::invalid("Email and password are required."));
        }
        let email = normalize_email(&req.email);
        if !is_valid_email(&email) {
            warn!(email = %email, "invalid email");
            return Err(AppError::invalid("Invalid email"));
        }

        // Fast path for the common case; the unique index still decides races.
        if self.users.exists_by_email(&email).await? {
            warn!(email = %email, "email already registered");
            return Err(AppError::DuplicateEmail);
        }

        let password_hash = self.hasher.hash(&req.password)?;
        let new_user = NewUser {
            name: req.name,
            email,
            password_hash,
            city: req.city,
            country: req.country,
            phone: req.phone,
            postal_code: req.postal_code,
        };

        let user = match self.users.create(new_user, Audit::now(origin)).await {
            Ok(u) => u,
            Err(AppError::DuplicateEmail) => {
                warn!("email registered concurrently");
                return Err(AppError::DuplicateEmail);
            }
            Err(e) => return Err(e),
        };

        info!(user_id = user.id, email = %user.email, "user registered");
        Ok(user)
    }

    pub async fn login(&self, req: LoginRequest) -> AppResult<LoginResponse> {
        if is_blank(&req.email) || is_blank(&req.password) {
            return Err(AppError::invalid("Email and password are required."));
        }

        let Some(user) = self.users.find_by_email(&req.email).await? else {
            warn!(email = %normalize_email(&req.email), "login unknown email");
            return Err(AppError::InvalidCredentials);
        };

        if self.hasher.verify(&user.password_hash, &req.password) != Verification::Success {
            warn!(user_id = user.id, "login invalid password");
            return Err(AppError::InvalidCredentials);
        }

        let token = self.tokens.issue(&user)?;
        info!(user_id = user.id, "user logged in");
        Ok(LoginResponse {
            token,
            email: user.email,
            name: user.name,
        })
    }

    /// Replaces the password of the account owning `email`. The caller proves
    /// nothing beyond knowing the address.
    pub async fn reset_password(
        &self,
        req: ResetPasswordRequest,
        origin: Option<String>,
    ) -> AppResult<()> {
        if is_blank(&req.new_password) {
            return Err(AppError::invalid("New password is required."));
        }
        if req.new_password != req.confirm_password {
            return Err(AppError::invalid("Passwords do not match."));
        }

        let Some(user) = self.users.find_by_email(&req.email).await? else {
            return Err(AppError::NotFound("User not found.".into()));
        };

        let hash = self.hasher.hash(&req.new_password)?;
        if !self
            .users
            .update_password(&user.email, &hash, Audit::now(origin))
            .await?
        {
            return Err(AppError::NotFound("User not found.".into()));
        }
        info!(user_id = user.id, "password reset");
        Ok(())
    }
}
