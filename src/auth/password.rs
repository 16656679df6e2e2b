use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::rngs::OsRng;
use tracing::{error, warn};

/// Outcome of checking a password against a stored hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    Success,
    Failed,
}

pub trait CredentialHasher: Send + Sync {
    /// Produces a self-describing hash with a fresh random salt.
    fn hash(&self, plain: &str) -> anyhow::Result<String>;

    /// Never errors; a corrupt hash is simply `Failed`.
    fn verify(&self, hash: &str, plain: &str) -> Verification;
}

/// Argon2id hasher producing PHC strings.
#[derive(Clone)]
pub struct Argon2Hasher {
    argon2: Argon2<'static>,
}

impl Default for Argon2Hasher {
    fn default() -> Self {
        Self {
            argon2: Argon2::default(),
        }
    }
}

impl Argon2Hasher {
    pub fn with_params(params: Params) -> Self {
        Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        }
    }

    /// Minimal cost parameters so test suites don't spend seconds hashing.
    #[cfg(test)]
    pub fn fast() -> Self {
        Self::with_params(Params::new(Params::MIN_M_COST, 1, 1, None).expect("valid params"))
    }
}

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, plain: &str) -> anyhow::Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(plain.as_bytes(), &salt)
            .map_err(|e| {
                error!(error = %e, "argon2 hash_password error");
                anyhow::anyhow!(e.to_string())
            })?
            .to_string();
        Ok(hash)
    }

    fn verify(&self, hash: &str, plain: &str) -> Verification {
        let parsed = match PasswordHash::new(hash) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "stored password hash is malformed");
                return Verification::Failed;
            }
        };
        match self.argon2.verify_password(plain.as_bytes(), &parsed) {
            Ok(()) => Verification::Success,
            Err(_) => Verification::Failed,
        }
    }
}
