use sqlx::FromRow;
use time::OffsetDateTime;

/// User record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub name: Option<String>,
    pub email: String,
    pub password_hash: String, // Argon2 PHC string
    pub city: Option<String>,
    pub country: Option<String>,
    pub phone: Option<String>,
    pub postal_code: Option<String>,
    pub created_at: OffsetDateTime,
    pub created_from: Option<String>,
    pub updated_at: Option<OffsetDateTime>,
    pub updated_from: Option<String>,
}

/// When and from where a write happened.
#[derive(Debug, Clone)]
pub struct Audit {
    pub at: OffsetDateTime,
    pub from: Option<String>,
}

impl Audit {
    pub fn now(from: Option<String>) -> Self {
        Self {
            at: OffsetDateTime::now_utc(),
            from,
        }
    }
}

/// Row to insert. Only ever carries a hash, never the plaintext password.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: Option<String>,
    pub email: String,
    pub password_hash: String,
    pub city: Option<String>,
    pub country: Option<String>,
    pub phone: Option<String>,
    pub postal_code: Option<String>,
}

/// Partial update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub phone: Option<String>,
    pub postal_code: Option<String>,
}

/// Trims and lower-cases an email so lookups and the unique index agree.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
