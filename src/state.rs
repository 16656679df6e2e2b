use std::sync::Arc;

use crate::{
    auth::{
        jwt::JwtKeys,
        password::{Argon2Hasher, CredentialHasher},
        services::AuthService,
    },
    config::AppConfig,
    db,
    users::{
        repo::{PgUserRepository, UserRepository},
        services::UserService,
    },
    weather::client::WeatherClient,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub keys: JwtKeys,
    pub auth: AuthService,
    pub users: UserService,
    pub weather: WeatherClient,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let pool = db::connect(&config).await?;
        db::migrate(&pool).await?;

        Self::from_parts(
            config,
            Arc::new(PgUserRepository::new(pool)),
            Arc::new(Argon2Hasher::default()),
        )
    }

    /// Wires the workflows from explicit collaborators. Fails on a JWT key
    /// that is too short, so a bad secret stops the process at startup.
    pub fn from_parts(
        config: AppConfig,
        repo: Arc<dyn UserRepository>,
        hasher: Arc<dyn CredentialHasher>,
    ) -> anyhow::Result<Self> {
        let keys = JwtKeys::new(&config.jwt)?;
        let auth = AuthService::new(repo.clone(), hasher.clone(), Arc::new(keys.clone()));
        let users = UserService::new(repo, hasher);
        let weather = WeatherClient::new(config.weather.clone())?;

        Ok(Self {
            config: Arc::new(config),
            keys,
            auth,
            users,
            weather,
        })
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        use crate::users::memory::InMemoryUserRepository;

        Self::from_parts(
            crate::config::test_config(),
            Arc::new(InMemoryUserRepository::new()),
            Arc::new(Argon2Hasher::fast()),
        )
        .expect("test state")
    }
}
