use std::sync::Arc;

use anyhow::Context;
use sqlx::PgPool;

use quill_auth::{BcryptHasher, Hs256TokenService, JwtValidator};
use quill_infra::store::{
    CredentialStore, InMemoryCredentialStore, InMemoryPostStore, PostStore, PostgresCredentialStore,
    PostgresPostStore, apply_schema,
};
use quill_infra::{AccountService, AppConfig, PostLifecycle};

/// Everything the handlers need, shared across requests.
pub struct AppServices {
    pub posts: PostLifecycle<Arc<dyn PostStore>>,
    pub accounts: AccountService<Arc<dyn CredentialStore>>,
    pub jwt: Arc<dyn JwtValidator>,
}

impl AppServices {
    /// Postgres stores when `DATABASE_URL` is set, in-memory stores otherwise.
    pub async fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let tokens = Arc::new(Hs256TokenService::new(config.jwt_secret.as_bytes(), config.token_ttl));
        let hasher = BcryptHasher::new(config.bcrypt_cost);

        let Some(database_url) = config.database_url.as_deref() else {
            tracing::warn!("DATABASE_URL not set; using in-memory stores");
            return Ok(Self::assemble(
                Arc::new(InMemoryPostStore::new()),
                Arc::new(InMemoryCredentialStore::new()),
                hasher,
                tokens,
            ));
        };

        let pool = PgPool::connect(database_url)
            .await
            .context("failed to connect to Postgres")?;
        apply_schema(&pool).await.context("failed to apply schema")?;
        tracing::info!("connected to Postgres");

        Ok(Self::assemble(
            Arc::new(PostgresPostStore::new(pool.clone())),
            Arc::new(PostgresCredentialStore::new(pool)),
            hasher,
            tokens,
        ))
    }

    /// In-memory stores with a cheap bcrypt cost, for tests and local runs.
    pub fn in_memory(jwt_secret: &str) -> Self {
        let ttl = chrono::Duration::minutes(quill_infra::config::DEFAULT_TOKEN_TTL_MINUTES);
        Self::assemble(
            Arc::new(InMemoryPostStore::new()),
            Arc::new(InMemoryCredentialStore::new()),
            BcryptHasher::new(4),
            Arc::new(Hs256TokenService::new(jwt_secret.as_bytes(), ttl)),
        )
    }

    fn assemble(
        posts: Arc<dyn PostStore>,
        credentials: Arc<dyn CredentialStore>,
        hasher: BcryptHasher,
        tokens: Arc<Hs256TokenService>,
    ) -> Self {
        Self {
            posts: PostLifecycle::new(posts),
            accounts: AccountService::new(credentials, Arc::new(hasher), tokens.clone()),
            jwt: tokens,
        }
    }
}
