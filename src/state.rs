use crate::auth::repo::{PgUserRepo, UserRepo};
use crate::blogs::repo::{BlogRepo, PgBlogRepo};
use crate::config::AppConfig;
use crate::memory::{MemoryBlogRepo, MemoryUserRepo};
use anyhow::Context;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserRepo>,
    pub blogs: Arc<dyn BlogRepo>,
    /// `None` when running on the in-memory store.
    pub db: Option<PgPool>,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        if config.uses_memory_store() {
            tracing::warn!("DATABASE_URL is memory://; data will not survive a restart");
            return Ok(Self::in_memory(config));
        }

        let db = sqlx::postgres::PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;

        Ok(Self::from_pool(db, config))
    }

    pub fn from_pool(db: PgPool, config: AppConfig) -> Self {
        Self {
            config: Arc::new(config),
            users: Arc::new(PgUserRepo::new(db.clone())) as Arc<dyn UserRepo>,
            blogs: Arc::new(PgBlogRepo::new(db.clone())) as Arc<dyn BlogRepo>,
            db: Some(db),
        }
    }

    pub fn in_memory(config: AppConfig) -> Self {
        Self {
            config: Arc::new(config),
            users: Arc::new(MemoryUserRepo::default()) as Arc<dyn UserRepo>,
            blogs: Arc::new(MemoryBlogRepo::default()) as Arc<dyn BlogRepo>,
            db: None,
        }
    }
}
