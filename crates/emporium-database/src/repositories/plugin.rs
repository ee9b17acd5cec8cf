//! Plugin repository and the PostgreSQL activation registry.

use async_trait::async_trait;
use sqlx::PgPool;

use emporium_core::error::{AppError, ErrorKind};
use emporium_core::result::AppResult;
use emporium_core::traits::ActivationRegistry;
use emporium_core::types::{ActivationRecord, HandlerRecord};

use crate::models::{HandlerRow, PluginRow};

/// Repository for the `plugins` and `plugin_event_handlers` tables.
#[derive(Debug, Clone)]
pub struct PluginRepository {
    pool: PgPool,
}

impl PluginRepository {
    /// Create a new plugin repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a plugin by code.
    pub async fn find_by_code(&self, code: &str) -> AppResult<Option<PluginRow>> {
        sqlx::query_as::<_, PluginRow>("SELECT * FROM plugins WHERE code = $1")
            .bind(code)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find plugin by code", e))
    }

    /// List all installed plugins, soft-deleted ones included.
    pub async fn find_all(&self) -> AppResult<Vec<PluginRow>> {
        sqlx::query_as::<_, PluginRow>("SELECT * FROM plugins ORDER BY code")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list plugins", e))
    }

    /// List every handler override with its plugin code.
    pub async fn find_handlers(&self) -> AppResult<Vec<HandlerRow>> {
        sqlx::query_as::<_, HandlerRow>(
            "SELECT p.code AS plugin_code, h.event, h.handler, h.priority \
             FROM plugin_event_handlers h \
             JOIN plugins p ON p.id = h.plugin_id \
             ORDER BY p.code, h.event, h.priority DESC, h.handler",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list plugin handlers", e))
    }
}

/// [`ActivationRegistry`] backed by PostgreSQL.
#[derive(Debug, Clone)]
pub struct PgActivationRegistry {
    repo: PluginRepository,
}

impl PgActivationRegistry {
    /// Creates a registry over a connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self {
            repo: PluginRepository::new(pool),
        }
    }
}

#[async_trait]
impl ActivationRegistry for PgActivationRegistry {
    async fn list_handler_records(&self) -> AppResult<Vec<HandlerRecord>> {
        Ok(self
            .repo
            .find_handlers()
            .await?
            .into_iter()
            .map(HandlerRecord::from)
            .collect())
    }

    async fn get_activation(&self, code: &str) -> AppResult<Option<ActivationRecord>> {
        Ok(self.repo.find_by_code(code).await?.map(ActivationRecord::from))
    }

    async fn list_activations(&self) -> AppResult<Vec<ActivationRecord>> {
        Ok(self
            .repo
            .find_all()
            .await?
            .into_iter()
            .map(ActivationRecord::from)
            .collect())
    }
}
