use std::fmt::Debug;
use std::ops::Deref;
use std::path::PathBuf;
use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::database::Database;
use crate::ServiceState;

#[async_trait]
pub trait DataSource {
    /// Perform various checks on the system to ensure its healthy and ready to accept requests.
    async fn is_ready(&self) -> Result<(), DataSourceError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DataSourceError {
    #[error("one or more dependent services aren't available")]
    DependencyFailure,

    #[allow(dead_code)]
    #[error("service has received signal indicating it should shutdown")]
    ShuttingDown,
}

pub type DynDataSource = Arc<dyn DataSource + Send + Sync>;

pub struct StateDataSource(DynDataSource);

impl Debug for StateDataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateDataSource").finish()
    }
}

impl StateDataSource {
    #[cfg(test)]
    pub fn new(dds: DynDataSource) -> Self {
        Self(dds)
    }
}

impl Deref for StateDataSource {
    type Target = DynDataSource;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// The ownership index answers queries and the storage root is present.
struct ServiceSource {
    db: Database,
    content_root: PathBuf,
}

#[async_trait]
impl DataSource for ServiceSource {
    async fn is_ready(&self) -> Result<(), DataSourceError> {
        let _ = sqlx::query("SELECT 1 as id;")
            .fetch_one(self.db.deref())
            .await
            .map_err(|e| {
                tracing::warn!("ownership index not ready: {}", e);
                DataSourceError::DependencyFailure
            })?;

        match tokio::fs::metadata(&self.content_root).await {
            Ok(meta) if meta.is_dir() => Ok(()),
            _ => {
                tracing::warn!(root = %self.content_root.display(), "content root unavailable");
                Err(DataSourceError::DependencyFailure)
            }
        }
    }
}

#[async_trait]
impl FromRequestParts<ServiceState> for StateDataSource {
    type Rejection = ();

    async fn from_request_parts(
        _parts: &mut Parts,
        state: &ServiceState,
    ) -> Result<Self, Self::Rejection> {
        Ok(StateDataSource(Arc::new(ServiceSource {
            db: state.database().clone(),
            content_root: state.content().root().to_path_buf(),
        })))
    }
}
