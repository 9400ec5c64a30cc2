//! Backing services connected and health-checked once at startup.

use crate::config::AppConfig;
use crate::error::{AppError, ConfigError};
use crate::store::{JsonFileStore, PgSettings, PgStore, Store};
use async_trait::async_trait;
use futures::future::try_join_all;
use std::any::Any;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::info;

pub const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(5);

#[async_trait]
pub trait External: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    async fn connect(&self) -> Result<(), AppError>;

    async fn health_check(&self) -> Result<(), AppError>;

    fn as_any(&self) -> &dyn Any;
}

/// The connected externals, shared by the application shell and the readiness route.
#[derive(Clone, Default)]
pub struct Externals {
    items: Arc<Vec<Arc<dyn External>>>,
}

impl Externals {
    /// Connect and health-check every external concurrently. The first failure, or running
    /// past `timeout`, aborts with a `ConfigError`.
    pub async fn register(items: Vec<Arc<dyn External>>, timeout: Duration) -> Result<Self, ConfigError> {
        let startup = try_join_all(items.iter().map(|ext| async move {
            let failed = |e: AppError| ConfigError::External {
                name: ext.name().to_string(),
                reason: e.to_string(),
            };
            ext.connect().await.map_err(failed)?;
            ext.health_check().await.map_err(failed)?;
            info!(external = ext.name(), "external connected");
            Ok::<_, ConfigError>(())
        }));
        tokio::time::timeout(timeout, startup)
            .await
            .map_err(|_| ConfigError::StartupTimeout(timeout))??;
        Ok(Externals { items: Arc::new(items) })
    }

    /// The registered external of concrete type `T`.
    pub fn get<T: External>(&self) -> Result<&T, ConfigError> {
        self.items
            .iter()
            .find_map(|ext| ext.as_any().downcast_ref::<T>())
            .ok_or(ConfigError::ExternalNotRegistered(std::any::type_name::<T>()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn External>> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Health-check every external; returns each name with its error, if any.
    pub async fn check_all(&self) -> Vec<(&'static str, Option<String>)> {
        futures::future::join_all(self.items.iter().map(|ext| async move {
            (ext.name(), ext.health_check().await.err().map(|e| e.to_string()))
        }))
        .await
    }
}

fn not_connected(name: &str) -> ConfigError {
    ConfigError::External {
        name: name.to_string(),
        reason: "not connected".into(),
    }
}

/// PostgreSQL: creates the database if missing, builds the pool, checks with `SELECT 1`.
pub struct PostgresExternal {
    settings: PgSettings,
    store: OnceCell<Arc<PgStore>>,
}

impl PostgresExternal {
    pub fn new(settings: PgSettings) -> Self {
        PostgresExternal {
            settings,
            store: OnceCell::new(),
        }
    }

    pub fn from_app_config(config: &AppConfig) -> Result<Self, ConfigError> {
        Ok(PostgresExternal::new(PgSettings {
            database_url: config.require_database_url()?.to_string(),
            schema: config.database_schema.clone(),
            max_connections: config.database_max_connections,
            acquire_timeout: config.request_timeout,
        }))
    }

    pub fn store(&self) -> Result<Arc<PgStore>, ConfigError> {
        self.store.get().cloned().ok_or_else(|| not_connected(self.name()))
    }
}

#[async_trait]
impl External for PostgresExternal {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn connect(&self) -> Result<(), AppError> {
        self.store
            .get_or_try_init(|| async { PgStore::connect(&self.settings).await.map(Arc::new) })
            .await?;
        Ok(())
    }

    async fn health_check(&self) -> Result<(), AppError> {
        self.store()?.health_check().await
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Flat JSON file: loads or creates the file, checks by re-reading it.
pub struct JsonFileExternal {
    path: PathBuf,
    store: OnceCell<Arc<JsonFileStore>>,
}

impl JsonFileExternal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonFileExternal {
            path: path.into(),
            store: OnceCell::new(),
        }
    }

    pub fn store(&self) -> Result<Arc<JsonFileStore>, ConfigError> {
        self.store.get().cloned().ok_or_else(|| not_connected(self.name()))
    }
}

#[async_trait]
impl External for JsonFileExternal {
    fn name(&self) -> &'static str {
        "json-file"
    }

    async fn connect(&self) -> Result<(), AppError> {
        self.store
            .get_or_try_init(|| async { JsonFileStore::open(self.path.clone()).await.map(Arc::new) })
            .await?;
        Ok(())
    }

    async fn health_check(&self) -> Result<(), AppError> {
        self.store()?.health_check().await
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Failing;

    #[async_trait]
    impl External for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }
        async fn connect(&self) -> Result<(), AppError> {
            Err(AppError::Internal("connection refused".into()))
        }
        async fn health_check(&self) -> Result<(), AppError> {
            Ok(())
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    struct Slow;

    #[async_trait]
    impl External for Slow {
        fn name(&self) -> &'static str {
            "slow"
        }
        async fn connect(&self) -> Result<(), AppError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        }
        async fn health_check(&self) -> Result<(), AppError> {
            Ok(())
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[tokio::test]
    async fn json_file_external_registers_and_exposes_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        let externals = Externals::register(
            vec![Arc::new(JsonFileExternal::new(&path))],
            DEFAULT_STARTUP_TIMEOUT,
        )
        .await
        .unwrap();
        let store = externals.get::<JsonFileExternal>().unwrap().store().unwrap();
        assert_eq!(store.path(), path.as_path());
        assert!(externals.get::<PostgresExternal>().is_err());
        assert!(externals.check_all().await.iter().all(|(_, err)| err.is_none()));
    }

    #[tokio::test]
    async fn failing_external_aborts_startup() {
        let err = Externals::register(vec![Arc::new(Failing)], DEFAULT_STARTUP_TIMEOUT)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ConfigError::External { ref name, .. } if name == "failing"));
    }

    #[tokio::test]
    async fn slow_external_times_out() {
        let err = Externals::register(vec![Arc::new(Slow)], Duration::from_millis(50))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ConfigError::StartupTimeout(_)));
    }

    #[test]
    fn store_before_connect_is_an_error() {
        assert!(JsonFileExternal::new("unused.json").store().is_err());
    }
}
