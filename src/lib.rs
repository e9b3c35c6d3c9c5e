pub mod commands;
pub mod config;
pub mod database;
pub mod error;
pub mod indexer;
pub mod metadata;
pub mod search;
pub mod transcript;

use config::Config;
use database::{Database, SCHEMA_VERSION};
use error::AppError;
use indexer::{BuildStatus, BuildSummary, IndexBuilder, StatusHandle};
use search::QueryEngine;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;

type BuildTask = JoinHandle<Result<BuildSummary, AppError>>;

/// Everything the exposed operations share
pub struct AppState {
    pub db: Arc<Database>,
    pub config: Arc<Config>,
    pub status: StatusHandle,
    pub engine: QueryEngine,
    build_task: Mutex<Option<BuildTask>>,
}

impl AppState {
    /// Open the database and run the startup gate once. When the index is
    /// missing, stale or a re-index is forced, the build is spawned on the
    /// current tokio runtime and searches report progress until it finishes.
    pub async fn bootstrap(config: Config) -> Result<Self, AppError> {
        let config = Arc::new(config);
        let db = Arc::new(Database::new(&config.database_path)?);

        let rebuild = indexer::needs_rebuild(&db, &config)?;
        let status: StatusHandle = Arc::new(RwLock::new(if rebuild {
            BuildStatus::default()
        } else {
            BuildStatus::complete()
        }));

        let build_task = if rebuild {
            let builder = IndexBuilder::new(db.clone(), config.clone(), status.clone())?;
            Some(tokio::spawn(async move { builder.run().await }))
        } else {
            log::info!(
                "Index at {} is current (schema v{}), skipping build",
                config.database_path.display(),
                SCHEMA_VERSION
            );
            None
        };

        let engine = QueryEngine::new(db.clone(), &config);
        log::info!("Show archive initialized");

        Ok(Self {
            db,
            config,
            status,
            engine,
            build_task: Mutex::new(build_task),
        })
    }

    /// Wait for the build spawned by `bootstrap`, if any. Only the first
    /// caller receives the summary.
    pub async fn wait_for_build(&self) -> Option<Result<BuildSummary, AppError>> {
        let task = self.build_task.lock().await.take()?;
        Some(match task.await {
            Ok(result) => result,
            Err(e) => Err(AppError::Other(format!("index build task aborted: {}", e))),
        })
    }
}
