use crate::config::Config;
use crate::database::{Database, SCHEMA_VERSION};
use crate::error::{AppError, IndexError};
use crate::metadata;
use crate::transcript::{discover_sources, ParsedFile, TranscriptParser};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildState {
    Idle,
    Building,
    Complete,
    Failed,
}

/// Shared build state for status reporting. Readers clone a snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct BuildStatus {
    pub state: BuildState,
    pub total_files: usize,
    pub processed_files: usize,
    pub segments_indexed: usize,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl Default for BuildStatus {
    fn default() -> Self {
        Self {
            state: BuildState::Idle,
            total_files: 0,
            processed_files: 0,
            segments_indexed: 0,
            started_at: None,
            finished_at: None,
            last_error: None,
        }
    }
}

impl BuildStatus {
    /// Status for an index that passed the startup gate
    pub fn complete() -> Self {
        Self {
            state: BuildState::Complete,
            finished_at: Some(Utc::now()),
            ..Self::default()
        }
    }

    pub fn ready(&self) -> bool {
        self.state == BuildState::Complete
    }

    pub fn progress_percent(&self) -> u8 {
        match self.state {
            BuildState::Complete => 100,
            _ if self.total_files == 0 => 0,
            _ => ((self.processed_files * 100) / self.total_files).min(100) as u8,
        }
    }
}

pub type StatusHandle = Arc<RwLock<BuildStatus>>;

/// What one build produced
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildSummary {
    pub files_indexed: usize,
    pub files_skipped: usize,
    pub segments_indexed: usize,
    /// Link rows after reconciliation; `None` when no source is configured
    /// or it could not be read
    pub links: Option<usize>,
}

/// Whether the on-disk index has to be rebuilt before it can serve queries
pub fn needs_rebuild(db: &Database, config: &Config) -> Result<bool, AppError> {
    if config.force_reindex {
        log::info!("Forced re-index requested");
        return Ok(true);
    }
    Ok(!db.index_is_current(SCHEMA_VERSION)?)
}

pub struct IndexBuilder {
    db: Arc<Database>,
    config: Arc<Config>,
    parser: TranscriptParser,
    status: StatusHandle,
}

impl IndexBuilder {
    pub fn new(
        db: Arc<Database>,
        config: Arc<Config>,
        status: StatusHandle,
    ) -> Result<Self, AppError> {
        let parser = TranscriptParser::new(&config.host_prefixes)
            .map_err(|e| AppError::Config(format!("invalid host prefixes: {}", e)))?;
        Ok(Self {
            db,
            config,
            parser,
            status,
        })
    }

    /// Build the index from scratch, publishing progress as it goes. A
    /// failure leaves the status at `Failed` and the marker unset.
    pub async fn run(&self) -> Result<BuildSummary, AppError> {
        {
            let mut status = self.status.write().await;
            *status = BuildStatus {
                state: BuildState::Building,
                started_at: Some(Utc::now()),
                ..BuildStatus::default()
            };
        }
        log::info!(
            "Index build started (data root {})",
            self.config.data_root.display()
        );

        let result = self.build().await;

        let mut status = self.status.write().await;
        status.finished_at = Some(Utc::now());
        match &result {
            Ok(summary) => {
                status.state = BuildState::Complete;
                status.segments_indexed = summary.segments_indexed;
                log::info!(
                    "Index build complete: {} files, {} skipped, {} segments, links {:?}",
                    summary.files_indexed,
                    summary.files_skipped,
                    summary.segments_indexed,
                    summary.links
                );
            }
            Err(e) => {
                status.state = BuildState::Failed;
                status.last_error = Some(e.to_string());
                log::error!("CRITICAL: index build failed: {}", e);
            }
        }
        result
    }

    async fn build(&self) -> Result<BuildSummary, AppError> {
        self.db.mark_index_incomplete()?;
        self.db.reset_index()?;

        let sources = discover_sources(&self.config);
        self.status.write().await.total_files = sources.len();

        if sources.is_empty() {
            let err = IndexError::NoSourcesFound(vec![
                self.config.shows_root(),
                self.config.best_of_root(),
            ]);
            log::error!("CRITICAL: {}", err);
        }

        let mut summary = BuildSummary::default();
        let mut pending: Vec<ParsedFile> = Vec::new();
        let mut pending_segments = 0;

        for (idx, source) in sources.iter().enumerate() {
            match self.parser.parse_file(source) {
                Ok(parsed) => {
                    pending_segments += parsed.segments.len();
                    summary.files_indexed += 1;
                    pending.push(parsed);
                }
                Err(e) => {
                    log::warn!("Skipping {}: {}", source.relative, e);
                    summary.files_skipped += 1;
                }
            }

            if pending_segments >= self.config.batch_size {
                summary.segments_indexed += self.flush(&mut pending)?;
                pending_segments = 0;
            }

            {
                let mut status = self.status.write().await;
                status.processed_files = idx + 1;
                status.segments_indexed = summary.segments_indexed;
            }
            tokio::task::yield_now().await;
        }
        summary.segments_indexed += self.flush(&mut pending)?;

        if let Some(csv) = &self.config.metadata_csv {
            match metadata::rebuild_links(&self.db, csv) {
                Ok(count) => summary.links = Some(count),
                Err(e) => log::warn!("Link reconciliation skipped, keeping existing links: {}", e),
            }
        }

        self.db.mark_index_complete(SCHEMA_VERSION)?;
        Ok(summary)
    }

    /// Write every pending file in one transaction
    fn flush(&self, pending: &mut Vec<ParsedFile>) -> Result<usize, AppError> {
        if pending.is_empty() {
            return Ok(0);
        }
        let batch = std::mem::take(pending);
        let written = self.db.write_batch(|writer| {
            for file in &batch {
                writer.register_episode(&file.episode)?;
                for segment in &file.segments {
                    writer.index_segment(segment)?;
                }
            }
            Ok(writer.segments_written())
        })?;
        log::debug!("Flushed {} files, {} segments", batch.len(), written);
        Ok(written)
    }
}
