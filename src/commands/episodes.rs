use crate::database::{ContentType, EpisodeView};
use crate::error::AppError;
use crate::metadata;
use crate::AppState;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EpisodeFilter {
    pub years: Vec<i32>,
    /// Both content types when `None`
    pub content_type: Option<ContentType>,
}

pub async fn list_episodes(
    state: &AppState,
    filter: EpisodeFilter,
) -> Result<Vec<EpisodeView>, AppError> {
    state
        .db
        .list_episodes(filter.content_type, &filter.years)
        .map_err(AppError::from)
}

/// Full text of a transcript, addressed by its path relative to the data
/// root. Paths that leave the data root are reported as not found.
pub async fn fetch_raw_transcript(
    state: &AppState,
    relative_path: &str,
) -> Result<String, AppError> {
    let relative = Path::new(relative_path);
    let escapes = relative_path.trim().is_empty()
        || relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        log::warn!("Rejected transcript path {:?}", relative_path);
        return Err(AppError::NotFound(relative_path.to_string()));
    }

    let not_found = || AppError::NotFound(relative_path.to_string());
    let root = tokio::fs::canonicalize(&state.config.data_root)
        .await
        .map_err(|_| not_found())?;
    let full = tokio::fs::canonicalize(root.join(relative))
        .await
        .map_err(|_| not_found())?;
    if !full.starts_with(&root) || !full.is_file() {
        return Err(not_found());
    }

    Ok(tokio::fs::read_to_string(&full).await?)
}

/// Rebuild the link table from the configured metadata source without
/// touching the segment index
pub async fn refresh_links(state: &AppState) -> Result<usize, AppError> {
    let path = state
        .config
        .metadata_csv
        .as_ref()
        .ok_or_else(|| AppError::Config("no metadata_csv configured".into()))?;
    metadata::rebuild_links(&state.db, path)
}
