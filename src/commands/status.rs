use crate::indexer::BuildState;
use crate::AppState;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct BuildStatusView {
    pub ready: bool,
    pub progress_percent: u8,
    pub total_files: usize,
    pub processed_files: usize,
    pub segments_indexed: usize,
    pub state: BuildState,
    pub last_error: Option<String>,
}

/// Snapshot of the index build
pub async fn build_status(state: &AppState) -> BuildStatusView {
    let status = state.status.read().await.clone();
    BuildStatusView {
        ready: status.ready(),
        progress_percent: status.progress_percent(),
        total_files: status.total_files,
        processed_files: status.processed_files,
        segments_indexed: status.segments_indexed,
        state: status.state,
        last_error: status.last_error,
    }
}
