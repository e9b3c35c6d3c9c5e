use crate::error::AppError;
use crate::search::{SearchOutcome, SearchRequest};
use crate::AppState;

/// Run one query. While the index is being built this returns
/// `SearchOutcome::Indexing` instead of touching the index.
pub async fn search(state: &AppState, request: SearchRequest) -> Result<SearchOutcome, AppError> {
    let status = state.status.read().await.clone();
    state.engine.search(&request, &status)
}

/// Parse a comma-separated year list such as `"1999,2000"`. Entries that are
/// not four-digit years are ignored.
pub fn parse_years(raw: &str) -> Vec<i32> {
    let mut years = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match part.parse::<i32>() {
            Ok(year) if (1000..=9999).contains(&year) => {
                if !years.contains(&year) {
                    years.push(year);
                }
            }
            _ => log::warn!("Ignoring invalid year filter {:?}", part),
        }
    }
    years
}
