//! Query engine: resolves a user query against the exact index, falls back
//! to the trigram index, then widens and decorates each hit.

pub mod context;
pub mod fuzzy;
pub mod query;

#[cfg(test)]
mod tests;

use crate::config::Config;
use crate::database::{
    is_match_syntax_error, ContentType, Database, IndexKind, IndexQuery, SegmentFilter,
    SegmentHit,
};
use crate::error::AppError;
use crate::indexer::{BuildState, BuildStatus};
use context::ContextReader;
use query::{QueryPlan, Thesaurus};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

pub const PAGE_SIZE: i64 = 100;

/// Shorter raw queries never fall back to the trigram index
pub const MIN_FUZZY_QUERY_CHARS: usize = 3;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchRequest {
    pub query: String,
    pub years: Vec<i32>,
    pub content_type: ContentType,
    pub offset: i64,
}

/// A hit as returned to callers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub file: String,
    pub line_offset: i64,
    pub date: String,
    pub content_type: ContentType,
    /// Source lines around the hit, or the indexed text when the file is gone
    pub text: String,
    pub snippet: String,
    pub rank: f64,
    pub start_seconds: Option<i64>,
    pub video_url: Option<String>,
    pub custom_title: Option<String>,
    pub host: Option<String>,
    pub deep_link: Option<String>,
}

impl SearchHit {
    fn from_row(row: SegmentHit, reader: &mut ContextReader) -> Self {
        let text = reader
            .window(&row.file, row.line_offset)
            .unwrap_or_else(|| row.text_content.clone());
        let deep_link = match (&row.video_url, row.start_seconds) {
            (Some(url), Some(secs)) => Some(context::deep_link(url, secs)),
            _ => None,
        };
        Self {
            id: row.id,
            file: row.file,
            line_offset: row.line_offset,
            date: row.date,
            content_type: row.content_type,
            text,
            snippet: row.snippet,
            rank: row.rank,
            start_seconds: row.start_seconds,
            video_url: row.video_url,
            custom_title: row.custom_title,
            host: row.host,
            deep_link,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SearchOutcome {
    /// The index is still being built
    Indexing { progress_percent: u8 },
    Results {
        hits: Vec<SearchHit>,
        /// Index that produced the hits; `None` when no index was queried
        mode: Option<IndexKind>,
        offset: i64,
        has_more: bool,
    },
}

impl SearchOutcome {
    pub fn empty(offset: i64) -> Self {
        SearchOutcome::Results {
            hits: Vec::new(),
            mode: None,
            offset,
            has_more: false,
        }
    }

    pub fn hits(&self) -> &[SearchHit] {
        match self {
            SearchOutcome::Results { hits, .. } => hits,
            SearchOutcome::Indexing { .. } => &[],
        }
    }
}

pub struct QueryEngine {
    db: Arc<Database>,
    data_root: PathBuf,
    thesaurus: Thesaurus,
    fuzzy_threshold: f64,
}

impl QueryEngine {
    pub fn new(db: Arc<Database>, config: &Config) -> Self {
        Self {
            db,
            data_root: config.data_root.clone(),
            thesaurus: Thesaurus::with_extra(&config.synonyms),
            fuzzy_threshold: config.fuzzy_threshold,
        }
    }

    pub fn search(
        &self,
        request: &SearchRequest,
        status: &BuildStatus,
    ) -> Result<SearchOutcome, AppError> {
        let offset = request.offset.max(0);
        match status.state {
            BuildState::Complete => {}
            BuildState::Failed => {
                log::warn!("Search on a failed index: {:?}", status.last_error);
                return Ok(SearchOutcome::empty(offset));
            }
            BuildState::Idle | BuildState::Building => {
                return Ok(SearchOutcome::Indexing {
                    progress_percent: status.progress_percent(),
                })
            }
        }

        let raw = request.query.trim();
        if raw.is_empty() {
            return Ok(SearchOutcome::empty(offset));
        }

        let plan = match QueryPlan::parse(raw, &self.thesaurus) {
            Ok(Some(plan)) => plan,
            Ok(None) => return Ok(SearchOutcome::empty(offset)),
            Err(e) => {
                log::warn!("{}; returning no results", e);
                return Ok(SearchOutcome::empty(offset));
            }
        };

        let filter = SegmentFilter {
            content_type: request.content_type,
            years: request.years.clone(),
        };

        let mut mode = IndexKind::Exact;
        let exact_query = plan.exact_query();
        let mut rows = self.run(&exact_query, &filter, PAGE_SIZE, offset)?;

        // A later page past the end of exact results stays exact
        let exact_exhausted = rows.is_empty()
            && offset > 0
            && !self.run(&exact_query, &filter, 1, 0)?.is_empty();

        if rows.is_empty()
            && !exact_exhausted
            && !plan.is_verbatim()
            && raw.chars().count() >= MIN_FUZZY_QUERY_CHARS
        {
            if let Some(fuzzy_query) = plan.fuzzy_query(self.fuzzy_threshold) {
                rows = self.run(&fuzzy_query, &filter, PAGE_SIZE, offset)?;
                mode = IndexKind::Fuzzy;
                log::debug!("Fuzzy fallback for {:?}: {} hits", raw, rows.len());
            }
        }

        let has_more = rows.len() as i64 == PAGE_SIZE;
        let mut reader = ContextReader::new(&self.data_root);
        let hits = rows
            .into_iter()
            .map(|row| SearchHit::from_row(row, &mut reader))
            .collect();

        Ok(SearchOutcome::Results {
            hits,
            mode: Some(mode),
            offset,
            has_more,
        })
    }

    fn run(
        &self,
        query: &IndexQuery,
        filter: &SegmentFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<SegmentHit>, AppError> {
        match self.db.search_segments(query, filter, limit, offset) {
            Ok(rows) => Ok(rows),
            Err(e) if is_match_syntax_error(&e) => {
                log::warn!(
                    "Match expression {:?} rejected by {}: {}",
                    query.match_expr,
                    query.kind.table(),
                    e
                );
                Ok(Vec::new())
            }
            Err(e) => Err(e.into()),
        }
    }
}
