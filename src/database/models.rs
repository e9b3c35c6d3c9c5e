use serde::{Deserialize, Serialize};

/// Date sentinel for files whose name does not encode an air date
pub const UNKNOWN_DATE: &str = "Unknown Date";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Show,
    BestOf,
}

impl Default for ContentType {
    fn default() -> Self {
        Self::Show
    }
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Show => "show",
            Self::BestOf => "best_of",
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ContentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "show" | "shows" => Ok(Self::Show),
            "best_of" | "bestof" | "best-of" => Ok(Self::BestOf),
            other => Err(format!("unknown content type: {}", other)),
        }
    }
}

impl From<String> for ContentType {
    fn from(s: String) -> Self {
        s.parse().unwrap_or_default()
    }
}

/// One indexed unit of transcript text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub file: String,
    pub line_offset: usize,
    pub date: String,
    pub text_content: String,
    pub content_type: ContentType,
    /// Seconds into the source video, when the source line carries a clock
    pub start_seconds: Option<u32>,
}

impl Segment {
    /// `<file>:<line>`, unique across the corpus
    pub fn id(&self) -> String {
        segment_id(&self.file, self.line_offset)
    }
}

pub fn segment_id(file: &str, line_offset: usize) -> String {
    format!("{}:{}", file, line_offset)
}

/// Registry row, one per source file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub file: String,
    pub date: String,
    pub content_type: ContentType,
    pub video_url: Option<String>,
    pub custom_title: Option<String>,
    pub segment_count: usize,
}

/// Curated metadata for one air date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub date: String,
    pub video_url: String,
    pub host: Option<String>,
    pub custom_title: Option<String>,
    pub notes: Option<String>,
    pub info: Option<String>,
}

/// Episode decorated with its curated link row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeView {
    pub file: String,
    pub date: String,
    pub content_type: ContentType,
    pub video_url: Option<String>,
    pub custom_title: Option<String>,
    pub host: Option<String>,
    pub segment_count: i64,
}

/// Raw row from one of the segment indexes, already joined with the
/// registry and link tables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentHit {
    pub id: String,
    pub file: String,
    pub line_offset: i64,
    pub date: String,
    pub content_type: ContentType,
    pub start_seconds: Option<i64>,
    pub text_content: String,
    pub snippet: String,
    pub rank: f64,
    pub video_url: Option<String>,
    pub custom_title: Option<String>,
    pub host: Option<String>,
}

/// Which of the two indexes a query runs against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexKind {
    Exact,
    Fuzzy,
}

impl IndexKind {
    pub fn table(&self) -> &'static str {
        match self {
            Self::Exact => "segments_exact",
            Self::Fuzzy => "segments_fuzzy",
        }
    }
}

/// Filters shared by searches and episode listings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SegmentFilter {
    pub content_type: ContentType,
    pub years: Vec<i32>,
}

/// A fully composed index lookup. Every string in here is bound as a
/// statement parameter, never spliced into SQL text.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexQuery {
    pub kind: IndexKind,
    /// FTS5 match expression for the row predicate
    pub match_expr: String,
    /// One match expression per AND clause; the result is restricted to
    /// files matching all of them. Empty when the query has no AND.
    pub required_clauses: Vec<String>,
    /// Fuzzy scoring terms for the row predicate (fuzzy index only)
    pub score_terms: Option<String>,
    /// Fuzzy scoring terms per AND clause, parallel to `required_clauses`
    pub clause_score_terms: Vec<String>,
    pub min_score: f64,
}

impl IndexQuery {
    pub fn exact(match_expr: String, required_clauses: Vec<String>) -> Self {
        Self {
            kind: IndexKind::Exact,
            match_expr,
            required_clauses,
            score_terms: None,
            clause_score_terms: Vec::new(),
            min_score: 0.0,
        }
    }
}
