//! Curated video links, loaded from a quoted CSV export.
//!
//! Documented column order: `date, initiator, video_url, notes, info, host,
//! custom_title`. The header row is checked against that schema (with common
//! aliases); an unrecognized header falls back to the positional order.

use crate::database::{Database, LinkRecord};
use crate::error::{AppError, MetadataError};
use chrono::NaiveDate;
use std::path::Path;

pub const DOCUMENTED_COLUMNS: [&str; 7] = [
    "date",
    "initiator",
    "video_url",
    "notes",
    "info",
    "host",
    "custom_title",
];

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%m/%d/%Y", "%Y%m%d", "%Y/%m/%d"];

// ── CSV records ────────────────────────────────────────────────────────────

/// Split CSV text into records. Quoted fields may contain commas, newlines
/// and doubled quotes. An unterminated quote swallows the rest of the input
/// and is reported as an error for the record where it began.
pub fn parse_records(text: &str) -> Vec<Result<Vec<String>, MetadataError>> {
    let mut records = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut row_started = false;
    let mut row_number = 1;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    field.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(c);
            }
            continue;
        }

        match c {
            '"' => {
                in_quotes = true;
                row_started = true;
            }
            ',' => {
                row.push(std::mem::take(&mut field));
                row_started = true;
            }
            '\r' => {}
            '\n' => {
                row.push(std::mem::take(&mut field));
                records.push(Ok(std::mem::take(&mut row)));
                row_number += 1;
                row_started = false;
            }
            _ => {
                field.push(c);
                row_started = true;
            }
        }
    }

    if in_quotes {
        records.push(Err(MetadataError::UnterminatedQuote { row: row_number }));
    } else if row_started {
        row.push(field);
        records.push(Ok(row));
    }

    records
}

// ── Column mapping ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Date,
    Initiator,
    VideoUrl,
    Notes,
    Info,
    Host,
    CustomTitle,
}

fn header_role(name: &str) -> Option<Role> {
    let key = name.trim().to_ascii_lowercase().replace([' ', '-'], "_");
    match key.as_str() {
        "date" | "air_date" | "show_date" => Some(Role::Date),
        "initiator" | "type" => Some(Role::Initiator),
        "video_url" | "video" | "url" | "link" | "youtube" | "youtube_link" => Some(Role::VideoUrl),
        "notes" => Some(Role::Notes),
        "info" => Some(Role::Info),
        "host" | "hosts" => Some(Role::Host),
        "custom_title" | "title" => Some(Role::CustomTitle),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap {
    pub date: usize,
    pub video_url: usize,
    pub notes: Option<usize>,
    pub info: Option<usize>,
    pub host: Option<usize>,
    pub custom_title: Option<usize>,
}

impl ColumnMap {
    pub fn positional() -> Self {
        Self {
            date: 0,
            video_url: 2,
            notes: Some(3),
            info: Some(4),
            host: Some(5),
            custom_title: Some(6),
        }
    }

    /// Map columns by header name; `None` unless both date and URL are named
    pub fn from_header(header: &[String]) -> Option<Self> {
        let find = |role: Role| header.iter().position(|h| header_role(h) == Some(role));
        Some(Self {
            date: find(Role::Date)?,
            video_url: find(Role::VideoUrl)?,
            notes: find(Role::Notes),
            info: find(Role::Info),
            host: find(Role::Host),
            custom_title: find(Role::CustomTitle),
        })
    }
}

// ── Link extraction ────────────────────────────────────────────────────────

/// `YYYY-MM-DD` for any accepted date spelling
pub fn normalize_date(raw: &str) -> Option<String> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .map(|d| d.format("%Y-%m-%d").to_string())
}

pub fn is_plausible_url(raw: &str) -> bool {
    let url = raw.trim();
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"));
    matches!(rest, Some(r) if !r.is_empty() && !r.contains(char::is_whitespace))
}

#[derive(Debug, Default)]
pub struct LinkReport {
    pub links: Vec<LinkRecord>,
    pub skipped: Vec<MetadataError>,
}

fn optional_field(row: &[String], idx: Option<usize>) -> Option<String> {
    idx.and_then(|i| row.get(i))
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Parse a metadata CSV into link records, skipping rows without a usable
/// date or URL
pub fn extract_links(text: &str) -> LinkReport {
    let mut report = LinkReport::default();
    let mut records = parse_records(text).into_iter();

    let columns = match records.next() {
        Some(Ok(header)) => ColumnMap::from_header(&header).unwrap_or_else(|| {
            log::warn!(
                "Metadata header {:?} does not name the documented columns {:?}; using positional order",
                header,
                DOCUMENTED_COLUMNS
            );
            ColumnMap::positional()
        }),
        Some(Err(e)) => {
            report.skipped.push(e);
            return report;
        }
        None => return report,
    };

    for (idx, record) in records.enumerate() {
        let row_number = idx + 2;
        let row = match record {
            Ok(row) => row,
            Err(e) => {
                report.skipped.push(e);
                continue;
            }
        };
        if row.iter().all(|f| f.trim().is_empty()) {
            continue;
        }

        let raw_date = row.get(columns.date).map(String::as_str).unwrap_or("");
        let date = match normalize_date(raw_date) {
            Some(d) => d,
            None => {
                report.skipped.push(MetadataError::BadDate {
                    row: row_number,
                    value: raw_date.to_string(),
                });
                continue;
            }
        };

        let video_url = match row.get(columns.video_url).filter(|u| is_plausible_url(u)) {
            Some(u) => u.trim().to_string(),
            None => {
                report.skipped.push(MetadataError::MissingUrl { row: row_number });
                continue;
            }
        };

        report.links.push(LinkRecord {
            date,
            video_url,
            host: optional_field(&row, columns.host),
            custom_title: optional_field(&row, columns.custom_title),
            notes: optional_field(&row, columns.notes),
            info: optional_field(&row, columns.info),
        });
    }

    report
}

/// Replace the link table from the CSV at `path`. The table is untouched when
/// the file cannot be read.
pub fn rebuild_links(db: &Database, path: &Path) -> Result<usize, AppError> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        AppError::Io(format!(
            "Failed to read metadata source {}: {}",
            path.display(),
            e
        ))
    })?;

    let report = extract_links(&text);
    for skipped in &report.skipped {
        log::debug!("Metadata row skipped: {}", skipped);
    }

    let count = db.replace_links(&report.links)?;
    log::info!(
        "Link table rebuilt from {}: {} dates ({} rows read, {} skipped)",
        path.display(),
        count,
        report.links.len(),
        report.skipped.len()
    );
    Ok(count)
}
