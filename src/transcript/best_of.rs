//! Best-of compilations: markdown with a title line, a link line, then one
//! clock-stamped highlight per line.

use super::dates::parse_clock;
use crate::database::{ContentType, Segment};
use regex::Regex;
use std::sync::OnceLock;

/// Lines before this index are the title and link header
const FIRST_ENTRY_LINE: usize = 2;

fn entry_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*((?:\d{1,2}:)?\d{1,2}:\d{2})\s+\S").expect("valid best-of entry regex")
    })
}

fn markdown_link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\((https?://[^\s)]+)\)").expect("valid markdown link regex")
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct BestOf {
    pub title: Option<String>,
    pub video_url: Option<String>,
    pub segments: Vec<Segment>,
}

fn is_separator(line: &str) -> bool {
    matches!(line, "---" | "***" | "___")
}

fn parse_title(line: &str) -> Option<String> {
    let title = line.trim().trim_start_matches('#').trim();
    (!title.is_empty()).then(|| title.to_string())
}

/// Accepts a bare URL, `<url>`, or a markdown link `[label](url)`
fn parse_url(line: &str) -> Option<String> {
    let trimmed = line.trim();
    if let Some(caps) = markdown_link_re().captures(trimmed) {
        return Some(caps[1].to_string());
    }
    let bare = trimmed.trim_start_matches('<').trim_end_matches('>');
    if bare.starts_with("http://") || bare.starts_with("https://") {
        Some(bare.to_string())
    } else {
        None
    }
}

pub fn parse_best_of(content: &str, file: &str, date: &str) -> BestOf {
    let lines: Vec<&str> = content.lines().collect();

    let title = lines.first().and_then(|l| parse_title(l));
    let video_url = lines.get(1).and_then(|l| parse_url(l));

    let segments = lines
        .iter()
        .enumerate()
        .skip(FIRST_ENTRY_LINE)
        .filter_map(|(idx, raw)| {
            let line = raw.trim();
            if line.is_empty() || is_separator(line) {
                return None;
            }
            let caps = entry_re().captures(line)?;
            Some(Segment {
                file: file.to_string(),
                line_offset: idx,
                date: date.to_string(),
                text_content: line.to_string(),
                content_type: ContentType::BestOf,
                start_seconds: parse_clock(&caps[1]),
            })
        })
        .collect();

    BestOf {
        title,
        video_url,
        segments,
    }
}
