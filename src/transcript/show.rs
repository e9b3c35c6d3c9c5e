//! Daily show transcripts: dialogue grouped under `[start --> end]` markers.

use super::dates::parse_clock;
use crate::database::{ContentType, Segment};
use regex::Regex;
use std::sync::OnceLock;

fn marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^\s*\[\s*((?:\d{1,2}:)?\d{1,2}:\d{2}(?:[.,]\d{1,3})?)\s*-->\s*(?:\d{1,2}:)?\d{1,2}:\d{2}(?:[.,]\d{1,3})?\s*\](.*)$",
        )
        .expect("valid timestamp marker regex")
    })
}

/// Whether `line` opens a new segment
#[cfg(test)]
fn is_marker(line: &str) -> bool {
    marker_re().is_match(line)
}

struct OpenSegment {
    line_offset: usize,
    start_seconds: Option<u32>,
    parts: Vec<String>,
}

/// Split show text into segments, one per marker. Lines before the first
/// marker are not part of any segment; markers with no dialogue produce
/// nothing.
pub fn parse_show(content: &str, file: &str, date: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut current: Option<OpenSegment> = None;

    let close = |open: OpenSegment, out: &mut Vec<Segment>| {
        if open.parts.is_empty() {
            return;
        }
        out.push(Segment {
            file: file.to_string(),
            line_offset: open.line_offset,
            date: date.to_string(),
            text_content: open.parts.join(" "),
            content_type: ContentType::Show,
            start_seconds: open.start_seconds,
        });
    };

    for (idx, line) in content.lines().enumerate() {
        if let Some(caps) = marker_re().captures(line) {
            if let Some(open) = current.take() {
                close(open, &mut segments);
            }
            let mut parts = Vec::new();
            let trailing = caps[2].trim();
            if !trailing.is_empty() {
                parts.push(trailing.to_string());
            }
            current = Some(OpenSegment {
                line_offset: idx,
                start_seconds: parse_clock(&caps[1]),
                parts,
            });
            continue;
        }

        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        if let Some(open) = current.as_mut() {
            open.parts.push(text.to_string());
        }
    }

    if let Some(open) = current.take() {
        close(open, &mut segments);
    }

    segments
}
