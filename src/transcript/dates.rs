//! Air dates encoded in source file names.

use crate::database::UNKNOWN_DATE;
use chrono::NaiveDate;
use regex::Regex;
use std::sync::OnceLock;

/// Best-of compilations are pinned to the last day of their year so they
/// never share a date key with a daily show.
const BEST_OF_MONTH_DAY: &str = "12-31";

fn best_of_year_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{4})").expect("valid best-of year regex"))
}

/// Extracts show dates from names like `Rick_19990614.txt` or
/// `guest-host 20010203.txt`.
#[derive(Debug, Clone)]
pub struct DateExtractor {
    show_re: Regex,
}

impl DateExtractor {
    pub fn new(host_prefixes: &[String]) -> Result<Self, regex::Error> {
        let alternatives = host_prefixes
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join("|");
        let show_re = Regex::new(&format!(r"(?i)(?:{})\D*(\d{{8}})", alternatives))?;
        Ok(Self { show_re })
    }

    /// `YYYY-MM-DD` for a show file name, or the unknown-date sentinel
    pub fn show_date(&self, file_name: &str) -> String {
        self.show_re
            .captures(file_name)
            .and_then(|caps| NaiveDate::parse_from_str(&caps[1], "%Y%m%d").ok())
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| UNKNOWN_DATE.to_string())
    }
}

/// `YYYY-12-31` for a best-of file name starting with a year, or the
/// unknown-date sentinel
pub fn best_of_date(file_name: &str) -> String {
    best_of_year_re()
        .captures(file_name)
        .map(|caps| format!("{}-{}", &caps[1], BEST_OF_MONTH_DAY))
        .unwrap_or_else(|| UNKNOWN_DATE.to_string())
}

/// Seconds for `H:MM:SS`, `M:SS` or `HH:MM:SS.mmm`; fractions are dropped
pub fn parse_clock(s: &str) -> Option<u32> {
    let whole = s.trim().split(['.', ',']).next()?;
    let parts: Vec<&str> = whole.split(':').collect();
    match parts.len() {
        3 => {
            let hours: u32 = parts[0].parse().ok()?;
            let minutes: u32 = parts[1].parse().ok()?;
            let seconds: u32 = parts[2].parse().ok()?;
            Some(hours * 3600 + minutes * 60 + seconds)
        }
        2 => {
            let minutes: u32 = parts[0].parse().ok()?;
            let seconds: u32 = parts[1].parse().ok()?;
            Some(minutes * 60 + seconds)
        }
        _ => None,
    }
}
