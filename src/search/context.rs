//! Widens a hit to the surrounding lines of its source file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Lines shown after the hit's own line
pub const CONTEXT_LINES_AFTER: usize = 6;

/// Reads source files at most once per request
pub struct ContextReader {
    data_root: PathBuf,
    cache: HashMap<String, Option<Vec<String>>>,
}

impl ContextReader {
    pub fn new(data_root: &Path) -> Self {
        Self {
            data_root: data_root.to_path_buf(),
            cache: HashMap::new(),
        }
    }

    /// Lines `line_offset..=line_offset + 6` of `file`, clamped to the end of
    /// the file. `None` when the file is unreadable or the offset is past it.
    pub fn window(&mut self, file: &str, line_offset: i64) -> Option<String> {
        let start = usize::try_from(line_offset).ok()?;
        let data_root = &self.data_root;
        let lines = self
            .cache
            .entry(file.to_string())
            .or_insert_with(|| match std::fs::read_to_string(data_root.join(file)) {
                Ok(content) => Some(content.lines().map(|l| l.trim_end().to_string()).collect()),
                Err(e) => {
                    log::warn!("Context unavailable for {}: {}", file, e);
                    None
                }
            })
            .as_ref()?;

        if start >= lines.len() {
            return None;
        }
        let end = (start + CONTEXT_LINES_AFTER).min(lines.len() - 1);
        Some(lines[start..=end].join("\n"))
    }
}

/// `video_url` positioned at `seconds`
pub fn deep_link(video_url: &str, seconds: i64) -> String {
    let separator = if video_url.contains('?') { '&' } else { '?' };
    format!("{}{}t={}s", video_url, separator, seconds.max(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, ContextReader) {
        let temp = TempDir::new().unwrap();
        let content: String = (0..10).map(|i| format!("line {}\n", i)).collect();
        std::fs::create_dir_all(temp.path().join("timestamps")).unwrap();
        std::fs::write(temp.path().join("timestamps/a.txt"), content).unwrap();
        let reader = ContextReader::new(temp.path());
        (temp, reader)
    }

    #[test]
    fn test_window_spans_seven_lines() {
        let (_temp, mut reader) = fixture();
        let window = reader.window("timestamps/a.txt", 2).unwrap();
        assert_eq!(window.lines().count(), 7);
        assert!(window.starts_with("line 2"));
        assert!(window.ends_with("line 8"));
    }

    #[test]
    fn test_window_clamped_at_eof() {
        let (_temp, mut reader) = fixture();
        assert_eq!(reader.window("timestamps/a.txt", 8).unwrap(), "line 8\nline 9");
        assert_eq!(reader.window("timestamps/a.txt", 10), None);
        assert_eq!(reader.window("timestamps/a.txt", -1), None);
    }

    #[test]
    fn test_missing_file() {
        let (_temp, mut reader) = fixture();
        assert_eq!(reader.window("timestamps/gone.txt", 0), None);
    }

    #[test]
    fn test_deep_link() {
        assert_eq!(deep_link("https://youtu.be/x", 90), "https://youtu.be/x?t=90s");
        assert_eq!(
            deep_link("https://www.youtube.com/watch?v=abc", 5),
            "https://www.youtube.com/watch?v=abc&t=5s"
        );
    }
}
