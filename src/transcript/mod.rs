//! Source file discovery and parsing into indexable segments.

pub mod best_of;
pub mod dates;
pub mod show;

use crate::config::Config;
use crate::database::{ContentType, Episode, Segment};
use crate::error::IndexError;
use dates::DateExtractor;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A transcript on disk, with its path relative to the data root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub relative: String,
    pub content_type: ContentType,
}

/// Everything one source file contributes to the index
#[derive(Debug, Clone)]
pub struct ParsedFile {
    pub episode: Episode,
    pub segments: Vec<Segment>,
}

pub struct TranscriptParser {
    dates: DateExtractor,
}

impl TranscriptParser {
    pub fn new(host_prefixes: &[String]) -> Result<Self, regex::Error> {
        Ok(Self {
            dates: DateExtractor::new(host_prefixes)?,
        })
    }

    /// Read and parse one file. A read failure is returned to the caller,
    /// which skips the file.
    pub fn parse_file(&self, source: &SourceFile) -> Result<ParsedFile, IndexError> {
        let content =
            std::fs::read_to_string(&source.path).map_err(|e| IndexError::SourceRead {
                path: source.path.clone(),
                source: e,
            })?;
        Ok(self.parse_content(source, &content))
    }

    pub fn parse_content(&self, source: &SourceFile, content: &str) -> ParsedFile {
        let file_name = source
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        match source.content_type {
            ContentType::Show => {
                let date = self.dates.show_date(&file_name);
                let segments = show::parse_show(content, &source.relative, &date);
                ParsedFile {
                    episode: Episode {
                        file: source.relative.clone(),
                        date,
                        content_type: ContentType::Show,
                        video_url: None,
                        custom_title: None,
                        segment_count: segments.len(),
                    },
                    segments,
                }
            }
            ContentType::BestOf => {
                let date = dates::best_of_date(&file_name);
                let parsed = best_of::parse_best_of(content, &source.relative, &date);
                ParsedFile {
                    episode: Episode {
                        file: source.relative.clone(),
                        date,
                        content_type: ContentType::BestOf,
                        video_url: parsed.video_url,
                        custom_title: parsed.title,
                        segment_count: parsed.segments.len(),
                    },
                    segments: parsed.segments,
                }
            }
        }
    }
}

/// Forward-slash path of `path` relative to `root`
pub fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    (!parts.is_empty()).then(|| parts.join("/"))
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy();
            extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext))
        })
        .unwrap_or(false)
}

fn collect_tree(
    root: &Path,
    data_root: &Path,
    extensions: &[String],
    content_type: ContentType,
    out: &mut Vec<SourceFile>,
) {
    if !root.is_dir() {
        log::warn!("Source directory {} does not exist", root.display());
        return;
    }

    for entry in WalkDir::new(root).follow_links(true) {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                log::warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                continue;
            }
        };
        if !entry.file_type().is_file() || !has_extension(entry.path(), extensions) {
            continue;
        }
        if let Some(relative) = relative_path(data_root, entry.path()) {
            out.push(SourceFile {
                path: entry.path().to_path_buf(),
                relative,
                content_type,
            });
        }
    }
}

/// Every show and best-of file under the configured roots, sorted by
/// relative path so builds are deterministic
pub fn discover_sources(config: &Config) -> Vec<SourceFile> {
    let mut sources = Vec::new();
    collect_tree(
        &config.shows_root(),
        &config.data_root,
        &config.show_extensions,
        ContentType::Show,
        &mut sources,
    );
    collect_tree(
        &config.best_of_root(),
        &config.data_root,
        &config.best_of_extensions,
        ContentType::BestOf,
        &mut sources,
    );
    sources.sort_by(|a, b| a.relative.cmp(&b.relative));
    sources
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config_for(root: &Path) -> Config {
        Config {
            data_root: root.to_path_buf(),
            ..Config::default()
        }
    }

    #[test]
    fn test_discover_filters_extensions() {
        let temp = TempDir::new().unwrap();
        let shows = temp.path().join("timestamps").join("1999");
        let best = temp.path().join("best_of");
        std::fs::create_dir_all(&shows).unwrap();
        std::fs::create_dir_all(&best).unwrap();
        std::fs::write(shows.join("rick_19990614.txt"), "").unwrap();
        std::fs::write(shows.join("notes.md"), "").unwrap();
        std::fs::write(best.join("1999 Best Of.md"), "").unwrap();
        std::fs::write(best.join("cover.jpg"), "").unwrap();

        let sources = discover_sources(&config_for(temp.path()));
        let rel: Vec<&str> = sources.iter().map(|s| s.relative.as_str()).collect();
        assert_eq!(
            rel,
            vec!["best_of/1999 Best Of.md", "timestamps/1999/rick_19990614.txt"]
        );
        assert_eq!(sources[0].content_type, ContentType::BestOf);
        assert_eq!(sources[1].content_type, ContentType::Show);
    }

    #[test]
    fn test_discover_missing_roots() {
        let temp = TempDir::new().unwrap();
        assert!(discover_sources(&config_for(temp.path())).is_empty());
    }

    #[test]
    fn test_parse_file_read_failure() {
        let parser = TranscriptParser::new(&["rick".to_string()]).unwrap();
        let source = SourceFile {
            path: PathBuf::from("/definitely/not/here/rick_19990614.txt"),
            relative: "timestamps/rick_19990614.txt".into(),
            content_type: ContentType::Show,
        };
        assert!(matches!(
            parser.parse_file(&source),
            Err(IndexError::SourceRead { .. })
        ));
    }

    #[test]
    fn test_parse_invalid_utf8_is_read_failure() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("rick_19990614.txt");
        std::fs::write(&path, [0xff, 0xfe, 0x00, 0x41]).unwrap();
        let parser = TranscriptParser::new(&["rick".to_string()]).unwrap();
        let source = SourceFile {
            path,
            relative: "timestamps/rick_19990614.txt".into(),
            content_type: ContentType::Show,
        };
        assert!(parser.parse_file(&source).is_err());
    }

    #[test]
    fn test_parse_content_builds_episode() {
        let parser = TranscriptParser::new(&["rick".to_string()]).unwrap();
        let source = SourceFile {
            path: PathBuf::from("/data/best_of/2001 Highlights.md"),
            relative: "best_of/2001 Highlights.md".into(),
            content_type: ContentType::BestOf,
        };
        let parsed = parser.parse_content(
            &source,
            "## Highlights 2001\nhttps://example.com/v\n0:10 hello\n",
        );
        assert_eq!(parsed.episode.date, "2001-12-31");
        assert_eq!(parsed.episode.custom_title.as_deref(), Some("Highlights 2001"));
        assert_eq!(parsed.episode.segment_count, 1);
        assert_eq!(parsed.segments[0].file, "best_of/2001 Highlights.md");
    }
}
