use super::*;
use crate::indexer::{BuildStatus, IndexBuilder};
use std::collections::HashSet;
use std::path::Path;
use tempfile::TempDir;
use tokio::sync::RwLock;

const SHOW_0614: &str = "\
[00:00:00.000 --> 00:00:05.000]
Rick welcomes everyone to the show.
[00:00:05.000 --> 00:00:10.000]
Suds brought the snacks today.
[00:00:10.000 --> 00:00:15.000]
George called in about the weather.
";

const SHOW_0615: &str = "\
[00:00:00.000 --> 00:00:05.000]
Rick talks about his dancing lessons.
";

const SHOW_2000: &str = "\
[00:00:00.000 --> 00:00:05.000]
Suds rings in the new year.
";

const BEST_OF_1999: &str = "\
# Best of 1999
https://youtu.be/best
0:30 Rick and Suds sing together
";

const LINKS_CSV: &str = "\
date,initiator,video_url,notes,info,host,custom_title
1999-06-14,Rick,https://youtu.be/rick0614,,,Rick,Snack Day
";

const SHOW_0614_PATH: &str = "timestamps/1999/rick_19990614.txt";

struct Fixture {
    _temp: TempDir,
    data_root: PathBuf,
    engine: QueryEngine,
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

async fn fixture(extra: &[(&str, String)]) -> Fixture {
    let temp = TempDir::new().unwrap();
    let data_root = temp.path().join("data");
    write(&data_root, SHOW_0614_PATH, SHOW_0614);
    write(&data_root, "timestamps/1999/rick_19990615.txt", SHOW_0615);
    write(&data_root, "timestamps/2000/guest_20000101.txt", SHOW_2000);
    write(&data_root, "best_of/1999 Best Of.md", BEST_OF_1999);
    write(&data_root, "links.csv", LINKS_CSV);
    for (rel, content) in extra {
        write(&data_root, rel, content);
    }

    let config = Arc::new(Config {
        data_root: data_root.clone(),
        database_path: temp.path().join("index.db"),
        metadata_csv: Some(data_root.join("links.csv")),
        ..Config::default()
    });
    let db = Arc::new(Database::new(&config.database_path).unwrap());
    let status = Arc::new(RwLock::new(BuildStatus::default()));
    IndexBuilder::new(db.clone(), config.clone(), status)
        .unwrap()
        .run()
        .await
        .unwrap();

    Fixture {
        _temp: temp,
        data_root,
        engine: QueryEngine::new(db, &config),
    }
}

fn request(query: &str) -> SearchRequest {
    SearchRequest {
        query: query.to_string(),
        ..SearchRequest::default()
    }
}

fn search(fx: &Fixture, req: &SearchRequest) -> SearchOutcome {
    fx.engine.search(req, &BuildStatus::complete()).unwrap()
}

fn mode_of(outcome: &SearchOutcome) -> Option<IndexKind> {
    match outcome {
        SearchOutcome::Results { mode, .. } => *mode,
        SearchOutcome::Indexing { .. } => None,
    }
}

fn files(outcome: &SearchOutcome) -> HashSet<String> {
    outcome.hits().iter().map(|h| h.file.clone()).collect()
}

#[tokio::test]
async fn test_not_ready_reports_progress() {
    let fx = fixture(&[]).await;
    let status = BuildStatus {
        state: BuildState::Building,
        total_files: 4,
        processed_files: 2,
        ..BuildStatus::default()
    };
    let outcome = fx.engine.search(&request("rick"), &status).unwrap();
    assert!(matches!(
        outcome,
        SearchOutcome::Indexing {
            progress_percent: 50
        }
    ));
}

#[tokio::test]
async fn test_blank_and_malformed_queries_are_empty() {
    let fx = fixture(&[]).await;
    for query in ["", "   ", "\"rick", "AND"] {
        let outcome = search(&fx, &request(query));
        assert!(outcome.hits().is_empty(), "query {:?}", query);
        assert_eq!(mode_of(&outcome), None, "query {:?}", query);
    }
}

#[tokio::test]
async fn test_operator_characters_do_not_error() {
    let fx = fixture(&[]).await;
    for query in ["rick OR (", "NEAR(rick suds)", "suds*", "rick: -weather", "^x"] {
        assert!(
            fx.engine
                .search(&request(query), &BuildStatus::complete())
                .is_ok(),
            "query {:?}",
            query
        );
    }
}

#[tokio::test]
async fn test_stemmed_match() {
    let fx = fixture(&[]).await;
    let outcome = search(&fx, &request("dance"));
    assert_eq!(mode_of(&outcome), Some(IndexKind::Exact));
    assert_eq!(outcome.hits().len(), 1);
    assert_eq!(outcome.hits()[0].file, "timestamps/1999/rick_19990615.txt");
}

#[tokio::test]
async fn test_and_restricts_to_files_with_both() {
    let fx = fixture(&[]).await;
    let outcome = search(&fx, &request("Rick AND Suds"));
    assert_eq!(mode_of(&outcome), Some(IndexKind::Exact));
    assert_eq!(outcome.hits().len(), 2);
    assert_eq!(
        files(&outcome),
        HashSet::from([SHOW_0614_PATH.to_string()])
    );
}

#[tokio::test]
async fn test_jorge_finds_george() {
    let fx = fixture(&[]).await;
    let outcome = search(&fx, &request("jorge"));
    assert_eq!(mode_of(&outcome), Some(IndexKind::Exact));
    assert_eq!(outcome.hits().len(), 1);
    assert_eq!(outcome.hits()[0].line_offset, 4);
}

#[tokio::test]
async fn test_misspelling_falls_back_to_fuzzy() {
    let fx = fixture(&[]).await;
    let outcome = search(&fx, &request("Sudds"));
    assert_eq!(mode_of(&outcome), Some(IndexKind::Fuzzy));
    assert_eq!(
        files(&outcome),
        HashSet::from([
            SHOW_0614_PATH.to_string(),
            "timestamps/2000/guest_20000101.txt".to_string(),
        ])
    );
}

#[tokio::test]
async fn test_verbatim_never_falls_back() {
    let fx = fixture(&[]).await;
    let outcome = search(&fx, &request("\"Sudds\""));
    assert_eq!(mode_of(&outcome), Some(IndexKind::Exact));
    assert!(outcome.hits().is_empty());

    let outcome = search(&fx, &request("\"Suds brought\""));
    assert_eq!(outcome.hits().len(), 1);
}

#[tokio::test]
async fn test_short_query_never_falls_back() {
    let fx = fixture(&[]).await;
    let outcome = search(&fx, &request("zq"));
    assert_eq!(mode_of(&outcome), Some(IndexKind::Exact));
    assert!(outcome.hits().is_empty());
}

#[tokio::test]
async fn test_year_filter() {
    let fx = fixture(&[]).await;
    let mut req = request("Suds");
    req.years = vec![2000];
    let outcome = search(&fx, &req);
    assert_eq!(outcome.hits().len(), 1);
    assert!(outcome.hits()[0].date.starts_with("2000-"));

    req.years = vec![1999, 2000];
    let outcome = search(&fx, &req);
    assert_eq!(outcome.hits().len(), 2);
    assert!(outcome
        .hits()
        .iter()
        .all(|h| h.date.starts_with("1999-") || h.date.starts_with("2000-")));

    req.years = vec![2005];
    assert!(search(&fx, &req).hits().is_empty());
}

#[tokio::test]
async fn test_content_type_and_best_of_decoration() {
    let fx = fixture(&[]).await;
    let mut req = request("Suds");
    req.content_type = ContentType::BestOf;
    let outcome = search(&fx, &req);
    assert_eq!(outcome.hits().len(), 1);

    let hit = &outcome.hits()[0];
    assert_eq!(hit.content_type, ContentType::BestOf);
    assert_eq!(hit.date, "1999-12-31");
    assert_eq!(hit.custom_title.as_deref(), Some("Best of 1999"));
    assert_eq!(hit.video_url.as_deref(), Some("https://youtu.be/best"));
    assert_eq!(hit.deep_link.as_deref(), Some("https://youtu.be/best?t=30s"));
}

#[tokio::test]
async fn test_link_decoration_and_context() {
    let fx = fixture(&[]).await;
    let outcome = search(&fx, &request("snacks"));
    assert_eq!(outcome.hits().len(), 1);

    let hit = &outcome.hits()[0];
    assert_eq!(hit.host.as_deref(), Some("Rick"));
    assert_eq!(hit.custom_title.as_deref(), Some("Snack Day"));
    assert_eq!(hit.deep_link.as_deref(), Some("https://youtu.be/rick0614?t=5s"));
    assert!(hit.snippet.contains("<mark>"));
    // Context runs from the marker line to the end of the file
    assert!(hit.text.starts_with("[00:00:05.000 --> 00:00:10.000]"));
    assert!(hit.text.contains("George called in about the weather."));
}

#[tokio::test]
async fn test_context_falls_back_to_indexed_text() {
    let fx = fixture(&[]).await;
    std::fs::remove_file(fx.data_root.join(SHOW_0614_PATH)).unwrap();

    let outcome = search(&fx, &request("snacks"));
    assert_eq!(outcome.hits()[0].text, "Suds brought the snacks today.");
}

#[tokio::test]
async fn test_pagination_is_disjoint() {
    let long: String = (0..150)
        .map(|i| {
            format!(
                "[00:{:02}:{:02}.000 --> 00:{:02}:{:02}.000]\nramble number {}\n",
                i / 60,
                i % 60,
                i / 60,
                i % 60,
                i
            )
        })
        .collect();
    let fx = fixture(&[("timestamps/2001/rick_20010101.txt", long)]).await;

    let first = search(&fx, &request("ramble"));
    let mut req = request("ramble");
    req.offset = PAGE_SIZE;
    let second = search(&fx, &req);

    assert_eq!(first.hits().len(), 100);
    assert_eq!(second.hits().len(), 50);
    assert!(matches!(first, SearchOutcome::Results { has_more: true, .. }));
    assert!(matches!(
        second,
        SearchOutcome::Results {
            has_more: false,
            offset: 100,
            ..
        }
    ));

    let first_ids: HashSet<&str> = first.hits().iter().map(|h| h.id.as_str()).collect();
    assert!(second.hits().iter().all(|h| !first_ids.contains(h.id.as_str())));
}

#[tokio::test]
async fn test_paging_past_exact_results_stays_exact() {
    let segment = |i: usize, word: &str| {
        format!(
            "[00:{:02}:{:02}.000 --> 00:{:02}:{:02}.000]\n{} number {}\n",
            i / 60,
            i % 60,
            i / 60,
            i % 60,
            word,
            i
        )
    };
    let exact: String = (0..100).map(|i| segment(i, "ramble")).collect();
    let misspelt: String = (0..50).map(|i| segment(i, "rambel")).collect();
    let fx = fixture(&[
        ("timestamps/2001/rick_20010101.txt", exact),
        ("timestamps/2001/rick_20010102.txt", misspelt),
    ])
    .await;

    let first = search(&fx, &request("ramble"));
    assert_eq!(mode_of(&first), Some(IndexKind::Exact));
    assert_eq!(first.hits().len(), 100);

    let mut req = request("ramble");
    req.offset = PAGE_SIZE;
    let second = search(&fx, &req);
    assert_eq!(mode_of(&second), Some(IndexKind::Exact));
    assert!(second.hits().is_empty());
    assert!(matches!(second, SearchOutcome::Results { has_more: false, .. }));
}

#[tokio::test]
async fn test_punctuation_token_keeps_exact_match() {
    let fx = fixture(&[]).await;
    let outcome = search(&fx, &request("snacks &"));
    assert_eq!(mode_of(&outcome), Some(IndexKind::Exact));
    assert_eq!(outcome.hits().len(), 1);

    let outcome = search(&fx, &request("Rick - Suds"));
    assert_eq!(mode_of(&outcome), Some(IndexKind::Exact));
    assert!(!outcome.hits().is_empty());
}

#[tokio::test]
async fn test_failed_build_returns_empty() {
    let fx = fixture(&[]).await;
    let status = BuildStatus {
        state: BuildState::Failed,
        last_error: Some("disk full".into()),
        ..BuildStatus::default()
    };
    let outcome = fx.engine.search(&request("rick"), &status).unwrap();
    assert!(outcome.hits().is_empty());
}
