use clap::Parser;
use show_archive_lib::commands::{self, parse_years};
use show_archive_lib::config::Config;
use show_archive_lib::database::ContentType;
use show_archive_lib::search::SearchRequest;
use show_archive_lib::AppState;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "show-archive")]
#[command(version, about = "Index and search the show transcript archive", long_about = None)]
struct Cli {
    /// Configuration file (defaults to config.yaml in the data directory)
    #[arg(short, long, env = "SHOW_ARCHIVE_CONFIG")]
    config: Option<PathBuf>,

    /// Rebuild the index even when it is current
    #[arg(long)]
    reindex: bool,

    /// Comma-separated years, e.g. 1999,2000
    #[arg(long)]
    years: Option<String>,

    /// Content type to search: show or best_of
    #[arg(long = "type", default_value = "show")]
    content_type: ContentType,

    #[arg(long, default_value_t = 0)]
    offset: i64,

    /// Query words; without them the build status is printed
    query: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "show_archive=info".into()),
        )
        .init();

    let mut config = Config::load(cli.config.as_deref())?;
    if cli.reindex {
        config.force_reindex = true;
    }

    let state = AppState::bootstrap(config).await?;
    if let Some(Err(e)) = state.wait_for_build().await {
        tracing::error!("Index build failed: {}", e);
    }

    if cli.query.is_empty() {
        let status = commands::build_status(&state).await;
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    let request = SearchRequest {
        query: cli.query.join(" "),
        years: cli.years.as_deref().map(parse_years).unwrap_or_default(),
        content_type: cli.content_type,
        offset: cli.offset,
    };
    let outcome = commands::search(&state, request).await?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);

    Ok(())
}
