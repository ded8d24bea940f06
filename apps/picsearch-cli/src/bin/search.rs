use std::path::PathBuf;

use clap::Parser;
use picsearch_cli::{describe_failure, format_results, index_dir, init_tracing, load_settings};
use picsearch_hybrid::{ArtifactStore, Collaborators, SearchService};

/// Search the active picture index.
#[derive(Parser)]
#[command(name = "picsearch-search", version, about)]
struct Cli {
    /// Search query
    query: String,

    /// Number of results (default: search.default_limit)
    #[arg(short = 'k', long)]
    limit: Option<usize>,

    /// Output results as JSON
    #[arg(long)]
    json: bool,

    /// Print absolute image paths instead of paths relative to the image root
    #[arg(long)]
    absolute: bool,

    /// Index directory (default: data.index_dir)
    #[arg(long)]
    index_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let (settings, base) = load_settings()?;
    let index_dir = index_dir(cli.index_dir.as_deref(), &settings, &base);
    let k = cli.limit.unwrap_or(settings.search.default_limit);

    let collaborators = Collaborators::from_settings(&settings)?;
    let service = SearchService::from_settings(ArtifactStore::new(&index_dir), &collaborators, &settings);
    let version = service.load().await?;
    tracing::debug!(version = %version, k, "searching");

    let mut results = service.search(&cli.query, k).await?;
    if cli.absolute {
        for result in &mut results {
            result.path = service.absolute_path(&result.path)?.display().to_string();
        }
    }
    println!("{}", format_results(&results, cli.json)?);
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    if let Err(err) = run(cli).await {
        let (kind, message) = describe_failure(&err);
        eprintln!("error[{}]: {}", kind, message);
        std::process::exit(1);
    }
}
