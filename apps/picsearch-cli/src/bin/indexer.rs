use std::path::PathBuf;

use clap::Parser;
use picsearch_cli::{describe_failure, index_dir, init_tracing, load_settings};
use picsearch_core::config::resolve_with_base;
use picsearch_hybrid::{ArtifactStore, Collaborators, IndexBuilder};

/// Build a new generation of the picture index and make it active.
#[derive(Parser)]
#[command(name = "picsearch-indexer", version, about)]
struct Cli {
    /// Image directory (default: data.image_dir)
    image_dir: Option<PathBuf>,

    /// Index directory (default: data.index_dir)
    #[arg(long)]
    index_dir: Option<PathBuf>,

    /// Hide the progress bar
    #[arg(long)]
    quiet: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let (settings, base) = load_settings()?;
    let image_dir = cli.image_dir.unwrap_or_else(|| resolve_with_base(&base, &settings.data.image_dir));
    let index_dir = index_dir(cli.index_dir.as_deref(), &settings, &base);
    tracing::info!(images = %image_dir.display(), index = %index_dir.display(), "indexing");

    let collaborators = Collaborators::from_settings(&settings)?;
    let builder = IndexBuilder::new(collaborators, ArtifactStore::new(&index_dir), &settings).with_progress(!cli.quiet);
    let report = builder.build(&image_dir).await?;

    println!("corpus version:    {}", report.corpus_version);
    println!("documents indexed: {}", report.documents_indexed);
    println!("documents skipped: {}", report.documents_skipped);
    println!("duration:          {} ms", report.duration_ms);
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
