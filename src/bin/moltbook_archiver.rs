use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use molt_archiver::archive::MoltbookArchiver;
use molt_archiver::config;
use molt_archiver::fetch::HttpFetcher;
use molt_archiver::persist::Persister;

#[derive(Debug, Parser)]
#[command(author, version, about = "Archive moltbook submolts and posts into local files")]
struct Args {
    /// Path to YAML config file (built-in defaults when omitted)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("molt_archiver=info".parse()?))
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(args.config.as_deref())?;
    cfg.ensure_dirs().context("failed to create archive directories")?;

    let fetcher = HttpFetcher::new(&cfg.moltbook.user_agent, cfg.http.timeout())?;
    let persister = Persister::from_config(&cfg.archive);
    let archiver = MoltbookArchiver::from_config(&cfg, &fetcher, &persister)?;

    let run = archiver.run().await;
    info!(
        submolts = run.submolts.len(),
        posts = run.posts.len(),
        "done"
    );
    Ok(())
}
