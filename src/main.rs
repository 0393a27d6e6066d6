use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::converter::PandocConverter;
use crate::error::{ConversionError, PublishError};
use crate::ghost::{AdminApiKey, ApiVersion, GhostPublisher, PublishedPost};
use crate::pipeline::RunSummary;
use crate::post::{PostDraft, PostStatus};

/// Publish a directory of tagged Markdown files to Ghost.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Root directory holding one sub-directory per tag
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Status for every created post: draft, published or scheduled
    #[arg(short, long)]
    status: Option<PostStatus>,
}

// Pipeline stage traits
#[async_trait]
pub trait MarkdownConversion {
    async fn convert(&self, markdown_path: &Path) -> Result<String, ConversionError>;
}

#[async_trait]
pub trait PostPublishing {
    async fn publish(&self, draft: &PostDraft) -> Result<PublishedPost, PublishError>;
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let outcome = run(Cli::parse()).await;
    if let Err(e) = &outcome {
        error!("{:#}", e);
    }
    ExitCode::from(exit_code(&outcome))
}

/// 0 when every file was published, 2 when some were skipped or failed,
/// 1 when the run could not complete.
fn exit_code(outcome: &Result<RunSummary>) -> u8 {
    match outcome {
        Ok(summary) if summary.is_clean() => 0,
        Ok(_) => 2,
        Err(_) => 1,
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("md2ghost=info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<RunSummary> {
    // Load configuration
    let mut config = config::Config::new()?;
    if let Some(data_dir) = cli.data_dir {
        config.input.data_path = data_dir;
    }
    if let Some(status) = cli.status {
        config.publish.status = status;
    }

    // Initialize stages
    let converter = PandocConverter::new(&config.converter.program, config.converter.timeout());

    let key: AdminApiKey = config
        .ghost
        .admin_api_key
        .parse()
        .context("GHOST_ADMIN_API_KEY is invalid")?;
    let publisher = GhostPublisher::new(
        &config.ghost.api_url,
        key,
        ApiVersion::parse(&config.ghost.api_version),
        config.ghost.timeout(),
    )?;

    info!(
        data_dir = %config.input.data_path.display(),
        status = %config.publish.status,
        "Publishing Markdown posts"
    );

    let summary = pipeline::publish_all(
        markdown::find_tagged_files(&config.input.data_path),
        &converter,
        &publisher,
        config.publish.status,
    )
    .await
    .context("Error reading data directory")?;

    info!("Done: {}", summary);
    Ok(summary)
}

// Implementation modules
mod config;
mod converter;
mod error;
mod ghost;
mod markdown;
mod pipeline;
mod post;
