//! `romen-uploader`: send disc images to a ROMen server and wait until
//! each one is ingested.

mod config;
mod render;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing_subscriber::EnvFilter;

use romen_transfer::SourceFile;
use romen_upload_queue::{HttpIngestClient, QueueEvent, TaskStatus, UploadQueue};

use config::{Overrides, UploaderConfig};

/// How often the queue is checked for completion between events.
const FINISH_CHECK_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Parser)]
#[command(name = "romen-uploader")]
#[command(version, about = "Upload disc images to a ROMen ingestion server")]
struct Cli {
    /// Disc images to upload
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Server base URL
    #[arg(short, long)]
    server: Option<String>,

    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Milliseconds between job status requests
    #[arg(long)]
    poll_interval_ms: Option<u64>,

    /// Fail jobs still processing after this many seconds (0 = never)
    #[arg(long)]
    max_poll_secs: Option<u64>,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            server_url: self.server.clone(),
            poll_interval_ms: self.poll_interval_ms,
            max_poll_secs: self.max_poll_secs,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,romen=debug")),
        )
        .init();

    let cli = Cli::parse();
    let mut cfg = UploaderConfig::load(cli.config.as_deref())?;
    cfg.apply(cli.overrides());
    tracing::info!(server = %cfg.server_url, "using ingestion server");

    let client = HttpIngestClient::new(cfg.server_url.clone())
        .context("failed to build HTTP client")?;
    let queue = UploadQueue::new(Arc::new(client), cfg.queue_config());
    let mut events = queue
        .take_events()
        .context("queue event stream already taken")?;

    let mut sources = Vec::with_capacity(cli.files.len());
    for path in &cli.files {
        match SourceFile::open(path).await {
            Ok(source) => sources.push(source),
            Err(e) => tracing::warn!(path = %path.display(), "skipping: {e}"),
        }
    }
    if sources.is_empty() {
        anyhow::bail!("no readable disc images given");
    }
    queue.submit(sources);

    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("cannot listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };
    follow(&queue, &mut events, interrupt).await;

    let snaps = queue.snapshot();
    println!("{}", render::summary(&snaps));
    let cleared = queue.clear_completed();
    tracing::debug!(cleared, "cleared completed uploads");

    let failed: Vec<_> = snaps
        .iter()
        .filter(|s| s.status == TaskStatus::Failed)
        .collect();
    for snap in &failed {
        eprintln!("{}", render::render_line(snap));
    }
    if !failed.is_empty() {
        anyhow::bail!("{} upload(s) failed", failed.len());
    }
    Ok(())
}

/// Prints task changes until every task has finished or `interrupt` fires.
///
/// The event stream drops events when its buffer is full, so completion is
/// decided from snapshots taken on every event and every
/// [`FINISH_CHECK_INTERVAL`].
async fn follow(
    queue: &UploadQueue,
    events: &mut mpsc::Receiver<QueueEvent>,
    interrupt: impl Future<Output = ()>,
) {
    let mut check = tokio::time::interval(FINISH_CHECK_INTERVAL);
    check.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(interrupt);

    loop {
        tokio::select! {
            _ = &mut interrupt => {
                tracing::warn!("interrupted, cancelling unfinished uploads");
                queue.shutdown().await;
                return;
            }
            Some(event) = events.recv() => match event {
                QueueEvent::StatusChanged { identity, .. } => print_task(queue, &identity),
                QueueEvent::Progress { identity, percent } if percent % 10 == 0 => {
                    print_task(queue, &identity)
                }
                _ => {}
            },
            _ = check.tick() => {}
        }

        if all_finished(queue) {
            return;
        }
    }
}

fn all_finished(queue: &UploadQueue) -> bool {
    queue.snapshot().iter().all(|s| s.status.is_terminal())
}

fn print_task(queue: &UploadQueue, identity: &str) {
    if let Some(snap) = queue.get(identity) {
        println!("{}", render::render_line(&snap));
    }
}
