use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use scan_feed_rs::client::ScanApiClient;
use scan_feed_rs::config::{ClientConfig, DEFAULT_BASE_URL, DEFAULT_CONNECT_TIMEOUT_MS};
use scan_feed_rs::console::ScanConsole;
use scan_feed_rs::controller::ScanController;
use scan_feed_rs::logging;
use scan_feed_rs::render::{self, ConsoleObserver};
use scan_feed_rs::session::{ScanSession, SessionState};
use scan_feed_rs::stream::ChunkQueue;
use tokio_util::sync::CancellationToken;

/// scan-feed — follow a live scan feed and manage past scans on a scan server.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "scan-feed",
    version,
    about = "Follow a live scan feed and manage past scans on a scan server.",
    long_about = None
)]
struct Cli {
    /// Base URL of the scan server API.
    #[arg(long, global = true, default_value = DEFAULT_BASE_URL)]
    server: String,

    /// Connect timeout in milliseconds. An open stream is never timed out.
    #[arg(long = "connect-timeout-ms", global = true, default_value_t = DEFAULT_CONNECT_TIMEOUT_MS)]
    connect_timeout_ms: u64,

    /// Enable debug diagnostics on stderr (RUST_LOG overrides).
    #[arg(long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Start a scan and follow its progress until the stream ends (Ctrl+C aborts).
    Scan {
        /// Host, range or CIDR passed to the server as-is.
        target: String,
        /// Write the final session as pretty JSON to this path.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Fold a captured event feed from a file, as if it arrived over the network.
    Replay {
        file: PathBuf,
        /// Split the file into chunks of this many bytes (0 = one chunk).
        #[arg(long = "chunk-size", default_value_t = 0)]
        chunk_size: usize,
        #[arg(long, default_value = "replay")]
        target: String,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// List past scans.
    History,
    /// Show the hosts of a past scan.
    Show { id: String },
    /// Delete a past scan.
    Delete { id: String },
    /// Print the CSV download link of a past scan.
    ExportUrl { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose).context("failed to initialise logging")?;

    let config = ClientConfig::new(&cli.server)
        .with_connect_timeout(Duration::from_millis(cli.connect_timeout_ms));
    let client = ScanApiClient::new(config).context("failed to build HTTP client")?;

    match cli.command {
        Command::Scan { target, output } => {
            let mut console = ScanConsole::new(client);
            let cancel = cancel_on_ctrl_c();
            let mut observer = ConsoleObserver;
            let session = console.start_session(&target, cancel, &mut observer).await?;
            finish_session(&session, output.as_deref())?;
        }
        Command::Replay { file, chunk_size, target, output } => {
            let bytes = std::fs::read(&file)
                .with_context(|| format!("failed to read feed file: {}", file.display()))?;
            let controller = ScanController::new(client);
            let mut observer = ConsoleObserver;
            let session = controller
                .ingest(
                    &target,
                    ChunkQueue::split_every(&bytes, chunk_size),
                    cancel_on_ctrl_c(),
                    &mut observer,
                )
                .await?;
            finish_session(&session, output.as_deref())?;
        }
        Command::History => {
            let mut console = ScanConsole::new(client);
            console.reload_history().await.context("failed to load history")?;
            render::print_history(console.history());
        }
        Command::Show { id } => {
            let mut console = ScanConsole::new(client);
            console.reload_history().await.context("failed to load history")?;
            if console.select_history(&id).is_none() {
                bail!("no scan with id {id}");
            }
            render::print_view(console.view());
        }
        Command::Delete { id } => {
            let mut console = ScanConsole::new(client);
            console.reload_history().await.context("failed to load history")?;
            console
                .delete_history(&id)
                .await
                .with_context(|| format!("Delete failed for scan {id}"))?;
            println!("Deleted scan {id}.");
        }
        Command::ExportUrl { id } => {
            println!("{}", client.csv_export_url(&id)?);
        }
    }

    Ok(())
}

fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let cancel_ctrlc = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel_ctrlc.cancel();
        }
    });
    cancel
}

fn finish_session(session: &ScanSession, output: Option<&Path>) -> Result<()> {
    render::print_session(session);
    if let Some(path) = output {
        if let Err(e) = write_session_json(path, session) {
            eprintln!("Failed to write JSON to {}: {}", path.display(), e);
        } else {
            println!("Wrote JSON session to {}", path.display());
        }
    }
    if session.state == SessionState::Failed {
        bail!("scan of {} failed", session.target);
    }
    Ok(())
}

fn write_session_json(path: &Path, session: &ScanSession) -> Result<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, session)?;
    Ok(())
}
