use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;

use port_sweep::output::{render_results, save_results, write_json_file};
use port_sweep::progress::{ConsoleProgress, NoProgress};
use port_sweep::{logging, ScanError, ScanRequest, Scanner};

/// port-sweep — concurrent TCP connect scanner for a single host.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "port-sweep",
    version,
    about = "Concurrent TCP connect scanner for a port range on one host.",
    long_about = None
)]
struct Cli {
    /// Target host (e.g., 'localhost' or '127.0.0.1').
    #[arg(short = 't', long)]
    target: String,

    /// Starting port.
    #[arg(short = 's', long)]
    start: String,

    /// Ending port.
    #[arg(short = 'e', long)]
    end: String,

    /// Number of concurrent workers.
    #[arg(short = 'n', long, default_value_t = 100)]
    threads: usize,

    /// Print every port as it is scanned.
    #[arg(short = 'v', long, default_value_t = false)]
    verbose: bool,

    /// Socket connect timeout in milliseconds.
    #[arg(long = "timeout-ms", default_value_t = 1000)]
    timeout_ms: u64,

    /// Progress bar refresh interval in milliseconds.
    #[arg(long = "progress-interval-ms", default_value_t = 100)]
    progress_interval_ms: u64,

    /// Append-only scan log.
    #[arg(long = "log-file", default_value = "port_scan.log")]
    log_file: PathBuf,

    /// Directory receiving scan_results_<host>.csv.
    #[arg(long = "output-dir", default_value = ".")]
    output_dir: PathBuf,

    /// Also write the full report as pretty JSON to this path.
    #[arg(long)]
    json: Option<PathBuf>,

    /// Disable the progress bar.
    #[arg(long = "no-progress", default_value_t = false)]
    no_progress: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    logging::init(&cli.log_file, cli.verbose)?;

    let req = match ScanRequest::parse(cli.target.clone(), &cli.start, &cli.end) {
        Ok(req) => req
            .threads(cli.threads)
            .timeout(Duration::from_millis(cli.timeout_ms)),
        Err(e) => {
            tracing::warn!("Invalid port range: {}-{}: {e}", cli.start, cli.end);
            eprintln!("Error: {e}");
            return Ok(ExitCode::FAILURE);
        }
    };

    // Ctrl-C stops the workers; whatever was found so far is still reported.
    let cancel = CancellationToken::new();
    let cancel_ctrlc = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel_ctrlc.cancel();
        }
    });

    let scanner = Scanner::new()
        .with_poll_interval(Duration::from_millis(cli.progress_interval_ms))
        .with_cancel(cancel);

    // Per-port debug lines and a redrawn bar would interleave.
    let show_progress = !cli.no_progress && !cli.verbose;
    let result = if show_progress {
        scanner.scan_with_progress(&req, ConsoleProgress::new).await
    } else {
        scanner.scan_with_progress(&req, |_| NoProgress).await
    };

    let report = match result {
        Ok(r) => r,
        Err(ScanError::Rejected(e)) => {
            eprintln!("Error: {e}");
            return Ok(ExitCode::FAILURE);
        }
    };

    println!("{}", render_results(&report));
    if report.cancelled {
        println!(
            "Scan interrupted: {} of {} ports scanned.",
            report.scanned, report.total
        );
    }

    if let Some(path) = save_results(&cli.output_dir, &report)? {
        println!("Results saved to {}", path.display());
    }
    if let Some(path) = cli.json.as_deref() {
        write_json_file(path, &report)
            .context("scan finished but the JSON report was not written")?;
        println!("Wrote JSON report to {}", path.display());
    }

    Ok(ExitCode::SUCCESS)
}
