//! dvid-transfer — move a dataset from one data-service node to another.

use std::fmt;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};

use dvid_transfer_core::{BlockShapePolicy, Dispatcher, StripCoverage, TransferConfig, TransferReport};

const AFTER_HELP: &str = "\
  where SRC = URL for the source data in form http://host/api/node/<uuid>/<dataname>
    and DST = URL for the destination.

  If the destination UUID doesn't already exist, there is an error.
  If the destination data name doesn't exist, it is created.";

/// dvid-transfer moves data from one DVID server to another using HTTP API calls.
#[derive(Parser, Debug)]
#[command(name = "dvid-transfer", version, after_help = AFTER_HELP)]
struct Cli {
    /// Source and destination data URLs.
    #[arg(value_name = "SRC DST")]
    endpoints: Vec<String>,

    /// Run in verbose mode.
    #[arg(short, long)]
    verbose: bool,

    /// Resolve and plan without moving any data.
    #[arg(long)]
    dry_run: bool,

    /// Config file (default: $DVID_TRANSFER_CONFIG or ~/.config/dvid-transfer/config.toml).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Largest payload, in bytes, for a single read/write exchange.
    #[arg(long, value_name = "BYTES")]
    byte_ceiling: Option<u64>,

    /// Emit exactly floor(size/ceiling)+1 bands per layer even if rows are left over.
    #[arg(long)]
    legacy_strips: bool,

    /// Fail instead of warning when X and Y block sizes differ.
    #[arg(long)]
    strict_blocks: bool,
}

impl Cli {
    fn load_config(&self) -> Result<TransferConfig> {
        let mut config = match &self.config {
            Some(path) => TransferConfig::load_from(path),
            None => TransferConfig::load(),
        }
        .context("failed to load config")?;

        if let Some(ceiling) = self.byte_ceiling {
            anyhow::ensure!(ceiling > 0, "--byte-ceiling must be positive");
            config.byte_ceiling = ceiling;
        }
        if self.legacy_strips {
            config.strip_coverage = StripCoverage::Legacy;
        }
        if self.strict_blocks {
            config.block_shape = BlockShapePolicy::Reject;
        }
        Ok(config)
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
}

fn print_report(report: &TransferReport) {
    println!("═══════════════════════════════════════");
    if report.dry_run {
        println!("  Transfer Plan (dry run)");
    } else {
        println!("  Transfer Complete");
    }
    println!("═══════════════════════════════════════");
    println!("  Source type : {}", report.source_type);
    println!("  Strategy    : {}", report.strategy);
    println!("  Exchanges   : {}", report.exchanges);
    println!(
        "  Bytes       : {} ({:.1} MB)",
        report.bytes,
        report.bytes as f64 / (1024.0 * 1024.0)
    );
}

/// The one line a fatal error is reported as: `error: <operation>: <cause>`.
fn error_line(err: impl fmt::Display) -> String {
    format!("error: {err}")
}

fn fail(err: impl fmt::Display) -> ! {
    eprintln!("{}", error_line(err));
    std::process::exit(1);
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Wrong argument count shows usage and exits cleanly.
    let [src, dst] = cli.endpoints.as_slice() else {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    init_tracing(cli.verbose);
    let config = cli
        .load_config()
        .unwrap_or_else(|err| fail(format!("{err:#}")));
    tracing::debug!(?config, "configuration");

    match Dispatcher::new(config)
        .dry_run(cli.dry_run)
        .dispatch(src, dst)
        .await
    {
        Ok(report) => print_report(&report),
        Err(err) => {
            tracing::debug!(%src, %dst, error = ?err, "transfer failed");
            fail(err)
        }
    }
    Ok(())
}
