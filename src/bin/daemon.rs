//! syncdir Daemon Binary
//!
//! Opens a directory and keeps it reconciled: every interval it retries the
//! relational connection, replays queued writes and re-imports the snapshot.

use std::path::PathBuf;
use std::thread;

use clap::{Parser, ValueEnum};
use syncdir::{Config, DeletedAccountPolicy, Delimiter, Directory, DivergencePolicy};
use tracing_subscriber::{fmt, EnvFilter};

/// syncdir Daemon
#[derive(Parser, Debug)]
#[command(name = "syncdir-daemon")]
#[command(about = "Keeps the account stores and snapshot in sync")]
#[command(version)]
struct Args {
    /// SQLite database file
    #[arg(short, long, default_value = "./syncdir_data/accounts.db")]
    database: PathBuf,

    /// Snapshot file
    #[arg(short, long, default_value = "./accounts.txt")]
    snapshot: PathBuf,

    /// Seconds between reconciliation passes
    #[arg(short, long, default_value = "30")]
    interval_secs: u64,

    /// Connect timeout in milliseconds
    #[arg(long, default_value = "3000")]
    connect_timeout_ms: u64,

    /// Delimiter written to the snapshot
    #[arg(long, value_enum, default_value_t = DelimiterArg::Pipe)]
    delimiter: DelimiterArg,

    /// Resolution of relational vs fallback disagreements
    #[arg(long, value_enum, default_value_t = DivergenceArg::Ignore)]
    divergence: DivergenceArg,

    /// Keep deleted accounts out even if the snapshot still lists them
    #[arg(long)]
    suppress_deleted: bool,

    /// Stop after this many passes (runs forever when omitted)
    #[arg(long)]
    max_passes: Option<u64>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum DelimiterArg {
    Pipe,
    Comma,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum DivergenceArg {
    Ignore,
    PreferRelational,
    PreferFallback,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,syncdir=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("syncdir daemon v{}", syncdir::VERSION);
    tracing::info!("Database: {}", args.database.display());
    tracing::info!("Snapshot: {}", args.snapshot.display());

    let config = Config::builder()
        .database_path(&args.database)
        .snapshot_path(&args.snapshot)
        .connect_timeout_ms(args.connect_timeout_ms)
        .reconnect_interval_ms(args.interval_secs.saturating_mul(1000))
        .snapshot_delimiter(match args.delimiter {
            DelimiterArg::Pipe => Delimiter::Pipe,
            DelimiterArg::Comma => Delimiter::Comma,
        })
        .divergence_policy(match args.divergence {
            DivergenceArg::Ignore => DivergencePolicy::Ignore,
            DivergenceArg::PreferRelational => DivergencePolicy::PreferRelational,
            DivergenceArg::PreferFallback => DivergencePolicy::PreferFallback,
        })
        .deleted_account_policy(if args.suppress_deleted {
            DeletedAccountPolicy::Suppress
        } else {
            DeletedAccountPolicy::Recreate
        })
        .build();

    let directory = match Directory::open(config) {
        Ok(directory) => directory,
        Err(e) => {
            tracing::error!("Failed to open directory: {}", e);
            std::process::exit(1);
        }
    };

    // Opening already ran the first pass
    let mut passes: u64 = 1;
    while args.max_passes.map_or(true, |max| passes < max) {
        thread::sleep(directory.config().reconnect_interval());

        let report = directory.reconcile_now();
        passes += 1;
        if !report.relational_reachable {
            tracing::warn!(
                pending = directory.pending_writes(),
                "relational store still unreachable"
            );
        }
    }

    tracing::info!(passes, "Daemon stopped");
}
