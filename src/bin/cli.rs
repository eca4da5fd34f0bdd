//! syncdir CLI
//!
//! Command-line interface for one-shot directory operations. Each invocation
//! opens the directory (which imports the snapshot), runs one command and
//! exits.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use syncdir::{Config, Directory, ProfileUpdate, Role};
use tracing_subscriber::{fmt, EnvFilter};

/// syncdir CLI
#[derive(Parser, Debug)]
#[command(name = "syncdir-cli")]
#[command(about = "CLI for the syncdir account directory")]
#[command(version)]
struct Args {
    /// SQLite database file
    #[arg(short, long, default_value = "./syncdir_data/accounts.db")]
    database: PathBuf,

    /// Snapshot file
    #[arg(short, long, default_value = "./accounts.txt")]
    snapshot: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check a username/password pair
    Login { username: String, password: String },

    /// Create a Customer account
    Register {
        username: String,
        password: String,

        #[arg(default_value = "")]
        email: String,
    },

    /// List every account
    List,

    /// Edit name, email or age
    UpdateProfile {
        username: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        age: Option<u32>,
    },

    /// Assign a role
    ChangeRole {
        username: String,
        role: String,

        /// Role of the user performing the change
        #[arg(long, default_value = "Admin")]
        actor: String,
    },

    /// Replace a password with a generated one
    ResetPassword { username: String },

    /// Delete one account
    Delete { username: String },

    /// Delete every account
    DeleteAll,

    /// Run a reconciliation pass and print what it did
    Reconcile,

    /// Show connection and journal state
    Status,
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_target(false).init();

    let args = Args::parse();

    let config = Config::builder()
        .database_path(&args.database)
        .snapshot_path(&args.snapshot)
        .build();

    let directory = match Directory::open(config) {
        Ok(directory) => directory,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(&directory, args.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {}", message);
            ExitCode::FAILURE
        }
    }
}

fn run(directory: &Directory, command: Commands) -> Result<(), String> {
    match command {
        Commands::Login { username, password } => match directory.login(&username, &password) {
            Some(account) => {
                println!("OK {} ({})", account.username, account.role);
                Ok(())
            }
            None => Err("invalid username or password".to_string()),
        },

        Commands::Register {
            username,
            password,
            email,
        } => {
            directory
                .register(&username, &password, &email)
                .map_err(|e| e.to_string())?;
            println!("OK");
            Ok(())
        }

        Commands::List => {
            let accounts = directory.all_accounts();
            for account in &accounts {
                println!(
                    "{:<10} {:<20} {:<30} {}",
                    account.role.as_str(),
                    account.username,
                    account.email,
                    account.created_date_string()
                );
            }
            println!("({} accounts)", accounts.len());
            Ok(())
        }

        Commands::UpdateProfile {
            username,
            name,
            email,
            age,
        } => {
            directory
                .update_profile(&username, ProfileUpdate { name, email, age })
                .map_err(|e| e.to_string())?;
            println!("OK");
            Ok(())
        }

        Commands::ChangeRole {
            username,
            role,
            actor,
        } => {
            directory
                .change_role(&username, &role, Role::normalize(&actor))
                .map_err(|e| e.to_string())?;
            println!("OK");
            Ok(())
        }

        Commands::ResetPassword { username } => {
            let password = directory
                .reset_password(&username)
                .map_err(|e| e.to_string())?;
            println!("{}", password);
            Ok(())
        }

        Commands::Delete { username } => {
            directory.delete_user(&username).map_err(|e| e.to_string())?;
            println!("OK");
            Ok(())
        }

        Commands::DeleteAll => {
            let count = directory.delete_all().map_err(|e| e.to_string())?;
            println!("deleted {} accounts", count);
            Ok(())
        }

        Commands::Reconcile => {
            let report = directory.reconcile_now();
            println!("relational reachable: {}", report.relational_reachable);
            println!("journal replayed:     {}", report.journal.entries_applied);
            println!("snapshot accounts:    {}", report.snapshot_accounts);
            println!("snapshot skipped:     {}", report.snapshot_skipped);
            println!(
                "fallback:             +{} ~{}",
                report.fallback_created, report.fallback_updated
            );
            println!(
                "relational:           +{} ~{}",
                report.relational_created, report.relational_updated
            );
            println!("failures:             {}", report.failures);
            println!("snapshot rewritten:   {}", report.snapshot_written);
            Ok(())
        }

        Commands::Status => {
            println!("syncdir v{}", syncdir::VERSION);
            println!("connected:      {}", directory.is_connected());
            println!("accounts:       {}", directory.all_accounts().len());
            println!("pending writes: {}", directory.pending_writes());
            Ok(())
        }
    }
}
