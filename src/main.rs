use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use numifocus::app;
use numifocus::config::{default_config_path, ResolvedConfig};
use numifocus::intake::IngestFilters;
use numifocus::models::{AccountType, InstrumentType, Owner};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "numifocus")]
#[command(about = "Normalize and reconcile bank transaction exports")]
struct Cli {
    /// Path to config file (default: ./numifocus.toml, else the XDG data dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest uploaded exports from the inbox
    Ingest {
        /// Reselect files covering dates on or after this day (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Reselect files covering dates on or before this day (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,

        /// Limit to an account type (repeatable)
        #[arg(long = "account")]
        accounts: Vec<AccountType>,
    },

    /// List files that have been ingested
    Processed,

    /// List stored transactions of one account
    Transactions {
        #[arg(long)]
        owner: Owner,

        #[arg(long)]
        instrument: InstrumentType,

        /// Only transactions on or after this day (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Only transactions on or before this day (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,
    },

    /// Delete every transaction that came from an uploaded file
    DeleteFile {
        owner: Owner,
        account_type: AccountType,
        file_id: String,
    },

    /// Delete a single transaction
    DeleteTransaction {
        #[arg(long)]
        owner: Owner,

        #[arg(long)]
        instrument: InstrumentType,

        id: String,
    },

    /// Show current configuration
    Config,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let layer = fmt::layer().with_writer(std::io::stderr).with_target(true);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(layer.json())
            .init();
    } else {
        tracing_subscriber::registry().with(filter).with(layer).init();
    }
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let config_path = cli.config.unwrap_or_else(default_config_path);
    let config = ResolvedConfig::load_or_default(&config_path)
        .with_context(|| format!("Failed to load config: {}", config_path.display()))?;

    if let Command::Config = cli.command {
        return print_json(&app::config_output(&config_path, &config));
    }

    let service = app::open_service(&config).await?;
    match cli.command {
        Command::Ingest { from, to, accounts } => {
            let mut filters = IngestFilters::new();
            filters.date_start = from;
            filters.date_end = to;
            for account_type in accounts {
                filters = filters.with_account(account_type);
            }

            let output = app::run_ingest(&service, filters).await?;
            print_json(&output)?;
            if !output.success {
                std::process::exit(1);
            }
        }
        Command::Processed => {
            print_json(&app::list_processed_files(&service).await?)?;
        }
        Command::Transactions {
            owner,
            instrument,
            from,
            to,
        } => {
            print_json(&app::list_transactions(&service, owner, instrument, from, to).await?)?;
        }
        Command::DeleteFile {
            owner,
            account_type,
            file_id,
        } => {
            print_json(&app::delete_file(&service, owner, account_type, &file_id).await?)?;
        }
        Command::DeleteTransaction {
            owner,
            instrument,
            id,
        } => {
            print_json(&app::delete_transaction(&service, owner, instrument, &id).await?)?;
        }
        Command::Config => {}
    }

    Ok(())
}
