use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use seedbank_core::{Seedbank, SeedbankConfig};
use tracing::info;
use uuid::Uuid;

mod commands;

use commands::{
    family::{FamilyAction, MemberAction},
    ledger::LedgerAction,
    privilege::{PrivilegeAction, RequestAction},
    routine::RoutineAction,
    streak::StreakAction,
    task::TaskAction,
};

#[derive(Parser)]
#[command(name = "seedbank-ctl")]
#[command(about = "Seedbank chores and rewards administration tool", long_about = None)]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Member to act as
    #[arg(long = "as", global = true, value_name = "MEMBER_ID")]
    acting: Option<Uuid>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,

    Family {
        #[command(subcommand)]
        action: FamilyAction,
    },

    Member {
        #[command(subcommand)]
        action: MemberAction,
    },

    Routine {
        #[command(subcommand)]
        action: RoutineAction,
    },

    Task {
        #[command(subcommand)]
        action: TaskAction,
    },

    Streak {
        #[command(subcommand)]
        action: StreakAction,
    },

    Ledger {
        #[command(subcommand)]
        action: LedgerAction,
    },

    Privilege {
        #[command(subcommand)]
        action: PrivilegeAction,
    },

    Request {
        #[command(subcommand)]
        action: RequestAction,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => SeedbankConfig::load_from_path(path)?,
        None => SeedbankConfig::load()?,
    };
    config.validate().context("Invalid configuration")?;

    let bank = Seedbank::open(&config).await.context("Failed to open the seedbank database")?;
    info!("Opened seedbank database at {}", config.database.path);

    let acting = cli.acting;
    match cli.command {
        Commands::Migrate => {
            let status = bank.database().migration_status().await?;
            println!(
                "Database is at migration {:?} ({} applied)",
                status.latest_version, status.applied_migrations
            );
        }
        Commands::Family { action } => commands::family::run(&bank, acting, action).await?,
        Commands::Member { action } => commands::family::run_member(&bank, acting, action).await?,
        Commands::Routine { action } => commands::routine::run(&bank, acting, action).await?,
        Commands::Task { action } => commands::task::run(&bank, acting, action).await?,
        Commands::Streak { action } => commands::streak::run(&bank, acting, action).await?,
        Commands::Ledger { action } => commands::ledger::run(&bank, acting, action).await?,
        Commands::Privilege { action } => commands::privilege::run(&bank, acting, action).await?,
        Commands::Request { action } => {
            commands::privilege::run_request(&bank, acting, action).await?
        }
    }

    Ok(())
}
