use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Subcommand;
use seedbank_core::{RoutineDraft, Seedbank};
use uuid::Uuid;

use super::{context, print_json};

#[derive(Subcommand)]
pub enum RoutineAction {
    /// Create a routine from a JSON draft
    Create {
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Replace a routine with a JSON draft; items with an id are edited in place
    Update {
        routine_id: Uuid,

        #[arg(short, long)]
        file: PathBuf,
    },

    Archive { routine_id: Uuid },

    Show { routine_id: Uuid },

    List {
        #[arg(long)]
        archived: bool,
    },
}

fn read_draft(path: &Path) -> Result<RoutineDraft> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read routine file: {:?}", path))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse routine file: {:?}", path))
}

pub async fn run(bank: &Seedbank, acting: Option<Uuid>, action: RoutineAction) -> Result<()> {
    let ctx = context(bank, acting).await?;
    let family_id = ctx.caller.family_id;

    match action {
        RoutineAction::Create { file } => {
            print_json(&bank.create_routine(&ctx, family_id, read_draft(&file)?).await?)
        }
        RoutineAction::Update { routine_id, file } => {
            print_json(&bank.update_routine(&ctx, routine_id, read_draft(&file)?).await?)
        }
        RoutineAction::Archive { routine_id } => {
            bank.archive_routine(&ctx, routine_id).await?;
            println!("Archived routine {}", routine_id);
            Ok(())
        }
        RoutineAction::Show { routine_id } => print_json(&bank.get_routine(&ctx, routine_id).await?),
        RoutineAction::List { archived } => {
            print_json(&bank.list_routines(&ctx, family_id, archived).await?)
        }
    }
}
