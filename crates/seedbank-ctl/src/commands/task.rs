use anyhow::Result;
use chrono::NaiveDate;
use clap::Subcommand;
use seedbank_common::TaskStatus;
use seedbank_core::{ManualTaskDraft, Seedbank};
use uuid::Uuid;

use super::{context, print_json};

#[derive(Subcommand)]
pub enum TaskAction {
    /// Tasks due on a family-local day (today by default)
    Due {
        #[arg(short, long)]
        child: Option<Uuid>,

        #[arg(short, long)]
        day: Option<NaiveDate>,
    },

    /// Mark a task completed and post its reward
    Complete { task_id: Uuid },

    /// Set a completed task back to pending
    Reopen { task_id: Uuid },

    /// Add a one-off task outside any routine
    Add {
        #[arg(short, long)]
        child: Uuid,

        #[arg(short, long)]
        title: String,

        #[arg(short, long, default_value_t = 0)]
        points: i64,

        #[arg(short, long)]
        day: Option<NaiveDate>,
    },

    /// Completed tasks, newest first
    History {
        #[arg(short, long)]
        child: Option<Uuid>,

        #[arg(short, long)]
        limit: Option<i64>,
    },
}

pub async fn run(bank: &Seedbank, acting: Option<Uuid>, action: TaskAction) -> Result<()> {
    let ctx = context(bank, acting).await?;
    let family_id = ctx.caller.family_id;

    match action {
        TaskAction::Due { child, day } => {
            print_json(&bank.get_due_tasks(&ctx, family_id, child, day).await?)
        }
        TaskAction::Complete { task_id } => {
            print_json(&bank.set_task_status(&ctx, task_id, TaskStatus::Completed).await?)
        }
        TaskAction::Reopen { task_id } => {
            print_json(&bank.set_task_status(&ctx, task_id, TaskStatus::Pending).await?)
        }
        TaskAction::Add { child, title, points, day } => {
            let draft = ManualTaskDraft { child_id: child, title, point_value: points, day };
            print_json(&bank.create_manual_task(&ctx, draft).await?)
        }
        TaskAction::History { child, limit } => {
            print_json(&bank.task_history(&ctx, family_id, child, limit).await?)
        }
    }
}
