use anyhow::Result;
use chrono::NaiveDate;
use clap::Subcommand;
use seedbank_common::LedgerKind;
use seedbank_core::Seedbank;
use uuid::Uuid;

use super::{context, ledger_filter, print_json};

#[derive(Subcommand)]
pub enum LedgerAction {
    /// Balance and entries for one child
    Show {
        child_id: Uuid,

        /// Only the family's current day
        #[arg(long, conflicts_with = "day")]
        today: bool,

        #[arg(long)]
        day: Option<NaiveDate>,

        #[arg(short, long)]
        limit: Option<i64>,
    },

    Balance { child_id: Uuid },

    /// Give a child seeds
    Gift {
        child_id: Uuid,
        amount: i64,

        #[arg(short, long)]
        note: Option<String>,
    },

    /// Take seeds from a child
    Penalty {
        child_id: Uuid,
        amount: i64,

        #[arg(short, long)]
        note: Option<String>,
    },

    /// Entries across every child in the family
    Family {
        #[arg(long, conflicts_with = "day")]
        today: bool,

        #[arg(long)]
        day: Option<NaiveDate>,

        #[arg(short, long)]
        limit: Option<i64>,
    },
}

pub async fn run(bank: &Seedbank, acting: Option<Uuid>, action: LedgerAction) -> Result<()> {
    let ctx = context(bank, acting).await?;

    match action {
        LedgerAction::Show { child_id, today, day, limit } => {
            let page = bank.get_ledger(&ctx, child_id, ledger_filter(today, day, limit)).await?;
            print_json(&page)
        }
        LedgerAction::Balance { child_id } => {
            println!("{}", bank.balance(&ctx, child_id).await?);
            Ok(())
        }
        LedgerAction::Gift { child_id, amount, note } => {
            print_json(&bank.post_ledger_entry(&ctx, child_id, LedgerKind::Gift, amount, note).await?)
        }
        LedgerAction::Penalty { child_id, amount, note } => {
            let entry =
                bank.post_ledger_entry(&ctx, child_id, LedgerKind::Penalty, amount, note).await?;
            print_json(&entry)
        }
        LedgerAction::Family { today, day, limit } => {
            let family_id = ctx.caller.family_id;
            print_json(&bank.family_ledger(&ctx, family_id, ledger_filter(today, day, limit)).await?)
        }
    }
}
