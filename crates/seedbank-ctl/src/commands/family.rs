use anyhow::Result;
use chrono::Utc;
use clap::Subcommand;
use seedbank_common::MemberRole;
use seedbank_core::Seedbank;
use uuid::Uuid;

use super::{context, print_json};

#[derive(Subcommand)]
pub enum FamilyAction {
    /// Create a family (no --as needed)
    Create {
        name: String,

        /// IANA zone, e.g. America/New_York. Defaults to the configured or device zone.
        #[arg(short, long)]
        timezone: Option<String>,
    },

    /// Show the acting member's family
    Show,

    /// Change the family timezone
    Timezone { zone: String },
}

#[derive(Subcommand)]
pub enum MemberAction {
    /// Add a member to a family (no --as needed)
    Add {
        family_id: Uuid,
        name: String,

        #[arg(short, long, default_value = "child")]
        role: MemberRole,

        #[arg(long)]
        avatar_tone: Option<String>,
    },

    /// List the acting member's family
    List,
}

pub async fn run(bank: &Seedbank, acting: Option<Uuid>, action: FamilyAction) -> Result<()> {
    match action {
        FamilyAction::Create { name, timezone } => {
            let family = bank.create_family(&name, timezone.as_deref(), Utc::now()).await?;
            print_json(&family)
        }
        FamilyAction::Show => {
            let ctx = context(bank, acting).await?;
            print_json(&bank.family(&ctx, ctx.caller.family_id).await?)
        }
        FamilyAction::Timezone { zone } => {
            let ctx = context(bank, acting).await?;
            print_json(&bank.set_family_timezone(&ctx, ctx.caller.family_id, &zone).await?)
        }
    }
}

pub async fn run_member(bank: &Seedbank, acting: Option<Uuid>, action: MemberAction) -> Result<()> {
    match action {
        MemberAction::Add { family_id, name, role, avatar_tone } => {
            let member = bank.add_member(family_id, &name, role, avatar_tone, Utc::now()).await?;
            print_json(&member)
        }
        MemberAction::List => {
            let ctx = context(bank, acting).await?;
            print_json(&bank.members(&ctx, ctx.caller.family_id).await?)
        }
    }
}
