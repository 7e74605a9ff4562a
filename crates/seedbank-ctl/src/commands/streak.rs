use anyhow::Result;
use clap::Subcommand;
use seedbank_common::StreakRewards;
use seedbank_core::Seedbank;
use uuid::Uuid;

use super::{context, print_json};

#[derive(Subcommand)]
pub enum StreakAction {
    /// Current streak and progress towards each rewarded threshold
    Show { child_id: Uuid },

    /// Show the family's streak rewards, or change the ones given
    Rewards {
        #[arg(long)]
        daily: Option<i64>,

        #[arg(long)]
        weekly: Option<i64>,

        #[arg(long)]
        monthly: Option<i64>,

        #[arg(long)]
        yearly: Option<i64>,
    },
}

fn merge_rewards(
    current: StreakRewards,
    daily: Option<i64>,
    weekly: Option<i64>,
    monthly: Option<i64>,
    yearly: Option<i64>,
) -> StreakRewards {
    StreakRewards {
        daily: daily.unwrap_or(current.daily),
        weekly: weekly.unwrap_or(current.weekly),
        monthly: monthly.unwrap_or(current.monthly),
        yearly: yearly.unwrap_or(current.yearly),
    }
}

pub async fn run(bank: &Seedbank, acting: Option<Uuid>, action: StreakAction) -> Result<()> {
    let ctx = context(bank, acting).await?;
    let family_id = ctx.caller.family_id;

    match action {
        StreakAction::Show { child_id } => print_json(&bank.get_streak(&ctx, child_id).await?),
        StreakAction::Rewards { daily, weekly, monthly, yearly } => {
            let current = bank.streak_rewards(&ctx, family_id).await?;
            if daily.is_none() && weekly.is_none() && monthly.is_none() && yearly.is_none() {
                return print_json(&current);
            }

            let rewards = merge_rewards(current, daily, weekly, monthly, yearly);
            let family = bank.configure_streak_rewards(&ctx, family_id, rewards).await?;
            print_json(&family.streak_rewards)
        }
    }
}
