use anyhow::{Context, Result};
use chrono::NaiveDate;
use seedbank_core::{LedgerFilter, LedgerScope, RequestContext, Seedbank};
use serde::Serialize;
use uuid::Uuid;

pub mod family;
pub mod ledger;
pub mod privilege;
pub mod routine;
pub mod streak;
pub mod task;

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("Failed to render output")?;
    println!("{}", rendered);
    Ok(())
}

/// Context for the `--as` member, timestamped now.
pub async fn context(bank: &Seedbank, acting: Option<Uuid>) -> Result<RequestContext> {
    let member_id = acting.context("This command needs --as <MEMBER_ID>")?;
    bank.context_for(member_id)
        .await
        .with_context(|| format!("Cannot act as member {}", member_id))
}

pub fn ledger_filter(today: bool, day: Option<NaiveDate>, limit: Option<i64>) -> LedgerFilter {
    let scope = match (today, day) {
        (true, _) => LedgerScope::Today,
        (false, Some(day)) => LedgerScope::Day(day),
        (false, None) => LedgerScope::All,
    };
    LedgerFilter { scope, limit }
}
