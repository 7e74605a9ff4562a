use anyhow::{bail, Result};
use clap::Subcommand;
use seedbank_common::{Decision, RequestStatus};
use seedbank_core::{PrivilegeDraft, Seedbank};
use uuid::Uuid;

use super::{context, print_json};

#[derive(Subcommand)]
pub enum PrivilegeAction {
    /// Add a privilege to the family catalogue
    Create {
        #[arg(short, long)]
        title: String,

        #[arg(short, long)]
        cost: i64,

        #[arg(short, long)]
        description: Option<String>,
    },

    List {
        /// Include retired privileges
        #[arg(long)]
        retired: bool,
    },

    /// Remove a privilege from the catalogue; existing requests are kept
    Retire { privilege_id: Uuid },
}

#[derive(Subcommand)]
pub enum RequestAction {
    /// Ask to spend seeds on a privilege
    Create {
        privilege_id: Uuid,

        /// Child to request for; defaults to the acting member
        #[arg(short, long)]
        child: Option<Uuid>,

        #[arg(short, long)]
        note: Option<String>,
    },

    /// Approve or reject a pending request
    Decide {
        request_id: Uuid,

        /// approve or reject
        decision: Decision,
    },

    /// Mark an approved ticket as used
    Terminate { request_id: Uuid },

    /// Requests across the family
    List {
        #[arg(short, long)]
        status: Option<RequestStatus>,
    },

    /// The acting child's own requests
    Mine {
        #[arg(short, long)]
        status: Option<RequestStatus>,
    },
}

pub async fn run(bank: &Seedbank, acting: Option<Uuid>, action: PrivilegeAction) -> Result<()> {
    let ctx = context(bank, acting).await?;
    let family_id = ctx.caller.family_id;

    match action {
        PrivilegeAction::Create { title, cost, description } => {
            let draft = PrivilegeDraft { title, description, cost };
            print_json(&bank.create_privilege(&ctx, family_id, draft).await?)
        }
        PrivilegeAction::List { retired } => {
            print_json(&bank.list_privileges(&ctx, family_id, retired).await?)
        }
        PrivilegeAction::Retire { privilege_id } => {
            bank.retire_privilege(&ctx, privilege_id).await?;
            println!("Retired privilege {}", privilege_id);
            Ok(())
        }
    }
}

pub async fn run_request(
    bank: &Seedbank,
    acting: Option<Uuid>,
    action: RequestAction,
) -> Result<()> {
    let ctx = context(bank, acting).await?;

    match action {
        RequestAction::Create { privilege_id, child, note } => {
            let child_id = match child {
                Some(child_id) => child_id,
                None if !ctx.caller.is_parent() => ctx.caller.member_id,
                None => bail!("A parent must name the child with --child"),
            };
            let request =
                bank.create_privilege_request(&ctx, child_id, privilege_id, note).await?;
            print_json(&request)
        }
        RequestAction::Decide { request_id, decision } => {
            print_json(&bank.decide_privilege_request(&ctx, request_id, decision).await?)
        }
        RequestAction::Terminate { request_id } => {
            print_json(&bank.terminate_privilege_request(&ctx, request_id).await?)
        }
        RequestAction::List { status } => {
            let family_id = ctx.caller.family_id;
            print_json(&bank.list_privilege_requests(&ctx, family_id, status).await?)
        }
        RequestAction::Mine { status } => {
            print_json(&bank.my_privilege_requests(&ctx, status).await?)
        }
    }
}
