// Privilege catalogue and request lifecycle
//
//   PENDING --decide--> APPROVED --terminate--> TERMINATED
//           \--decide--> REJECTED
//
// Every transition is a compare-and-swap on the status column. Approval debits the
// snapshotted cost in the same transaction.

use chrono::{DateTime, Utc};
use seedbank_common::{
    Decision, InvalidTransition, LedgerEntry, LedgerKind, PrivilegeDefinition, PrivilegeRequest,
    RequestStatus,
};
use seedbank_db::queries::{LedgerQueries, PrivilegeQueries};
use seedbank_db::{Database, DbPrivilegeRequest, NewPrivilegeDefinition, NewPrivilegeRequest};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{EngineError, Result};
use crate::ledger::{Posting, SeedLedger};

/// Outcome of deciding a request. `redemption` is set when the request was approved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestDecision {
    pub request: PrivilegeRequest,
    pub redemption: Option<LedgerEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivilegeDraft {
    pub title: String,
    pub description: Option<String>,
    pub cost: i64,
}

impl PrivilegeDraft {
    fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(EngineError::validation("privilege title must not be empty"));
        }
        if self.cost <= 0 {
            return Err(EngineError::Validation(format!(
                "privilege cost must be positive, got {}",
                self.cost
            )));
        }
        Ok(())
    }
}

fn to_request(row: DbPrivilegeRequest) -> Result<PrivilegeRequest> {
    Ok(PrivilegeRequest::try_from(row)?)
}

/// Explains why a compare-and-swap matched no row.
fn rejected_transition<F>(
    request_id: Uuid,
    current: Option<DbPrivilegeRequest>,
    transition: F,
) -> EngineError
where
    F: FnOnce(RequestStatus) -> std::result::Result<RequestStatus, InvalidTransition>,
{
    let Some(row) = current else {
        return EngineError::not_found("Privilege request", request_id);
    };

    match row.status.parse::<RequestStatus>() {
        Ok(status) => match transition(status) {
            Err(invalid) => invalid.into(),
            Ok(_) => EngineError::Validation(format!(
                "request {} changed while being updated, retry",
                request_id
            )),
        },
        Err(err) => EngineError::Database(err.into()),
    }
}

#[derive(Clone)]
pub struct PrivilegeRequestMachine {
    db: Database,
}

impl PrivilegeRequestMachine {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    // ------------------------------------------------------------------------
    // Catalogue
    // ------------------------------------------------------------------------

    pub async fn define(
        &self,
        family_id: Uuid,
        draft: PrivilegeDraft,
        now: DateTime<Utc>,
    ) -> Result<PrivilegeDefinition> {
        draft.validate()?;

        let row = PrivilegeQueries::create_definition(
            &self.db,
            NewPrivilegeDefinition {
                id: Uuid::new_v4().to_string(),
                family_id: family_id.to_string(),
                title: draft.title.trim().to_string(),
                description: draft.description,
                cost: draft.cost,
                created_at: now,
            },
        )
        .await?;

        info!("Created privilege {} ({} seeds) for family {}", row.title, row.cost, family_id);
        Ok(PrivilegeDefinition::try_from(row)?)
    }

    pub async fn definition(&self, privilege_id: Uuid) -> Result<PrivilegeDefinition> {
        let row = PrivilegeQueries::find_definition(&self.db, &privilege_id.to_string())
            .await?
            .ok_or_else(|| EngineError::not_found("Privilege", privilege_id))?;
        Ok(PrivilegeDefinition::try_from(row)?)
    }

    pub async fn catalogue(
        &self,
        family_id: Uuid,
        include_retired: bool,
    ) -> Result<Vec<PrivilegeDefinition>> {
        PrivilegeQueries::list_definitions(&self.db, &family_id.to_string(), include_retired)
            .await?
            .into_iter()
            .map(|row| PrivilegeDefinition::try_from(row).map_err(EngineError::from))
            .collect()
    }

    /// Soft delete. Existing requests keep their snapshots.
    pub async fn retire(&self, privilege_id: Uuid, now: DateTime<Utc>) -> Result<()> {
        PrivilegeQueries::retire_definition(&self.db, &privilege_id.to_string(), now).await?;
        info!("Retired privilege {}", privilege_id);
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Requests
    // ------------------------------------------------------------------------

    pub async fn request(&self, request_id: Uuid) -> Result<PrivilegeRequest> {
        let row = PrivilegeQueries::find_request(self.db.pool()?, &request_id.to_string())
            .await?
            .ok_or_else(|| EngineError::not_found("Privilege request", request_id))?;
        to_request(row)
    }

    /// Opens a PENDING request with the privilege's current title and cost. Fails when the
    /// child's balance is below the cost.
    pub async fn create(
        &self,
        child_id: Uuid,
        privilege: &PrivilegeDefinition,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<PrivilegeRequest> {
        if !privilege.active {
            return Err(EngineError::Validation(format!(
                "privilege {} has been retired",
                privilege.id
            )));
        }

        let mut tx = self.db.begin().await?;

        let row = PrivilegeQueries::insert_request(
            &mut *tx,
            &NewPrivilegeRequest {
                id: Uuid::new_v4().to_string(),
                family_id: privilege.family_id.to_string(),
                privilege_id: privilege.id.to_string(),
                child_id: child_id.to_string(),
                title: privilege.title.clone(),
                cost: privilege.cost,
                note: note.filter(|n| !n.trim().is_empty()),
                created_at: now,
            },
        )
        .await?;

        let available = LedgerQueries::balance(&mut *tx, &child_id.to_string()).await?;
        if privilege.cost > available {
            warn!(
                "Child {} cannot afford {} ({} > {})",
                child_id, privilege.title, privilege.cost, available
            );
            return Err(EngineError::InsufficientBalance { required: privilege.cost, available });
        }

        tx.commit().await?;

        info!("Child {} requested {} for {} seeds", child_id, row.title, row.cost);
        to_request(row)
    }

    pub async fn decide(
        &self,
        request_id: Uuid,
        decision: Decision,
        member_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<RequestDecision> {
        let status = RequestStatus::from(decision);
        let id = request_id.to_string();

        let mut tx = self.db.begin().await?;

        let Some(row) =
            PrivilegeQueries::resolve_request(&mut *tx, &id, status, &member_id.to_string(), now)
                .await?
        else {
            let current = PrivilegeQueries::find_request(&mut *tx, &id).await?;
            return Err(rejected_transition(request_id, current, |s| s.decide(decision)));
        };

        let request = to_request(row)?;
        let redemption = match status {
            RequestStatus::Approved => {
                let posting = Posting::new(
                    request.family_id,
                    request.child_id,
                    LedgerKind::PrivilegeRedemption,
                    request.cost,
                )
                .note(request.title.clone())
                .author(member_id)
                .request(request.id);
                Some(SeedLedger::post_in(&mut *tx, posting, now).await?)
            }
            _ => None,
        };

        tx.commit().await?;

        info!("Request {} {} by member {}", request_id, request.status, member_id);
        Ok(RequestDecision { request, redemption })
    }

    /// Ends an approved ticket. No ledger effect.
    pub async fn terminate(
        &self,
        request_id: Uuid,
        member_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<PrivilegeRequest> {
        let pool = self.db.pool()?;
        let id = request_id.to_string();

        let Some(row) =
            PrivilegeQueries::terminate_request(pool, &id, &member_id.to_string(), now).await?
        else {
            let current = PrivilegeQueries::find_request(pool, &id).await?;
            return Err(rejected_transition(request_id, current, RequestStatus::terminate));
        };

        info!("Request {} terminated by member {}", request_id, member_id);
        to_request(row)
    }

    /// Requests newest first, optionally narrowed to one child and one status.
    pub async fn list(
        &self,
        family_id: Uuid,
        child_id: Option<Uuid>,
        status: Option<RequestStatus>,
    ) -> Result<Vec<PrivilegeRequest>> {
        let child = child_id.map(|id| id.to_string());
        PrivilegeQueries::list_requests(
            self.db.pool()?,
            &family_id.to_string(),
            child.as_deref(),
            status,
        )
        .await?
        .into_iter()
        .map(to_request)
        .collect()
    }
}
