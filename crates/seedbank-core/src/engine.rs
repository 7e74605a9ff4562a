// Seedbank facade
//
// The single entry point for callers. Each operation authorizes the caller, re-reads the
// family (and so its timezone) and then delegates to the component that owns the rule.

use chrono::{DateTime, NaiveDate, Utc};
use seedbank_common::{
    Decision, Family, LedgerEntry, LedgerKind, Member, MemberRole, PrivilegeDefinition,
    PrivilegeRequest, RequestStatus, RoutineTemplate, StreakRewards, TaskInstance, TaskStatus,
    TimeZoneClock,
};
use seedbank_db::queries::{FamilyQueries, MemberQueries, TaskQueries};
use seedbank_db::{Database, NewFamily, NewMember, NewTaskInstance};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::{SeedbankConfig, MAX_PAGE_SIZE};
use crate::context::{Caller, RequestContext};
use crate::error::{EngineError, Result};
use crate::ledger::{LedgerFilter, Posting, SeedLedger};
use crate::privileges::{PrivilegeDraft, PrivilegeRequestMachine, RequestDecision};
use crate::routines::{RoutineDraft, RoutineManager};
use crate::scheduler::RecurrenceScheduler;
use crate::streak::{StreakEngine, StreakSummary};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    /// Zone for new families; None resolves the device zone.
    pub default_timezone: Option<String>,
    pub ledger_page_size: i64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self { default_timezone: None, ledger_page_size: 50 }
    }
}

impl EngineSettings {
    /// The configured default zone, or the device zone when none is configured.
    pub fn timezone_or_device(&self) -> String {
        match &self.default_timezone {
            Some(zone) => zone.clone(),
            None => TimeZoneClock::device_zone_name(),
        }
    }
}

impl From<&SeedbankConfig> for EngineSettings {
    fn from(config: &SeedbankConfig) -> Self {
        Self {
            default_timezone: config.defaults.timezone.clone(),
            ledger_page_size: config.defaults.ledger_page_size,
        }
    }
}

/// A task after a status change, with the entries the change posted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskUpdate {
    pub task: TaskInstance,
    pub entries: Vec<LedgerEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerPage {
    pub child_id: Uuid,
    pub balance: i64,
    pub entries: Vec<LedgerEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualTaskDraft {
    pub child_id: Uuid,
    pub title: String,
    pub point_value: i64,
    /// Defaults to the family's today.
    #[serde(default)]
    pub day: Option<NaiveDate>,
}

#[derive(Clone)]
pub struct Seedbank {
    db: Database,
    settings: EngineSettings,
    scheduler: RecurrenceScheduler,
    streaks: StreakEngine,
    ledger: SeedLedger,
    privileges: PrivilegeRequestMachine,
    routines: RoutineManager,
}

impl Seedbank {
    pub fn new(db: Database, settings: EngineSettings) -> Self {
        Self {
            scheduler: RecurrenceScheduler::new(db.clone()),
            streaks: StreakEngine::new(db.clone()),
            ledger: SeedLedger::new(db.clone()),
            privileges: PrivilegeRequestMachine::new(db.clone()),
            routines: RoutineManager::new(db.clone()),
            settings,
            db,
        }
    }

    /// Opens the configured database and applies pending migrations.
    pub async fn open(config: &SeedbankConfig) -> Result<Self> {
        let db = Database::new(config.database.to_database_config()).await?;
        db.run_migrations().await?;

        Ok(Self::new(db, EngineSettings::from(config)))
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    // ========================================================================
    // Lookups
    // ========================================================================

    async fn load_family(&self, family_id: Uuid) -> Result<(Family, TimeZoneClock)> {
        let row = FamilyQueries::get_by_id(&self.db, &family_id.to_string()).await?;
        let family = Family::try_from(row)?;
        let clock = TimeZoneClock::for_zone(&family.timezone);
        Ok((family, clock))
    }

    async fn load_member(&self, member_id: Uuid) -> Result<Member> {
        let row = MemberQueries::find(&self.db, &member_id.to_string())
            .await?
            .ok_or_else(|| EngineError::not_found("Member", member_id))?;
        Ok(Member::try_from(row)?)
    }

    /// A child the caller may act on behalf of.
    async fn child_for(&self, ctx: &RequestContext, child_id: Uuid) -> Result<Member> {
        let member = self.load_member(child_id).await?;
        ctx.require_member_access(&member)?;

        if !member.is_child() {
            return Err(EngineError::Validation(format!("member {} is not a child", child_id)));
        }
        Ok(member)
    }

    async fn load_task(&self, task_id: Uuid) -> Result<TaskInstance> {
        let row = TaskQueries::find(self.db.pool()?, &task_id.to_string())
            .await?
            .ok_or_else(|| EngineError::not_found("Task", task_id))?;
        Ok(TaskInstance::try_from(row)?)
    }

    /// Children see only themselves; parents see everyone or the child they name.
    async fn visible_child(
        &self,
        ctx: &RequestContext,
        child_id: Option<Uuid>,
    ) -> Result<Option<Uuid>> {
        match child_id {
            Some(id) => Ok(Some(self.child_for(ctx, id).await?.id)),
            None if ctx.caller.is_parent() => Ok(None),
            None => Ok(Some(ctx.caller.member_id)),
        }
    }

    fn page_limit(&self, limit: Option<i64>) -> Result<i64> {
        match limit {
            None => Ok(self.settings.ledger_page_size.clamp(1, MAX_PAGE_SIZE)),
            Some(n) if n < 1 => {
                Err(EngineError::Validation(format!("limit must be at least 1, got {}", n)))
            }
            Some(n) => Ok(n.min(MAX_PAGE_SIZE)),
        }
    }

    // ========================================================================
    // Families and members
    // ========================================================================

    /// Creates a family. Without an explicit zone the configured default, then the device
    /// zone, is used.
    pub async fn create_family(
        &self,
        name: &str,
        timezone: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Family> {
        if name.trim().is_empty() {
            return Err(EngineError::validation("family name must not be empty"));
        }

        let zone = timezone
            .map(str::to_string)
            .unwrap_or_else(|| self.settings.timezone_or_device());
        let clock =
            TimeZoneClock::resolve(&zone).map_err(|e| EngineError::Validation(e.to_string()))?;

        let row = FamilyQueries::create(
            &self.db,
            NewFamily::new(name.trim().to_string(), clock.name().to_string(), now),
        )
        .await?;

        info!("Created family {} in {}", row.id, row.timezone);
        Ok(Family::try_from(row)?)
    }

    pub async fn add_member(
        &self,
        family_id: Uuid,
        name: &str,
        role: MemberRole,
        avatar_tone: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Member> {
        if name.trim().is_empty() {
            return Err(EngineError::validation("member name must not be empty"));
        }

        let row = MemberQueries::create(
            &self.db,
            NewMember {
                id: Uuid::new_v4().to_string(),
                family_id: family_id.to_string(),
                name: name.trim().to_string(),
                role,
                avatar_tone,
                created_at: now,
            },
        )
        .await?;

        info!("Added {} {} to family {}", role, row.id, family_id);
        Ok(Member::try_from(row)?)
    }

    /// Context for an already authenticated member, with "now" taken from the system clock.
    pub async fn context_for(&self, member_id: Uuid) -> Result<RequestContext> {
        let member = self.load_member(member_id).await?;
        Ok(RequestContext::new(Caller::from(&member)))
    }

    pub async fn family(&self, ctx: &RequestContext, family_id: Uuid) -> Result<Family> {
        ctx.require_family(family_id)?;
        Ok(self.load_family(family_id).await?.0)
    }

    pub async fn members(&self, ctx: &RequestContext, family_id: Uuid) -> Result<Vec<Member>> {
        ctx.require_family(family_id)?;
        MemberQueries::list_for_family(&self.db, &family_id.to_string())
            .await?
            .into_iter()
            .map(|row| Member::try_from(row).map_err(EngineError::from))
            .collect()
    }

    /// Changes the zone used for future day boundaries. Past task days are not re-bucketed.
    pub async fn set_family_timezone(
        &self,
        ctx: &RequestContext,
        family_id: Uuid,
        timezone: &str,
    ) -> Result<Family> {
        ctx.require_parent("change the family timezone")?;
        ctx.require_family(family_id)?;

        let clock =
            TimeZoneClock::resolve(timezone).map_err(|e| EngineError::Validation(e.to_string()))?;
        FamilyQueries::update_timezone(&self.db, &family_id.to_string(), clock.name(), ctx.now)
            .await?;

        info!("Family {} now uses timezone {}", family_id, clock.name());
        Ok(self.load_family(family_id).await?.0)
    }

    // ========================================================================
    // Tasks
    // ========================================================================

    /// Tasks for a family-local day (default today). Today's routines are materialized; a
    /// future day is an unsaved preview that follows later routine edits.
    pub async fn get_due_tasks(
        &self,
        ctx: &RequestContext,
        family_id: Uuid,
        child_id: Option<Uuid>,
        day: Option<NaiveDate>,
    ) -> Result<Vec<TaskInstance>> {
        ctx.require_family(family_id)?;
        let child = self.visible_child(ctx, child_id).await?;

        let (family, clock) = self.load_family(family_id).await?;
        let today = clock.calendar_day(ctx.now);
        let day = day.unwrap_or(today);

        self.scheduler.tasks_for_day(family.id, child, day, today, ctx.now).await
    }

    pub async fn set_task_status(
        &self,
        ctx: &RequestContext,
        task_id: Uuid,
        status: TaskStatus,
    ) -> Result<TaskUpdate> {
        let task = self.load_task(task_id).await?;
        ctx.require_family(task.family_id)?;
        self.child_for(ctx, task.child_id).await?;

        let (family, clock) = self.load_family(task.family_id).await?;
        let id = task_id.to_string();

        let entries = match status {
            TaskStatus::Completed => {
                let today = clock.calendar_day(ctx.now);
                if task.day > today {
                    return Err(EngineError::Validation(format!(
                        "task {} is scheduled for {} and cannot be completed yet",
                        task_id, task.day
                    )));
                }

                let mut tx = self.db.begin().await?;
                if !TaskQueries::transition(
                    &mut *tx,
                    &id,
                    TaskStatus::Pending,
                    TaskStatus::Completed,
                    Some(ctx.now),
                )
                .await?
                {
                    debug!("Task {} already completed", task_id);
                    Vec::new()
                } else {
                    let mut entries = Vec::new();
                    if task.point_value > 0 {
                        let posting = Posting::new(
                            family.id,
                            task.child_id,
                            LedgerKind::TaskReward,
                            task.point_value,
                        )
                        .note(task.title.clone())
                        .author(ctx.caller.member_id)
                        .task(task.id);
                        entries.push(SeedLedger::post_in(&mut *tx, posting, ctx.now).await?);
                    }

                    entries.extend(
                        StreakEngine::record_completion(
                            &mut *tx,
                            family.id,
                            task.child_id,
                            task.day,
                            today,
                            &family.streak_rewards,
                            ctx.now,
                        )
                        .await?,
                    );

                    tx.commit().await?;
                    info!("Task {} completed by member {}", task_id, ctx.caller.member_id);
                    entries
                }
            }
            TaskStatus::Pending => {
                let mut tx = self.db.begin().await?;
                if !TaskQueries::transition(
                    &mut *tx,
                    &id,
                    TaskStatus::Completed,
                    TaskStatus::Pending,
                    None,
                )
                .await?
                {
                    debug!("Task {} already pending", task_id);
                    Vec::new()
                } else {
                    let mut entries = Vec::new();
                    if task.point_value > 0 {
                        let posting = Posting::new(
                            family.id,
                            task.child_id,
                            LedgerKind::TaskReversal,
                            task.point_value,
                        )
                        .note(task.title.clone())
                        .author(ctx.caller.member_id)
                        .task(task.id);
                        entries.push(SeedLedger::post_in(&mut *tx, posting, ctx.now).await?);
                    }

                    tx.commit().await?;
                    info!("Task {} reopened by member {}", task_id, ctx.caller.member_id);
                    entries
                }
            }
        };

        Ok(TaskUpdate { task: self.load_task(task_id).await?, entries })
    }

    /// A one-off task outside any routine.
    pub async fn create_manual_task(
        &self,
        ctx: &RequestContext,
        draft: ManualTaskDraft,
    ) -> Result<TaskInstance> {
        ctx.require_parent("create tasks")?;
        let child = self.child_for(ctx, draft.child_id).await?;

        if draft.title.trim().is_empty() {
            return Err(EngineError::validation("task title must not be empty"));
        }
        if draft.point_value < 0 {
            return Err(EngineError::validation("task points must not be negative"));
        }

        let (family, clock) = self.load_family(child.family_id).await?;
        let day = draft.day.unwrap_or_else(|| clock.calendar_day(ctx.now));

        let row = TaskQueries::insert(
            self.db.pool()?,
            &NewTaskInstance {
                id: Uuid::new_v4().to_string(),
                family_id: family.id.to_string(),
                template_id: None,
                item_id: None,
                child_id: child.id.to_string(),
                title: draft.title.trim().to_string(),
                point_value: draft.point_value,
                day,
                created_at: ctx.now,
            },
        )
        .await?;

        info!("Created manual task {} for child {} on {}", row.id, child.id, day);
        Ok(TaskInstance::try_from(row)?)
    }

    /// Completed tasks, most recent first.
    pub async fn task_history(
        &self,
        ctx: &RequestContext,
        family_id: Uuid,
        child_id: Option<Uuid>,
        limit: Option<i64>,
    ) -> Result<Vec<TaskInstance>> {
        ctx.require_family(family_id)?;
        let child = self.visible_child(ctx, child_id).await?.map(|id| id.to_string());
        let limit = self.page_limit(limit)?;

        let family = family_id.to_string();
        TaskQueries::list_completed(self.db.pool()?, &family, child.as_deref(), limit)
            .await?
            .into_iter()
            .map(|row| TaskInstance::try_from(row).map_err(EngineError::from))
            .collect()
    }

    // ========================================================================
    // Streaks
    // ========================================================================

    pub async fn get_streak(&self, ctx: &RequestContext, child_id: Uuid) -> Result<StreakSummary> {
        let child = self.child_for(ctx, child_id).await?;
        let (family, clock) = self.load_family(child.family_id).await?;
        let today = clock.calendar_day(ctx.now);

        self.streaks.summary(child.id, &family.streak_rewards, today, ctx.now).await
    }

    pub async fn streak_rewards(
        &self,
        ctx: &RequestContext,
        family_id: Uuid,
    ) -> Result<StreakRewards> {
        ctx.require_family(family_id)?;
        Ok(self.load_family(family_id).await?.0.streak_rewards)
    }

    /// Applies from the next completion on; rewards already paid are kept.
    pub async fn configure_streak_rewards(
        &self,
        ctx: &RequestContext,
        family_id: Uuid,
        rewards: StreakRewards,
    ) -> Result<Family> {
        ctx.require_parent("configure streak rewards")?;
        ctx.require_family(family_id)?;
        rewards.validate()?;

        FamilyQueries::update_streak_rewards(&self.db, &family_id.to_string(), &rewards, ctx.now)
            .await?;

        info!("Family {} streak rewards set to {:?}", family_id, rewards);
        Ok(self.load_family(family_id).await?.0)
    }

    // ========================================================================
    // Ledger
    // ========================================================================

    /// Manual GIFT or PENALTY. `amount` is the positive magnitude.
    pub async fn post_ledger_entry(
        &self,
        ctx: &RequestContext,
        child_id: Uuid,
        kind: LedgerKind,
        amount: i64,
        note: Option<String>,
    ) -> Result<LedgerEntry> {
        ctx.require_parent("post ledger entries")?;
        if !kind.is_manual() {
            return Err(EngineError::Validation(format!(
                "{} entries are posted automatically",
                kind
            )));
        }
        let child = self.child_for(ctx, child_id).await?;

        let mut posting =
            Posting::new(child.family_id, child.id, kind, amount).author(ctx.caller.member_id);
        posting.note = note;

        self.ledger.post(posting, ctx.now).await
    }

    pub async fn balance(&self, ctx: &RequestContext, child_id: Uuid) -> Result<i64> {
        let child = self.child_for(ctx, child_id).await?;
        self.ledger.balance_of(child.id).await
    }

    pub async fn get_ledger(
        &self,
        ctx: &RequestContext,
        child_id: Uuid,
        filter: LedgerFilter,
    ) -> Result<LedgerPage> {
        let child = self.child_for(ctx, child_id).await?;
        let (_, clock) = self.load_family(child.family_id).await?;
        let limit = self.page_limit(filter.limit)?;

        let entries =
            self.ledger.entries_for(child.id, filter.range(&clock, ctx.now), limit).await?;
        let balance = self.ledger.balance_of(child.id).await?;

        Ok(LedgerPage { child_id: child.id, balance, entries })
    }

    /// Entries across every child of the family.
    pub async fn family_ledger(
        &self,
        ctx: &RequestContext,
        family_id: Uuid,
        filter: LedgerFilter,
    ) -> Result<Vec<LedgerEntry>> {
        ctx.require_parent("view the family ledger")?;
        ctx.require_family(family_id)?;
        let (family, clock) = self.load_family(family_id).await?;
        let limit = self.page_limit(filter.limit)?;

        self.ledger.family_entries(family.id, filter.range(&clock, ctx.now), limit).await
    }

    // ========================================================================
    // Privileges
    // ========================================================================

    pub async fn create_privilege(
        &self,
        ctx: &RequestContext,
        family_id: Uuid,
        draft: PrivilegeDraft,
    ) -> Result<PrivilegeDefinition> {
        ctx.require_parent("manage privileges")?;
        ctx.require_family(family_id)?;
        self.privileges.define(family_id, draft, ctx.now).await
    }

    pub async fn list_privileges(
        &self,
        ctx: &RequestContext,
        family_id: Uuid,
        include_retired: bool,
    ) -> Result<Vec<PrivilegeDefinition>> {
        ctx.require_family(family_id)?;
        self.privileges.catalogue(family_id, include_retired).await
    }

    pub async fn retire_privilege(&self, ctx: &RequestContext, privilege_id: Uuid) -> Result<()> {
        ctx.require_parent("manage privileges")?;
        let privilege = self.privileges.definition(privilege_id).await?;
        ctx.require_family(privilege.family_id)?;
        self.privileges.retire(privilege.id, ctx.now).await
    }

    pub async fn create_privilege_request(
        &self,
        ctx: &RequestContext,
        child_id: Uuid,
        privilege_id: Uuid,
        note: Option<String>,
    ) -> Result<PrivilegeRequest> {
        let child = self.child_for(ctx, child_id).await?;
        let privilege = self.privileges.definition(privilege_id).await?;
        if privilege.family_id != child.family_id {
            return Err(EngineError::not_found("Privilege", privilege_id));
        }

        self.privileges.create(child.id, &privilege, note, ctx.now).await
    }

    pub async fn decide_privilege_request(
        &self,
        ctx: &RequestContext,
        request_id: Uuid,
        decision: Decision,
    ) -> Result<RequestDecision> {
        ctx.require_parent("decide privilege requests")?;
        let request = self.privileges.request(request_id).await?;
        ctx.require_family(request.family_id)?;

        self.privileges.decide(request.id, decision, ctx.caller.member_id, ctx.now).await
    }

    pub async fn terminate_privilege_request(
        &self,
        ctx: &RequestContext,
        request_id: Uuid,
    ) -> Result<PrivilegeRequest> {
        ctx.require_parent("terminate privileges")?;
        let request = self.privileges.request(request_id).await?;
        ctx.require_family(request.family_id)?;

        self.privileges.terminate(request.id, ctx.caller.member_id, ctx.now).await
    }

    /// Parents see every request of the family, children only their own.
    pub async fn list_privilege_requests(
        &self,
        ctx: &RequestContext,
        family_id: Uuid,
        status: Option<RequestStatus>,
    ) -> Result<Vec<PrivilegeRequest>> {
        ctx.require_family(family_id)?;
        let child = self.visible_child(ctx, None).await?;
        self.privileges.list(family_id, child, status).await
    }

    pub async fn my_privilege_requests(
        &self,
        ctx: &RequestContext,
        status: Option<RequestStatus>,
    ) -> Result<Vec<PrivilegeRequest>> {
        self.privileges.list(ctx.caller.family_id, Some(ctx.caller.member_id), status).await
    }

    // ========================================================================
    // Routines
    // ========================================================================

    pub async fn create_routine(
        &self,
        ctx: &RequestContext,
        family_id: Uuid,
        draft: RoutineDraft,
    ) -> Result<RoutineTemplate> {
        ctx.require_parent("edit routines")?;
        ctx.require_family(family_id)?;
        self.routines.create(family_id, draft, ctx.now).await
    }

    pub async fn update_routine(
        &self,
        ctx: &RequestContext,
        template_id: Uuid,
        draft: RoutineDraft,
    ) -> Result<RoutineTemplate> {
        ctx.require_parent("edit routines")?;
        let template = self.routines.get(template_id).await?;
        ctx.require_family(template.family_id)?;
        self.routines.update(&template, draft, ctx.now).await
    }

    pub async fn archive_routine(&self, ctx: &RequestContext, template_id: Uuid) -> Result<()> {
        ctx.require_parent("edit routines")?;
        let template = self.routines.get(template_id).await?;
        ctx.require_family(template.family_id)?;
        self.routines.archive(template.id, ctx.now).await
    }

    pub async fn get_routine(
        &self,
        ctx: &RequestContext,
        template_id: Uuid,
    ) -> Result<RoutineTemplate> {
        let template = self.routines.get(template_id).await?;
        ctx.require_family(template.family_id)?;
        Ok(template)
    }

    pub async fn list_routines(
        &self,
        ctx: &RequestContext,
        family_id: Uuid,
        include_archived: bool,
    ) -> Result<Vec<RoutineTemplate>> {
        ctx.require_family(family_id)?;
        self.routines.list(family_id, include_archived).await
    }
}
