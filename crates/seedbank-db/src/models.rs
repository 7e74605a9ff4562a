// Row types mirror the schema; `TryFrom` conversions turn them into the shared domain types.
// Ids are stored as hyphenated UUID text and timestamps as RFC 3339 text.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use seedbank_common::{
    Family, LedgerEntry, LedgerKind, Member, MemberRole, PrivilegeDefinition, PrivilegeRequest,
    RequestStatus, RoutineItem, RoutineTemplate, StreakRewards, StreakState, StreakThreshold,
    TaskInstance, TaskStatus, WeekdaySet,
};

use crate::error::{DbError, Result};

fn parse_id(field: &str, value: &str) -> Result<Uuid> {
    Uuid::parse_str(value)
        .map_err(|e| DbError::InvalidData(format!("{} '{}' is not a UUID: {}", field, value, e)))
}

fn parse_opt_id(field: &str, value: Option<&str>) -> Result<Option<Uuid>> {
    value.map(|v| parse_id(field, v)).transpose()
}

fn parse_count(field: &str, value: i64) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| DbError::InvalidData(format!("{} out of range: {}", field, value)))
}

// ============================================================================
// Families and members
// ============================================================================

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbFamily {
    pub id: String,
    pub name: String,
    pub timezone: String,
    pub daily_streak_reward: i64,
    pub weekly_streak_reward: i64,
    pub monthly_streak_reward: i64,
    pub yearly_streak_reward: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DbFamily {
    pub fn streak_rewards(&self) -> StreakRewards {
        StreakRewards {
            daily: self.daily_streak_reward,
            weekly: self.weekly_streak_reward,
            monthly: self.monthly_streak_reward,
            yearly: self.yearly_streak_reward,
        }
    }
}

impl TryFrom<DbFamily> for Family {
    type Error = DbError;

    fn try_from(row: DbFamily) -> Result<Self> {
        Ok(Family {
            id: parse_id("family id", &row.id)?,
            streak_rewards: row.streak_rewards(),
            name: row.name,
            timezone: row.timezone,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewFamily {
    pub id: String,
    pub name: String,
    pub timezone: String,
    pub created_at: DateTime<Utc>,
}

impl NewFamily {
    pub fn new(name: String, timezone: String, created_at: DateTime<Utc>) -> Self {
        Self { id: Uuid::new_v4().to_string(), name, timezone, created_at }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbMember {
    pub id: String,
    pub family_id: String,
    pub name: String,
    pub role: String,
    pub avatar_tone: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<DbMember> for Member {
    type Error = DbError;

    fn try_from(row: DbMember) -> Result<Self> {
        Ok(Member {
            id: parse_id("member id", &row.id)?,
            family_id: parse_id("family id", &row.family_id)?,
            role: row.role.parse::<MemberRole>()?,
            name: row.name,
            avatar_tone: row.avatar_tone,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewMember {
    pub id: String,
    pub family_id: String,
    pub name: String,
    pub role: MemberRole,
    pub avatar_tone: Option<String>,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Routines
// ============================================================================

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbRoutineTemplate {
    pub id: String,
    pub family_id: String,
    pub name: String,
    pub description: Option<String>,
    pub weekdays: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DbRoutineTemplate {
    pub fn weekday_set(&self) -> Result<WeekdaySet> {
        Ok(self.weekdays.parse::<WeekdaySet>()?)
    }

    /// Assembles the domain template from its active items and assigned children.
    pub fn into_template(
        self,
        items: Vec<DbRoutineItem>,
        assigned_children: Vec<String>,
    ) -> Result<RoutineTemplate> {
        let weekdays = self.weekday_set()?;
        let items = items.into_iter().map(RoutineItem::try_from).collect::<Result<Vec<_>>>()?;
        let assigned_children = assigned_children
            .iter()
            .map(|id| parse_id("child id", id))
            .collect::<Result<Vec<_>>>()?;

        Ok(RoutineTemplate {
            id: parse_id("template id", &self.id)?,
            family_id: parse_id("family id", &self.family_id)?,
            name: self.name,
            description: self.description,
            weekdays,
            active: self.active,
            items,
            assigned_children,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbRoutineItem {
    pub id: String,
    pub template_id: String,
    pub position: i64,
    pub title: String,
    pub point_value: i64,
    pub active: bool,
}

impl TryFrom<DbRoutineItem> for RoutineItem {
    type Error = DbError;

    fn try_from(row: DbRoutineItem) -> Result<Self> {
        Ok(RoutineItem {
            id: parse_id("item id", &row.id)?,
            template_id: parse_id("template id", &row.template_id)?,
            position: row.position,
            title: row.title,
            point_value: row.point_value,
        })
    }
}

/// An item write. `id` set means "update this existing item in place".
#[derive(Debug, Clone)]
pub struct RoutineItemWrite {
    pub id: Option<String>,
    pub title: String,
    pub point_value: i64,
}

#[derive(Debug, Clone)]
pub struct NewRoutineTemplate {
    pub id: String,
    pub family_id: String,
    pub name: String,
    pub description: Option<String>,
    pub weekdays: WeekdaySet,
    pub items: Vec<RoutineItemWrite>,
    pub child_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct RoutineTemplateUpdate {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub weekdays: WeekdaySet,
    pub items: Vec<RoutineItemWrite>,
    pub child_ids: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// Task instances
// ============================================================================

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbTaskInstance {
    pub id: String,
    pub family_id: String,
    pub template_id: Option<String>,
    pub item_id: Option<String>,
    pub child_id: String,
    pub title: String,
    pub point_value: i64,
    pub status: String,
    pub day: NaiveDate,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<DbTaskInstance> for TaskInstance {
    type Error = DbError;

    fn try_from(row: DbTaskInstance) -> Result<Self> {
        Ok(TaskInstance {
            id: parse_id("task id", &row.id)?,
            family_id: parse_id("family id", &row.family_id)?,
            template_id: parse_opt_id("template id", row.template_id.as_deref())?,
            item_id: parse_opt_id("item id", row.item_id.as_deref())?,
            child_id: parse_id("child id", &row.child_id)?,
            status: row.status.parse::<TaskStatus>()?,
            title: row.title,
            point_value: row.point_value,
            day: row.day,
            completed_at: row.completed_at,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewTaskInstance {
    pub id: String,
    pub family_id: String,
    pub template_id: Option<String>,
    pub item_id: Option<String>,
    pub child_id: String,
    pub title: String,
    pub point_value: i64,
    pub day: NaiveDate,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Ledger
// ============================================================================

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbLedgerEntry {
    pub id: i64,
    pub family_id: String,
    pub child_id: String,
    pub kind: String,
    pub amount: i64,
    pub note: Option<String>,
    pub author_id: Option<String>,
    pub task_id: Option<String>,
    pub request_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<DbLedgerEntry> for LedgerEntry {
    type Error = DbError;

    fn try_from(row: DbLedgerEntry) -> Result<Self> {
        Ok(LedgerEntry {
            id: row.id,
            family_id: parse_id("family id", &row.family_id)?,
            child_id: parse_id("child id", &row.child_id)?,
            kind: row.kind.parse::<LedgerKind>()?,
            amount: row.amount,
            author_id: parse_opt_id("author id", row.author_id.as_deref())?,
            task_id: parse_opt_id("task id", row.task_id.as_deref())?,
            request_id: parse_opt_id("request id", row.request_id.as_deref())?,
            note: row.note,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewLedgerEntry {
    pub family_id: String,
    pub child_id: String,
    pub kind: LedgerKind,
    /// Signed amount; never zero.
    pub amount: i64,
    pub note: Option<String>,
    pub author_id: Option<String>,
    pub task_id: Option<String>,
    pub request_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Streaks
// ============================================================================

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbStreakState {
    pub child_id: String,
    pub current_count: i64,
    pub longest_count: i64,
    pub last_qualifying_day: Option<NaiveDate>,
    /// Comma separated thresholds, e.g. `DAILY,WEEKLY`.
    pub rewarded: String,
    pub updated_at: DateTime<Utc>,
}

impl DbStreakState {
    pub fn from_state(state: &StreakState, updated_at: DateTime<Utc>) -> Self {
        Self {
            child_id: state.child_id.to_string(),
            current_count: i64::from(state.current),
            longest_count: i64::from(state.longest),
            last_qualifying_day: state.last_qualifying_day,
            rewarded: state
                .rewarded
                .iter()
                .map(StreakThreshold::as_str)
                .collect::<Vec<_>>()
                .join(","),
            updated_at,
        }
    }
}

impl TryFrom<DbStreakState> for StreakState {
    type Error = DbError;

    fn try_from(row: DbStreakState) -> Result<Self> {
        let rewarded = row
            .rewarded
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| part.parse::<StreakThreshold>().map_err(DbError::from))
            .collect::<Result<BTreeSet<_>>>()?;

        Ok(StreakState {
            child_id: parse_id("child id", &row.child_id)?,
            current: parse_count("current_count", row.current_count)?,
            longest: parse_count("longest_count", row.longest_count)?,
            last_qualifying_day: row.last_qualifying_day,
            rewarded,
        })
    }
}

// ============================================================================
// Privileges
// ============================================================================

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbPrivilegeDefinition {
    pub id: String,
    pub family_id: String,
    pub title: String,
    pub description: Option<String>,
    pub cost: i64,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DbPrivilegeDefinition> for PrivilegeDefinition {
    type Error = DbError;

    fn try_from(row: DbPrivilegeDefinition) -> Result<Self> {
        Ok(PrivilegeDefinition {
            id: parse_id("privilege id", &row.id)?,
            family_id: parse_id("family id", &row.family_id)?,
            title: row.title,
            description: row.description,
            cost: row.cost,
            active: row.active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewPrivilegeDefinition {
    pub id: String,
    pub family_id: String,
    pub title: String,
    pub description: Option<String>,
    pub cost: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbPrivilegeRequest {
    pub id: String,
    pub family_id: String,
    pub privilege_id: String,
    pub child_id: String,
    pub title: String,
    pub cost: i64,
    pub status: String,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<String>,
    pub terminated_at: Option<DateTime<Utc>>,
    pub terminated_by: Option<String>,
}

impl TryFrom<DbPrivilegeRequest> for PrivilegeRequest {
    type Error = DbError;

    fn try_from(row: DbPrivilegeRequest) -> Result<Self> {
        Ok(PrivilegeRequest {
            id: parse_id("request id", &row.id)?,
            family_id: parse_id("family id", &row.family_id)?,
            privilege_id: parse_id("privilege id", &row.privilege_id)?,
            child_id: parse_id("child id", &row.child_id)?,
            status: row.status.parse::<RequestStatus>()?,
            resolved_by: parse_opt_id("resolved by", row.resolved_by.as_deref())?,
            terminated_by: parse_opt_id("terminated by", row.terminated_by.as_deref())?,
            title: row.title,
            cost: row.cost,
            note: row.note,
            created_at: row.created_at,
            resolved_at: row.resolved_at,
            terminated_at: row.terminated_at,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewPrivilegeRequest {
    pub id: String,
    pub family_id: String,
    pub privilege_id: String,
    pub child_id: String,
    pub title: String,
    pub cost: i64,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}
