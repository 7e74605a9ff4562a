use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;
use crate::streak::StreakRewards;

// ============================================================================
// Families and members
// ============================================================================

/// A household sharing one timezone, one routine catalogue and one privilege catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Family {
    pub id: Uuid,
    pub name: String,
    /// IANA zone name used for every "what day is it" question about this family.
    pub timezone: String,
    pub streak_rewards: StreakRewards,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemberRole {
    Parent,
    Child,
}

impl MemberRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberRole::Parent => "PARENT",
            MemberRole::Child => "CHILD",
        }
    }
}

impl fmt::Display for MemberRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemberRole {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PARENT" => Ok(MemberRole::Parent),
            "CHILD" => Ok(MemberRole::Child),
            _ => Err(Error::UnknownVariant { kind: "member role", value: s.to_string() }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: Uuid,
    /// Lookup reference only; members do not own their family.
    pub family_id: Uuid,
    pub name: String,
    pub role: MemberRole,
    pub avatar_tone: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Member {
    pub fn is_parent(&self) -> bool {
        self.role == MemberRole::Parent
    }

    pub fn is_child(&self) -> bool {
        self.role == MemberRole::Child
    }
}

// ============================================================================
// Weekdays
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Weekday {
    Sun,
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Sun,
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
    ];

    /// Uppercase three-letter key, e.g. `MON`.
    pub fn as_key(&self) -> &'static str {
        match self {
            Weekday::Sun => "SUN",
            Weekday::Mon => "MON",
            Weekday::Tue => "TUE",
            Weekday::Wed => "WED",
            Weekday::Thu => "THU",
            Weekday::Fri => "FRI",
            Weekday::Sat => "SAT",
        }
    }

    pub fn of_date(date: NaiveDate) -> Self {
        date.weekday().into()
    }
}

impl From<chrono::Weekday> for Weekday {
    fn from(day: chrono::Weekday) -> Self {
        match day {
            chrono::Weekday::Sun => Weekday::Sun,
            chrono::Weekday::Mon => Weekday::Mon,
            chrono::Weekday::Tue => Weekday::Tue,
            chrono::Weekday::Wed => Weekday::Wed,
            chrono::Weekday::Thu => Weekday::Thu,
            chrono::Weekday::Fri => Weekday::Fri,
            chrono::Weekday::Sat => Weekday::Sat,
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_key())
    }
}

impl FromStr for Weekday {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SUN" | "SUNDAY" => Ok(Weekday::Sun),
            "MON" | "MONDAY" => Ok(Weekday::Mon),
            "TUE" | "TUESDAY" => Ok(Weekday::Tue),
            "WED" | "WEDNESDAY" => Ok(Weekday::Wed),
            "THU" | "THURSDAY" => Ok(Weekday::Thu),
            "FRI" | "FRIDAY" => Ok(Weekday::Fri),
            "SAT" | "SATURDAY" => Ok(Weekday::Sat),
            _ => Err(Error::UnknownWeekday(s.to_string())),
        }
    }
}

/// The days a routine is active on. An empty set is treated as "every day".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeekdaySet(BTreeSet<Weekday>);

impl WeekdaySet {
    pub fn every_day() -> Self {
        Self(Weekday::ALL.into_iter().collect())
    }

    pub fn contains(&self, day: Weekday) -> bool {
        self.0.is_empty() || self.0.contains(&day)
    }

    pub fn days(&self) -> Vec<Weekday> {
        if self.0.is_empty() {
            return Weekday::ALL.to_vec();
        }
        self.0.iter().copied().collect()
    }

    /// Comma separated keys in week order, e.g. `MON,WED,FRI`.
    pub fn to_key_string(&self) -> String {
        self.days().iter().map(Weekday::as_key).collect::<Vec<_>>().join(",")
    }
}

impl FromIterator<Weekday> for WeekdaySet {
    fn from_iter<I: IntoIterator<Item = Weekday>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl FromStr for WeekdaySet {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(Weekday::from_str)
            .collect::<Result<WeekdaySet, _>>()
    }
}

// ============================================================================
// Routines and tasks
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutineItem {
    pub id: Uuid,
    pub template_id: Uuid,
    pub position: i64,
    pub title: String,
    pub point_value: i64,
}

/// A reusable set of chores bound to weekdays and assigned to children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutineTemplate {
    pub id: Uuid,
    pub family_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub weekdays: WeekdaySet,
    pub active: bool,
    /// Active items in display order.
    pub items: Vec<RoutineItem>,
    pub assigned_children: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RoutineTemplate {
    pub fn is_due_on(&self, day: NaiveDate) -> bool {
        self.active && self.weekdays.contains(Weekday::of_date(day))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Pending,
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "PENDING",
            TaskStatus::Completed => "COMPLETED",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(TaskStatus::Pending),
            "COMPLETED" => Ok(TaskStatus::Completed),
            _ => Err(Error::UnknownVariant { kind: "task status", value: s.to_string() }),
        }
    }
}

/// One chore for one child on one family-local day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskInstance {
    pub id: Uuid,
    pub family_id: Uuid,
    /// `None` for manual tasks.
    pub template_id: Option<Uuid>,
    pub item_id: Option<Uuid>,
    pub child_id: Uuid,
    pub title: String,
    /// Snapshot of the item's value when the instance was materialized.
    pub point_value: i64,
    pub status: TaskStatus,
    pub day: NaiveDate,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl TaskInstance {
    pub fn is_manual(&self) -> bool {
        self.template_id.is_none()
    }

    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }
}

// ============================================================================
// Ledger
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerKind {
    TaskReward,
    StreakReward,
    Gift,
    Penalty,
    PrivilegeRedemption,
    /// Compensates a task reward when a completed task is set back to pending.
    TaskReversal,
}

impl LedgerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerKind::TaskReward => "TASK_REWARD",
            LedgerKind::StreakReward => "STREAK_REWARD",
            LedgerKind::Gift => "GIFT",
            LedgerKind::Penalty => "PENALTY",
            LedgerKind::PrivilegeRedemption => "PRIVILEGE_REDEMPTION",
            LedgerKind::TaskReversal => "TASK_REVERSAL",
        }
    }

    pub fn is_credit(&self) -> bool {
        matches!(self, LedgerKind::TaskReward | LedgerKind::StreakReward | LedgerKind::Gift)
    }

    /// Kinds a parent may post by hand; everything else is issued by the core itself.
    pub fn is_manual(&self) -> bool {
        matches!(self, LedgerKind::Gift | LedgerKind::Penalty)
    }

    /// Applies the kind's sign convention to a positive magnitude.
    pub fn signed(&self, magnitude: i64) -> i64 {
        if self.is_credit() {
            magnitude
        } else {
            -magnitude
        }
    }
}

impl fmt::Display for LedgerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LedgerKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TASK_REWARD" => Ok(LedgerKind::TaskReward),
            "STREAK_REWARD" => Ok(LedgerKind::StreakReward),
            "GIFT" => Ok(LedgerKind::Gift),
            "PENALTY" => Ok(LedgerKind::Penalty),
            "PRIVILEGE_REDEMPTION" => Ok(LedgerKind::PrivilegeRedemption),
            "TASK_REVERSAL" => Ok(LedgerKind::TaskReversal),
            _ => Err(Error::UnknownVariant { kind: "ledger kind", value: s.to_string() }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: i64,
    pub family_id: Uuid,
    pub child_id: Uuid,
    pub kind: LedgerKind,
    /// Signed seeds; credits are positive, debits negative.
    pub amount: i64,
    pub note: Option<String>,
    pub author_id: Option<Uuid>,
    pub task_id: Option<Uuid>,
    pub request_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Privileges
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivilegeDefinition {
    pub id: Uuid,
    pub family_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub cost: i64,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    /// Waiting for a parent decision
    Pending,
    /// Seeds debited; the ticket is active until terminated
    Approved,
    /// Declined without any ledger effect
    Rejected,
    /// Ticket used up
    Terminated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestAction {
    Decide,
    Terminate,
}

impl fmt::Display for RequestAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestAction::Decide => f.write_str("decide"),
            RequestAction::Terminate => f.write_str("terminate"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot {action} a request that is {from}")]
pub struct InvalidTransition {
    pub from: RequestStatus,
    pub action: RequestAction,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "PENDING",
            RequestStatus::Approved => "APPROVED",
            RequestStatus::Rejected => "REJECTED",
            RequestStatus::Terminated => "TERMINATED",
        }
    }

    pub fn is_final(&self) -> bool {
        matches!(self, RequestStatus::Rejected | RequestStatus::Terminated)
    }

    pub fn decide(self, decision: Decision) -> Result<RequestStatus, InvalidTransition> {
        match self {
            RequestStatus::Pending => Ok(decision.into()),
            from => Err(InvalidTransition { from, action: RequestAction::Decide }),
        }
    }

    pub fn terminate(self) -> Result<RequestStatus, InvalidTransition> {
        match self {
            RequestStatus::Approved => Ok(RequestStatus::Terminated),
            from => Err(InvalidTransition { from, action: RequestAction::Terminate }),
        }
    }
}

impl From<Decision> for RequestStatus {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Approved => RequestStatus::Approved,
            Decision::Rejected => RequestStatus::Rejected,
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(RequestStatus::Pending),
            "APPROVED" => Ok(RequestStatus::Approved),
            "REJECTED" => Ok(RequestStatus::Rejected),
            "TERMINATED" => Ok(RequestStatus::Terminated),
            _ => Err(Error::UnknownVariant { kind: "request status", value: s.to_string() }),
        }
    }
}

impl FromStr for Decision {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "APPROVED" | "APPROVE" => Ok(Decision::Approved),
            "REJECTED" | "REJECT" => Ok(Decision::Rejected),
            _ => Err(Error::UnknownVariant { kind: "decision", value: s.to_string() }),
        }
    }
}

/// A child's request to spend seeds on a privilege (a "ticket" once approved).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivilegeRequest {
    pub id: Uuid,
    pub family_id: Uuid,
    pub privilege_id: Uuid,
    pub child_id: Uuid,
    /// Title and cost are copied from the definition when the request is created.
    pub title: String,
    pub cost: i64,
    pub status: RequestStatus,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<Uuid>,
    pub terminated_at: Option<DateTime<Utc>>,
    pub terminated_by: Option<Uuid>,
}
