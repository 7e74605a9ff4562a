// Seed ledger
//
// Entries are only ever appended. A balance is the sum of a child's entries and is never
// stored; every posting is a single INSERT so concurrent postings cannot lose each other.

use chrono::{DateTime, NaiveDate, Utc};
use seedbank_common::{LedgerEntry, LedgerKind, TimeZoneClock};
use seedbank_db::queries::{LedgerQueries, TimeRange};
use seedbank_db::{Database, DbLedgerEntry, NewLedgerEntry};
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use tracing::info;
use uuid::Uuid;

use crate::error::{EngineError, Result};

/// Which entries a ledger listing covers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", content = "day", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerScope {
    #[default]
    All,
    /// The family-local day containing "now".
    Today,
    Day(NaiveDate),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerFilter {
    #[serde(flatten)]
    pub scope: LedgerScope,
    pub limit: Option<i64>,
}

impl LedgerFilter {
    pub fn today() -> Self {
        Self { scope: LedgerScope::Today, limit: None }
    }

    /// The `created_at` window this filter selects, or None for all time.
    pub fn range(&self, clock: &TimeZoneClock, now: DateTime<Utc>) -> Option<TimeRange> {
        let bounds = match self.scope {
            LedgerScope::All => return None,
            LedgerScope::Today => clock.day_bounds(now),
            LedgerScope::Day(day) => clock.date_bounds(day),
        };
        Some(TimeRange { start: bounds.start, end: bounds.end })
    }
}

/// A credit or debit to record. `magnitude` is positive; the kind decides the sign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posting {
    pub family_id: Uuid,
    pub child_id: Uuid,
    pub kind: LedgerKind,
    pub magnitude: i64,
    pub note: Option<String>,
    pub author_id: Option<Uuid>,
    pub task_id: Option<Uuid>,
    pub request_id: Option<Uuid>,
}

impl Posting {
    pub fn new(family_id: Uuid, child_id: Uuid, kind: LedgerKind, magnitude: i64) -> Self {
        Self {
            family_id,
            child_id,
            kind,
            magnitude,
            note: None,
            author_id: None,
            task_id: None,
            request_id: None,
        }
    }

    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn author(mut self, author_id: Uuid) -> Self {
        self.author_id = Some(author_id);
        self
    }

    pub fn task(mut self, task_id: Uuid) -> Self {
        self.task_id = Some(task_id);
        self
    }

    pub fn request(mut self, request_id: Uuid) -> Self {
        self.request_id = Some(request_id);
        self
    }

    fn into_row(self, now: DateTime<Utc>) -> Result<NewLedgerEntry> {
        if self.magnitude <= 0 {
            return Err(EngineError::Validation(format!(
                "{} amount must be a positive number of seeds, got {}",
                self.kind, self.magnitude
            )));
        }

        Ok(NewLedgerEntry {
            family_id: self.family_id.to_string(),
            child_id: self.child_id.to_string(),
            kind: self.kind,
            amount: self.kind.signed(self.magnitude),
            note: self.note.filter(|n| !n.trim().is_empty()),
            author_id: self.author_id.map(|id| id.to_string()),
            task_id: self.task_id.map(|id| id.to_string()),
            request_id: self.request_id.map(|id| id.to_string()),
            created_at: now,
        })
    }
}

fn to_entry(row: DbLedgerEntry) -> Result<LedgerEntry> {
    Ok(LedgerEntry::try_from(row)?)
}

#[derive(Clone)]
pub struct SeedLedger {
    db: Database,
}

impl SeedLedger {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Appends inside the caller's transaction.
    pub async fn post_in(
        conn: &mut SqliteConnection,
        posting: Posting,
        now: DateTime<Utc>,
    ) -> Result<LedgerEntry> {
        let row = posting.into_row(now)?;
        let entry = to_entry(LedgerQueries::insert(&mut *conn, &row).await?)?;

        info!(
            "Posted {} {} for child {} (entry {})",
            entry.kind, entry.amount, entry.child_id, entry.id
        );

        Ok(entry)
    }

    pub async fn post(&self, posting: Posting, now: DateTime<Utc>) -> Result<LedgerEntry> {
        let mut conn = self.db.pool()?.acquire().await?;
        Self::post_in(&mut conn, posting, now).await
    }

    pub async fn balance_of(&self, child_id: Uuid) -> Result<i64> {
        Ok(LedgerQueries::balance(self.db.pool()?, &child_id.to_string()).await?)
    }

    /// A child's entries, newest first.
    pub async fn entries_for(
        &self,
        child_id: Uuid,
        range: Option<TimeRange>,
        limit: i64,
    ) -> Result<Vec<LedgerEntry>> {
        LedgerQueries::list_for_child(self.db.pool()?, &child_id.to_string(), range, limit)
            .await?
            .into_iter()
            .map(to_entry)
            .collect()
    }

    pub async fn family_entries(
        &self,
        family_id: Uuid,
        range: Option<TimeRange>,
        limit: i64,
    ) -> Result<Vec<LedgerEntry>> {
        LedgerQueries::list_for_family(self.db.pool()?, &family_id.to_string(), range, limit)
            .await?
            .into_iter()
            .map(to_entry)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_posting_applies_sign_convention() {
        let now = Utc::now();
        let (family, child) = (Uuid::new_v4(), Uuid::new_v4());

        let gift = Posting::new(family, child, LedgerKind::Gift, 10).into_row(now).unwrap();
        assert_eq!(gift.amount, 10);

        let penalty = Posting::new(family, child, LedgerKind::Penalty, 4).into_row(now).unwrap();
        assert_eq!(penalty.amount, -4);

        let redemption =
            Posting::new(family, child, LedgerKind::PrivilegeRedemption, 30).into_row(now).unwrap();
        assert_eq!(redemption.amount, -30);
    }

    #[test]
    fn test_posting_rejects_non_positive_magnitude() {
        let (family, child) = (Uuid::new_v4(), Uuid::new_v4());
        for magnitude in [0, -5] {
            let result = Posting::new(family, child, LedgerKind::Gift, magnitude).into_row(Utc::now());
            assert!(matches!(result, Err(EngineError::Validation(_))));
        }
    }

    #[test]
    fn test_blank_note_is_dropped() {
        let row = Posting::new(Uuid::new_v4(), Uuid::new_v4(), LedgerKind::Gift, 1)
            .note("   ")
            .into_row(Utc::now())
            .unwrap();
        assert!(row.note.is_none());
    }

    #[test]
    fn test_today_filter_uses_family_day() {
        let clock = TimeZoneClock::resolve("America/New_York").unwrap();
        let now = utc("2026-01-20T03:00:00Z");

        let range = LedgerFilter::today().range(&clock, now).unwrap();
        assert_eq!(range.start, utc("2026-01-19T05:00:00Z"));
        assert_eq!(range.end, utc("2026-01-20T05:00:00Z"));

        assert!(LedgerFilter::default().range(&clock, now).is_none());
    }

    #[test]
    fn test_filter_wire_shape() {
        let filter = LedgerFilter {
            scope: LedgerScope::Day(NaiveDate::from_ymd_opt(2026, 1, 19).unwrap()),
            limit: Some(10),
        };
        let json = serde_json::to_value(filter).unwrap();
        assert_eq!(json, serde_json::json!({"scope": "DAY", "day": "2026-01-19", "limit": 10}));

        let today: LedgerFilter = serde_json::from_value(serde_json::json!({"scope": "TODAY"})).unwrap();
        assert_eq!(today, LedgerFilter::today());
    }
}
