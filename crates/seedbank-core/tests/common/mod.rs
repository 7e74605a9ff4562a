#![allow(dead_code)]

use chrono::{DateTime, Duration, NaiveDate, Utc};
use seedbank_common::{Family, Member, MemberRole, TimeZoneClock, WeekdaySet};
use seedbank_core::{
    Caller, EngineSettings, RequestContext, RoutineDraft, RoutineItemDraft, Seedbank,
};
use seedbank_db::{Database, DatabaseConfig};
use tempfile::TempDir;

pub fn utc(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Local noon of `day` in `zone`.
pub fn noon(zone: &str, day: NaiveDate) -> DateTime<Utc> {
    TimeZoneClock::resolve(zone).unwrap().start_of_date(day) + Duration::hours(12)
}

pub struct Harness {
    _dir: TempDir,
    pub bank: Seedbank,
    pub family: Family,
    pub parent: Member,
    pub child: Member,
}

impl Harness {
    pub async fn new(timezone: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = DatabaseConfig {
            path: dir.path().join("seedbank.db").to_str().unwrap().to_string(),
            ..Default::default()
        };
        let db = Database::new(config).await.unwrap();
        db.run_migrations().await.unwrap();

        let bank = Seedbank::new(db, EngineSettings::default());
        let now = utc("2026-01-01T00:00:00Z");
        let family = bank.create_family("Rivera", Some(timezone), now).await.unwrap();
        let parent = bank.add_member(family.id, "Sam", MemberRole::Parent, None, now).await.unwrap();
        let child = bank
            .add_member(family.id, "Mia", MemberRole::Child, Some("teal".to_string()), now)
            .await
            .unwrap();

        Self { _dir: dir, bank, family, parent, child }
    }

    pub async fn add_child(&self, name: &str) -> Member {
        self.bank
            .add_member(self.family.id, name, MemberRole::Child, None, utc("2026-01-01T00:00:00Z"))
            .await
            .unwrap()
    }

    pub fn parent_at(&self, now: DateTime<Utc>) -> RequestContext {
        RequestContext::new(Caller::from(&self.parent)).at(now)
    }

    pub fn child_at(&self, now: DateTime<Utc>) -> RequestContext {
        RequestContext::new(Caller::from(&self.child)).at(now)
    }

    /// A routine for the harness child with one item per point value.
    pub fn routine(&self, name: &str, weekdays: &str, points: &[i64]) -> RoutineDraft {
        RoutineDraft {
            name: name.to_string(),
            description: None,
            weekdays: weekdays.parse::<WeekdaySet>().unwrap(),
            items: points
                .iter()
                .enumerate()
                .map(|(n, points)| RoutineItemDraft {
                    id: None,
                    title: format!("{} chore {}", name, n + 1),
                    point_value: *points,
                })
                .collect(),
            child_ids: vec![self.child.id],
        }
    }
}
