// Streak engine
//
// Advances a child's streak when a task is completed and pays newly reached thresholds.
// Runs inside the completion transaction so the streak row, the task status and the
// reward entries commit together.

use chrono::{DateTime, NaiveDate, Utc};
use seedbank_common::{
    LedgerEntry, LedgerKind, StreakAdvance, StreakRewards, StreakState, StreakThreshold,
};
use seedbank_db::queries::StreakQueries;
use seedbank_db::{Database, DbStreakState};
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::Result;
use crate::ledger::{Posting, SeedLedger};

/// Progress toward one enabled threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakGoal {
    pub threshold: StreakThreshold,
    pub days: u32,
    pub reward: i64,
    /// Days of the current run counted toward this goal, capped at `days`.
    pub progress: u32,
    pub rewarded: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakSummary {
    pub child_id: Uuid,
    pub current: u32,
    pub longest: u32,
    pub last_qualifying_day: Option<NaiveDate>,
    pub goals: Vec<StreakGoal>,
}

impl StreakSummary {
    pub fn from_state(state: &StreakState, rewards: &StreakRewards) -> Self {
        let goals = rewards
            .enabled()
            .map(|(threshold, reward)| StreakGoal {
                threshold,
                days: threshold.days(),
                reward,
                progress: state.current.min(threshold.days()),
                rewarded: state.rewarded.contains(&threshold),
            })
            .collect();

        Self {
            child_id: state.child_id,
            current: state.current,
            longest: state.longest,
            last_qualifying_day: state.last_qualifying_day,
            goals,
        }
    }
}

#[derive(Clone)]
pub struct StreakEngine {
    db: Database,
}

impl StreakEngine {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Counts `day` as qualifying for the child and posts any threshold rewards it unlocks.
    /// The stored run is settled against `today` first, the same way a read settles it, so
    /// the outcome never depends on whether the streak was viewed beforehand.
    pub async fn record_completion(
        conn: &mut SqliteConnection,
        family_id: Uuid,
        child_id: Uuid,
        day: NaiveDate,
        today: NaiveDate,
        rewards: &StreakRewards,
        now: DateTime<Utc>,
    ) -> Result<Vec<LedgerEntry>> {
        let child = child_id.to_string();

        StreakQueries::ensure(&mut *conn, &child, now).await?;
        let mut state = match StreakQueries::find(&mut *conn, &child).await? {
            Some(row) => StreakState::try_from(row)?,
            None => StreakState::new(child_id),
        };
        if state.settle(today) {
            info!("Streak for child {} reset after a missed day", child_id);
        }

        match state.advance(day) {
            StreakAdvance::Unchanged => {
                debug!("Streak for child {} already counts {}", child_id, day);
                return Ok(Vec::new());
            }
            StreakAdvance::Started => info!("Streak for child {} started on {}", child_id, day),
            StreakAdvance::Extended => {
                debug!("Streak for child {} extended to {} days", child_id, state.current)
            }
        }

        let mut entries = Vec::new();
        for (threshold, reward) in state.claim_thresholds(rewards) {
            let posting = Posting::new(family_id, child_id, LedgerKind::StreakReward, reward)
                .note(format!("{} streak reward ({} days)", threshold, state.current));
            entries.push(SeedLedger::post_in(&mut *conn, posting, now).await?);
        }

        StreakQueries::upsert(&mut *conn, &DbStreakState::from_state(&state, now)).await?;

        Ok(entries)
    }

    /// The child's streak as of `today`, breaking a stale run first.
    pub async fn current(
        &self,
        child_id: Uuid,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<StreakState> {
        let pool = self.db.pool()?;
        let child = child_id.to_string();

        if let Some(yesterday) = today.pred_opt() {
            if StreakQueries::reset_if_stale(pool, &child, yesterday, now).await? {
                info!("Streak for child {} reset after a missed day", child_id);
            }
        }

        let mut state = match StreakQueries::find(pool, &child).await? {
            Some(row) => StreakState::try_from(row)?,
            None => StreakState::new(child_id),
        };
        // A completion may land between the reset and the read; settling again keeps the
        // returned view consistent with `today` either way.
        state.settle(today);

        Ok(state)
    }

    pub async fn summary(
        &self,
        child_id: Uuid,
        rewards: &StreakRewards,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<StreakSummary> {
        let state = self.current(child_id, today, now).await?;
        Ok(StreakSummary::from_state(&state, rewards))
    }
}
