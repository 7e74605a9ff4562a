// Streak state machine
//
// Pure transitions over a child's streak. Persistence and ledger postings live in the
// core crate; everything here is deterministic in (state, day, rewards).

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;

/// Streak lengths that earn a reward, in ascending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StreakThreshold {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl StreakThreshold {
    pub const ALL: [StreakThreshold; 4] = [
        StreakThreshold::Daily,
        StreakThreshold::Weekly,
        StreakThreshold::Monthly,
        StreakThreshold::Yearly,
    ];

    pub fn days(&self) -> u32 {
        match self {
            StreakThreshold::Daily => 1,
            StreakThreshold::Weekly => 7,
            StreakThreshold::Monthly => 31,
            StreakThreshold::Yearly => 365,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StreakThreshold::Daily => "DAILY",
            StreakThreshold::Weekly => "WEEKLY",
            StreakThreshold::Monthly => "MONTHLY",
            StreakThreshold::Yearly => "YEARLY",
        }
    }
}

impl fmt::Display for StreakThreshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StreakThreshold {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DAILY" => Ok(StreakThreshold::Daily),
            "WEEKLY" => Ok(StreakThreshold::Weekly),
            "MONTHLY" => Ok(StreakThreshold::Monthly),
            "YEARLY" => Ok(StreakThreshold::Yearly),
            _ => Err(Error::UnknownVariant { kind: "streak threshold", value: s.to_string() }),
        }
    }
}

/// Family-configured seed reward per threshold. Zero disables a threshold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakRewards {
    pub daily: i64,
    pub weekly: i64,
    pub monthly: i64,
    pub yearly: i64,
}

impl StreakRewards {
    pub fn reward_for(&self, threshold: StreakThreshold) -> i64 {
        match threshold {
            StreakThreshold::Daily => self.daily,
            StreakThreshold::Weekly => self.weekly,
            StreakThreshold::Monthly => self.monthly,
            StreakThreshold::Yearly => self.yearly,
        }
    }

    /// Thresholds with a positive reward, ascending.
    pub fn enabled(&self) -> impl Iterator<Item = (StreakThreshold, i64)> + '_ {
        StreakThreshold::ALL
            .into_iter()
            .map(|threshold| (threshold, self.reward_for(threshold)))
            .filter(|(_, reward)| *reward > 0)
    }

    pub fn validate(&self) -> Result<(), Error> {
        for threshold in StreakThreshold::ALL {
            if self.reward_for(threshold) < 0 {
                return Err(Error::InvalidValue {
                    field: "streak_rewards",
                    message: format!("{} reward must not be negative", threshold),
                });
            }
        }
        Ok(())
    }
}

/// Outcome of feeding a qualifying day into [`StreakState::advance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreakAdvance {
    /// The day was already counted (or is older than the last counted day).
    Unchanged,
    /// First ever qualifying day, or the run restarted after a gap.
    Started,
    /// The day directly follows the previous qualifying day.
    Extended,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakState {
    pub child_id: Uuid,
    pub current: u32,
    pub longest: u32,
    pub last_qualifying_day: Option<NaiveDate>,
    /// Thresholds already paid out during the current unbroken run.
    pub rewarded: BTreeSet<StreakThreshold>,
}

impl StreakState {
    pub fn new(child_id: Uuid) -> Self {
        Self {
            child_id,
            current: 0,
            longest: 0,
            last_qualifying_day: None,
            rewarded: BTreeSet::new(),
        }
    }

    /// Records `day` as having at least one completed task.
    pub fn advance(&mut self, day: NaiveDate) -> StreakAdvance {
        let outcome = match self.last_qualifying_day {
            Some(last) if day <= last => return StreakAdvance::Unchanged,
            Some(last) if day.pred_opt() == Some(last) && self.current > 0 => {
                self.current += 1;
                StreakAdvance::Extended
            }
            _ => {
                self.current = 1;
                self.rewarded.clear();
                StreakAdvance::Started
            }
        };

        // The daily threshold pays once per qualifying day rather than once per run.
        self.rewarded.remove(&StreakThreshold::Daily);
        self.last_qualifying_day = Some(day);
        self.longest = self.longest.max(self.current);
        outcome
    }

    /// Breaks the run when neither today nor yesterday qualified. Returns true on reset.
    pub fn settle(&mut self, today: NaiveDate) -> bool {
        let Some(last) = self.last_qualifying_day else {
            return false;
        };
        let Some(yesterday) = today.pred_opt() else {
            return false;
        };

        if last < yesterday && (self.current > 0 || !self.rewarded.is_empty()) {
            self.current = 0;
            self.rewarded.clear();
            return true;
        }
        false
    }

    /// The count as it would read on `today`, without mutating state.
    pub fn current_on(&self, today: NaiveDate) -> u32 {
        let mut probe = self.clone();
        probe.settle(today);
        probe.current
    }

    /// Marks every newly reached, enabled threshold as rewarded and returns them ascending
    /// with their reward.
    pub fn claim_thresholds(&mut self, rewards: &StreakRewards) -> Vec<(StreakThreshold, i64)> {
        let mut claimed = Vec::new();
        for (threshold, reward) in rewards.enabled() {
            if self.current >= threshold.days() && self.rewarded.insert(threshold) {
                claimed.push((threshold, reward));
            }
        }
        claimed
    }
}
