pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod privileges;
pub mod routines;
pub mod scheduler;
pub mod streak;

pub use config::SeedbankConfig;
pub use context::{Caller, RequestContext};
pub use engine::{EngineSettings, LedgerPage, ManualTaskDraft, Seedbank, TaskUpdate};
pub use error::{EngineError, Result};
pub use ledger::{LedgerFilter, LedgerScope, Posting, SeedLedger};
pub use privileges::{PrivilegeDraft, PrivilegeRequestMachine, RequestDecision};
pub use routines::{RoutineDraft, RoutineItemDraft, RoutineManager};
pub use scheduler::{plan_day, PlannedTask, RecurrenceScheduler};
pub use streak::{StreakEngine, StreakGoal, StreakSummary};
