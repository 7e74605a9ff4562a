pub mod families;
pub mod ledger;
pub mod members;
pub mod privileges;
pub mod routines;
pub mod streaks;
pub mod tasks;

pub use families::FamilyQueries;
pub use ledger::{LedgerQueries, TimeRange};
pub use members::MemberQueries;
pub use privileges::PrivilegeQueries;
pub use routines::RoutineQueries;
pub use streaks::StreakQueries;
pub use tasks::TaskQueries;
