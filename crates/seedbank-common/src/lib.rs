pub mod clock;
pub mod error;
pub mod streak;
pub mod types;

pub use clock::{day_bounds, start_of_day, weekday_key, DayBounds, TimeZoneClock};
pub use error::{Error, Result, TimeZoneError};
pub use streak::{StreakAdvance, StreakRewards, StreakState, StreakThreshold};
pub use types::*;
