pub mod clock;
pub mod due;
pub mod scheduler;

pub use clock::{Clock, SystemClock};
pub use scheduler::{ReminderScheduler, SchedulerState};
