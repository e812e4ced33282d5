pub mod clock;
pub mod generator;
pub mod grid;
pub mod lifecycle;
pub mod schedule;

pub use clock::{Clock, FixedClock, SystemClock};
pub use generator::SlotGenerator;
pub use lifecycle::SlotLifecycleService;
pub use schedule::{ScheduleService, SimulatedLatency};
