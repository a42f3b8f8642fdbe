/// Periodic generate/submit loop
pub mod simulation;

pub use simulation::{RunReport, SchedulerConfig, SchedulerState, SimulationScheduler, StopHandle};
