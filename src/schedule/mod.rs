//! Virtual-time scheduling and replay clocks.

mod replay;
mod scheduler;

pub use replay::FixedStepReplayer;
pub use scheduler::{ControlledScheduler, Task};
