use crate::time::{Clock, ControlledClock, Timestamp};
use crate::{Error, Result};

/// Replay clock that moves forward a fixed increment per step.
///
/// Steps stop at the end time. External time updates only ever move the
/// clock forward.
#[derive(Debug)]
pub struct FixedStepReplayer {
    start: Timestamp,
    end: Timestamp,
    step_nanos: i64,
    clock: ControlledClock,
}

impl FixedStepReplayer {
    pub fn new(start: Timestamp, end: Timestamp, step_nanos: i64) -> Result<Self> {
        if step_nanos <= 0 {
            return Err(Error::InvalidArgument(format!(
                "replay step must be positive, got {step_nanos}"
            )));
        }
        if end < start {
            return Err(Error::InvalidArgument(format!(
                "replay ends at {end} before it starts at {start}"
            )));
        }
        Ok(Self {
            start,
            end,
            step_nanos,
            clock: ControlledClock::new(start),
        })
    }

    pub fn start(&self) -> Timestamp {
        self.start
    }

    pub fn end(&self) -> Timestamp {
        self.end
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Advance one step, stopping at the end time. Returns the new time.
    pub fn step(&self) -> Timestamp {
        let next = self
            .now()
            .checked_add_nanos(self.step_nanos)
            .map_or(self.end, |t| t.min(self.end));
        self.clock.set_time(next)
    }

    pub fn is_done(&self) -> bool {
        self.now() >= self.end
    }

    /// Jump forward to `t`; earlier times are ignored.
    pub fn set_time(&self, t: Timestamp) -> Timestamp {
        if t <= self.now() {
            return self.now();
        }
        self.clock.set_time(t)
    }
}

impl Clock for FixedStepReplayer {
    fn current_time_nanos(&self) -> i64 {
        self.clock.current_time_nanos()
    }
}
