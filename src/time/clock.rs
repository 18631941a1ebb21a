use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::time::timestamp::Timestamp;

/// A source of the current time.
///
/// Wall-clock, TSC-based and manually driven clocks all implement this, so
/// code that needs "now" takes a `&dyn Clock` instead of reading the system
/// time directly.
pub trait Clock: Send + Sync + 'static {
    /// Nanoseconds since the UNIX epoch.
    fn current_time_nanos(&self) -> i64;

    /// Milliseconds since the UNIX epoch.
    fn current_time_millis(&self) -> i64 {
        self.current_time_nanos() / 1_000_000
    }
}

fn system_nanos() -> i64 {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(elapsed) => i64::try_from(elapsed.as_nanos()).unwrap_or(i64::MAX),
        Err(before) => i64::try_from(before.duration().as_nanos()).map_or(i64::MIN + 1, |n| -n),
    }
}

/// A clock that uses `std::time::SystemTime`.
///
/// Susceptible to NTP adjustments, but requires no calibration.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn current_time_nanos(&self) -> i64 {
        system_nanos()
    }
}

/// A clock that uses the CPU's Time-Stamp Counter (TSC) via the `quanta` crate.
///
/// Anchors to `SystemTime` at construction and then advances with TSC ticks,
/// so it never steps backwards.
#[derive(Debug, Clone)]
pub struct QuantaClock {
    clock: quanta::Clock,
    start_wall_ns: i64,
    start_instant: quanta::Instant,
}

impl Default for QuantaClock {
    fn default() -> Self {
        let clock = quanta::Clock::new();
        let start_instant = clock.now();
        Self {
            clock,
            start_wall_ns: system_nanos(),
            start_instant,
        }
    }
}

impl QuantaClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for QuantaClock {
    fn current_time_nanos(&self) -> i64 {
        let delta = self.clock.now().duration_since(self.start_instant);
        let delta = i64::try_from(delta.as_nanos()).unwrap_or(i64::MAX);
        self.start_wall_ns.saturating_add(delta)
    }
}

/// A clock that only moves when told to.
///
/// Used for replay and tests. Time never goes backwards: `set_time` with an
/// earlier value is ignored.
#[derive(Debug, Default)]
pub struct ControlledClock {
    nanos: AtomicI64,
}

impl ControlledClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            nanos: AtomicI64::new(start.nanos()),
        }
    }

    /// Move the clock to `t` unless it already reads later. Returns the new reading.
    pub fn set_time(&self, t: Timestamp) -> Timestamp {
        let previous = self.nanos.fetch_max(t.nanos(), Ordering::AcqRel);
        if previous > t.nanos() {
            log::debug!("ignoring backwards clock move from {previous} to {}", t.nanos());
        }
        Timestamp::from_nanos_unchecked(previous.max(t.nanos()))
    }

    /// Advance by `nanos`, saturating at the end of the range.
    pub fn advance(&self, nanos: i64) -> Timestamp {
        let delta = nanos.max(0);
        let mut current = self.nanos.load(Ordering::Acquire);
        loop {
            let next = current.saturating_add(delta);
            match self
                .nanos
                .compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return Timestamp::from_nanos_unchecked(next),
                Err(actual) => current = actual,
            }
        }
    }

    pub fn now(&self) -> Timestamp {
        Timestamp::from_nanos_unchecked(self.nanos.load(Ordering::Acquire))
    }
}

impl Clock for ControlledClock {
    fn current_time_nanos(&self) -> i64 {
        self.nanos.load(Ordering::Acquire)
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn current_time_nanos(&self) -> i64 {
        (**self).current_time_nanos()
    }
}

/// Holder for an optional clock override.
///
/// Components that need "now" are handed a context instead of consulting
/// process-wide state. With no override installed, [`ClockContext::current`]
/// is the system clock.
#[derive(Default)]
pub struct ClockContext {
    clock: RwLock<Option<Arc<dyn Clock>>>,
}

impl ClockContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock: RwLock::new(Some(clock)),
        }
    }

    /// Install an override, or clear it with `None`.
    pub fn set_clock(&self, clock: Option<Arc<dyn Clock>>) {
        let mut guard = self.clock.write().unwrap_or_else(|e| e.into_inner());
        *guard = clock;
    }

    /// The override if installed, otherwise the system clock.
    pub fn current(&self) -> Arc<dyn Clock> {
        let guard = self.clock.read().unwrap_or_else(|e| e.into_inner());
        match guard.as_ref() {
            Some(clock) => Arc::clone(clock),
            None => Arc::new(SystemClock),
        }
    }

    pub fn is_overridden(&self) -> bool {
        self.clock
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    /// Current time according to [`ClockContext::current`].
    pub fn now(&self) -> Timestamp {
        Timestamp::now(self.current().as_ref())
    }

    /// Current time truncated to millisecond resolution.
    pub fn now_millis_resolution(&self) -> Timestamp {
        let millis = self.current().current_time_millis();
        Timestamp::from_nanos(millis.saturating_mul(1_000_000)).unwrap_or(Timestamp::EPOCH)
    }
}

impl std::fmt::Debug for ClockContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClockContext")
            .field("overridden", &self.is_overridden())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn controlled_clock_is_monotonic() {
        let clock = ControlledClock::new(Timestamp::from_nanos(100).expect("valid"));
        let later = Timestamp::from_nanos(500).expect("valid");
        let earlier = Timestamp::from_nanos(200).expect("valid");
        assert_eq!(clock.set_time(later), later);
        assert_eq!(clock.set_time(earlier), later);
        assert_eq!(clock.current_time_nanos(), 500);
        assert_eq!(clock.advance(25).nanos(), 525);
        assert_eq!(clock.advance(-10).nanos(), 525);
    }

    #[test]
    fn millis_derive_from_nanos() {
        let clock = ControlledClock::new(Timestamp::from_nanos(1_234_567_890).expect("valid"));
        assert_eq!(clock.current_time_millis(), 1_234);
    }

    #[test]
    fn context_falls_back_to_system_clock() {
        let ctx = ClockContext::new();
        assert!(!ctx.is_overridden());
        let before = SystemClock.current_time_nanos();
        let now = ctx.now().nanos();
        assert!(now >= before);

        let fixed = Arc::new(ControlledClock::new(Timestamp::from_nanos(42).expect("valid")));
        ctx.set_clock(Some(fixed));
        assert_eq!(ctx.now().nanos(), 42);

        ctx.set_clock(None);
        assert!(ctx.now().nanos() >= before);
    }

    #[test]
    fn quanta_clock_tracks_wall_time() {
        let clock = QuantaClock::new();
        let wall = SystemClock.current_time_nanos();
        let tsc = clock.current_time_nanos();
        assert!((tsc - wall).abs() < 5_000_000_000);
    }
}
