use std::time::Duration;

/// Accumulated scheduler time.
///
/// Advances only when the host ticks, so "now" is frame time, not wall time:
/// deadlines are observed at tick granularity and never between ticks.
#[derive(Debug, Clone, Copy, Default)]
pub struct Clock {
    now: f64,
    frame: u64,
}

impl Clock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&mut self, dt: f32) {
        self.now += f64::from(dt);
        self.frame += 1;
    }

    /// Seconds accumulated since the clock was created.
    pub fn now(&self) -> f64 {
        self.now
    }

    /// Ticks elapsed since the clock was created.
    pub fn frame(&self) -> u64 {
        self.frame
    }
}

/// A one-shot deadline against the [`Clock`].
///
/// Settles once clock time reaches the deadline; checked once per tick, so
/// resolution is bounded by the tick rate. Never fails.
#[derive(Debug, Clone, Copy)]
pub struct TimerFuture {
    deadline: f64,
}

impl TimerFuture {
    pub(crate) fn after(now: f64, duration: Duration) -> Self {
        Self {
            deadline: now + duration.as_secs_f64(),
        }
    }

    pub fn settled(&self, now: f64) -> bool {
        now >= self.deadline
    }

    pub fn deadline(&self) -> f64 {
        self.deadline
    }
}

/// Converts variable frame deltas into a whole number of fixed steps.
///
/// The accumulator is capped at ten steps' worth so a long stall cannot snowball
/// into an ever-growing burst of catch-up ticks.
#[derive(Debug)]
pub struct FixedTimestep {
    dt: f32,
    accumulator: f32,
}

impl FixedTimestep {
    pub fn new(dt: f32) -> Self {
        Self { dt, accumulator: 0.0 }
    }

    /// Feed one frame's delta; returns how many fixed steps are due.
    pub fn accumulate(&mut self, frame_dt: f32) -> u32 {
        self.accumulator = (self.accumulator + frame_dt).min(self.dt * 10.0);
        let steps = (self.accumulator / self.dt) as u32;
        self.accumulator -= steps as f32 * self.dt;
        steps
    }

    /// Fraction of a step left in the accumulator, for render interpolation.
    pub fn alpha(&self) -> f32 {
        self.accumulator / self.dt
    }

    pub fn dt(&self) -> f32 {
        self.dt
    }
}
