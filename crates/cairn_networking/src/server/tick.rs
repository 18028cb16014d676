//! # Fixed-Rate Tick Loop
//!
//! Drives the server world and the headless client at `world.tick_rate`.
//!
//! Every tick simulates the same `dt`. Wall time is banked in a backlog and
//! paid out one step at a time, so a stall is caught up with extra ticks
//! instead of a longer `dt`. The backlog is capped: after a long stall (a
//! debugger, a suspended laptop) the loop drops the excess rather than
//! running hundreds of ticks back to back.

use std::time::{Duration, Instant};

/// Most steps the backlog may hold.
const MAX_BACKLOG_STEPS: u32 = 8;

/// Timing of executed ticks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TickStats {
    /// Ticks measured.
    pub total_ticks: u64,
    /// Ticks whose work exceeded one step.
    pub late_ticks: u64,
    /// Steps discarded from an overfull backlog.
    pub dropped_ticks: u64,
    /// Shortest tick, microseconds.
    pub min_tick_us: u64,
    /// Longest tick, microseconds.
    pub max_tick_us: u64,
    /// Exponential moving average, microseconds.
    pub avg_tick_us: u64,
}

impl TickStats {
    fn new(step: Duration) -> Self {
        Self {
            total_ticks: 0,
            late_ticks: 0,
            dropped_ticks: 0,
            min_tick_us: u64::MAX,
            max_tick_us: 0,
            avg_tick_us: micros(step),
        }
    }

    fn record(&mut self, work: Duration, step: Duration) {
        let us = micros(work);
        self.total_ticks += 1;
        self.min_tick_us = self.min_tick_us.min(us);
        self.max_tick_us = self.max_tick_us.max(us);
        self.avg_tick_us = self.avg_tick_us - self.avg_tick_us / 16 + us / 16;
        if work > step {
            self.late_ticks += 1;
            tracing::debug!(work_us = us, budget_us = micros(step), "Late tick");
        }
    }
}

fn micros(duration: Duration) -> u64 {
    u64::try_from(duration.as_micros()).unwrap_or(u64::MAX)
}

/// Fixed-timestep scheduler.
///
/// ```rust,ignore
/// let mut ticks = TickLoop::new(60);
/// loop {
///     while ticks.should_tick() {
///         let started = ticks.begin_tick();
///         world.tick(ticks.dt());
///         ticks.end_tick(started);
///     }
///     ticks.wait_for_next_tick();
/// }
/// ```
#[derive(Debug)]
pub struct TickLoop {
    step: Duration,
    /// Last time wall clock was banked.
    clock: Instant,
    /// Wall time owed to the simulation.
    backlog: Duration,
    ticks: u64,
    stats: TickStats,
}

impl TickLoop {
    /// A loop running `tick_rate` times per second (at least once).
    #[must_use]
    pub fn new(tick_rate: u32) -> Self {
        let step = Duration::from_secs(1) / tick_rate.max(1);
        Self {
            step,
            clock: Instant::now(),
            backlog: Duration::ZERO,
            ticks: 0,
            stats: TickStats::new(step),
        }
    }

    /// Banks elapsed wall time. True while at least one step is owed.
    #[must_use]
    pub fn should_tick(&mut self) -> bool {
        let now = Instant::now();
        self.backlog += now - self.clock;
        self.clock = now;

        let cap = self.step * MAX_BACKLOG_STEPS;
        if self.backlog > cap {
            let excess = self.backlog - cap;
            let dropped = (excess.as_nanos() / self.step.as_nanos().max(1)) as u64;
            self.stats.dropped_ticks += dropped;
            tracing::warn!(dropped, "Tick backlog overflow, skipping ahead");
            self.backlog = cap;
        }
        self.backlog >= self.step
    }

    /// Pays one step out of the backlog. Returns when the tick's work began.
    #[must_use]
    pub fn begin_tick(&mut self) -> Instant {
        self.backlog = self.backlog.saturating_sub(self.step);
        self.ticks += 1;
        Instant::now()
    }

    /// Records how long the tick's work took.
    pub fn end_tick(&mut self, started: Instant) {
        self.stats.record(started.elapsed(), self.step);
    }

    /// Sleeps until another step is owed. Returns at once if one already is.
    pub fn wait_for_next_tick(&self) {
        let owed = self.backlog + self.clock.elapsed();
        if let Some(remaining) = self.step.checked_sub(owed) {
            std::thread::sleep(remaining);
        }
    }

    /// Ticks begun so far.
    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.ticks
    }

    /// Timing statistics.
    #[must_use]
    pub const fn stats(&self) -> &TickStats {
        &self.stats
    }

    /// Wall time of one step.
    #[must_use]
    pub const fn tick_duration(&self) -> Duration {
        self.step
    }

    /// Seconds simulated per tick.
    #[must_use]
    pub fn dt(&self) -> f32 {
        self.step.as_secs_f32()
    }

    /// Clears statistics; the tick count and backlog are kept.
    pub fn reset_stats(&mut self) {
        self.stats = TickStats::new(self.step);
    }
}

impl Default for TickLoop {
    fn default() -> Self {
        Self::new(cairn_shared::DEFAULT_TICK_RATE)
    }
}
