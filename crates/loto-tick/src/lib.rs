//! Period-based tick scheduler for Loto room actors.
//!
//! A room runs several timers at once: the host's heartbeat, the
//! followers' host-alive check, and the optional auto-draw. Each one is a
//! [`TickScheduler`] polled from the actor's `tokio::select!` loop:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = cmd_rx.recv() => { /* handle commands */ }
//!         _ = heartbeat.wait_for_tick() => { /* broadcast heartbeat */ }
//!         _ = host_check.wait_for_tick() => { /* look for a silent host */ }
//!     }
//! }
//! ```
//!
//! # Event-driven mode
//!
//! A scheduler with no period never fires: [`TickScheduler::wait_for_tick`]
//! pends forever. Auto-draw starts in this mode and is armed later with
//! [`TickScheduler::set_period`]. A paused scheduler pends the same way.

use std::time::Duration;

use rand::Rng;
use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// What to do when a tick fires late.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TickPolicy {
    /// Count the missed ticks as skipped and resume one period from now.
    #[default]
    Skip,
    /// Keep the original cadence. The next tick fires at its originally
    /// scheduled time, which may already be in the past.
    Drop,
}

/// Configuration for a [`TickScheduler`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TickConfig {
    /// Time between ticks. `None` = event-driven (never fires).
    pub period: Option<Duration>,
    /// Late-tick handling.
    pub policy: TickPolicy,
    /// Upper bound of a random delay added to the first tick, so that
    /// clients joining together do not all check at the same instant.
    pub initial_jitter: Duration,
}

impl TickConfig {
    /// Shortest accepted period.
    pub const MIN_PERIOD: Duration = Duration::from_millis(10);

    /// A config ticking every `period`.
    pub fn every(period: Duration) -> Self {
        Self {
            period: Some(period),
            ..Default::default()
        }
    }

    /// An event-driven config.
    pub fn event_driven() -> Self {
        Self::default()
    }

    /// Adds first-tick jitter.
    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.initial_jitter = jitter;
        self
    }

    /// Clamps out-of-range values.
    ///
    /// - A zero period means event-driven.
    /// - Periods below [`Self::MIN_PERIOD`] are raised to it.
    /// - Jitter is capped at one period.
    pub fn validated(mut self) -> Self {
        if let Some(period) = self.period {
            if period.is_zero() {
                self.period = None;
            } else if period < Self::MIN_PERIOD {
                warn!(?period, min = ?Self::MIN_PERIOD, "tick period too short, clamping");
                self.period = Some(Self::MIN_PERIOD);
            }
        }
        if let Some(period) = self.period {
            if self.initial_jitter > period {
                warn!(jitter = ?self.initial_jitter, ?period, "initial jitter exceeds period, clamping");
                self.initial_jitter = period;
            }
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Tick info
// ---------------------------------------------------------------------------

/// Returned by [`TickScheduler::wait_for_tick`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickInfo {
    /// Monotonic tick number, starting at 1.
    pub tick: u64,
    /// The period this tick was scheduled with.
    pub period: Duration,
    /// The tick woke up more than a tenth of a period late.
    pub overrun: bool,
    /// Whole periods missed (Skip policy only).
    pub ticks_skipped: u64,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// A single repeating timer.
#[derive(Debug)]
pub struct TickScheduler {
    config: TickConfig,
    tick_count: u64,
    next_tick: Option<Instant>,
    paused: bool,
}

impl TickScheduler {
    /// Creates a scheduler. The first tick is one period (plus jitter)
    /// from now.
    pub fn new(config: TickConfig) -> Self {
        let config = config.validated();
        let next_tick = config
            .period
            .map(|period| Instant::now() + period + jitter(config.initial_jitter));

        match config.period {
            Some(period) => debug!(?period, policy = ?config.policy, "tick scheduler created"),
            None => debug!("tick scheduler created in event-driven mode"),
        }

        Self {
            config,
            tick_count: 0,
            next_tick,
            paused: false,
        }
    }

    /// A scheduler ticking every `period` with default settings.
    pub fn every(period: Duration) -> Self {
        Self::new(TickConfig::every(period))
    }

    /// Waits for the next tick.
    ///
    /// Pends forever when event-driven or paused. Cancel-safe: dropping
    /// the future inside `select!` loses nothing, the deadline is kept.
    pub async fn wait_for_tick(&mut self) -> TickInfo {
        let (next, period) = match (self.next_tick, self.config.period) {
            (Some(next), Some(period)) if !self.paused => (next, period),
            _ => return std::future::pending::<TickInfo>().await,
        };

        time::sleep_until(next).await;

        let now = Instant::now();
        self.tick_count += 1;

        let late_by = now.saturating_duration_since(next);
        let overrun = late_by > period / 10;
        let mut ticks_skipped = 0u64;

        self.next_tick = Some(match self.config.policy {
            TickPolicy::Skip => {
                if overrun {
                    ticks_skipped = whole_periods(late_by, period);
                    if ticks_skipped > 0 {
                        warn!(
                            tick = self.tick_count,
                            skipped = ticks_skipped,
                            late_ms = late_by.as_millis() as u64,
                            "tick overrun, skipping ahead"
                        );
                    }
                }
                now + period
            }
            TickPolicy::Drop => next + period,
        });

        trace!(tick = self.tick_count, overrun, "tick fired");

        TickInfo {
            tick: self.tick_count,
            period,
            overrun,
            ticks_skipped,
        }
    }

    /// Changes the period and restarts the cadence from now.
    ///
    /// `None` switches to event-driven mode.
    pub fn set_period(&mut self, period: Option<Duration>) {
        self.config = TickConfig {
            period,
            ..self.config.clone()
        }
        .validated();
        self.next_tick = self.config.period.map(|p| Instant::now() + p);
        debug!(period = ?self.config.period, "tick period changed");
    }

    /// Restarts the cadence: the next tick is one period from now.
    pub fn reset(&mut self) {
        self.next_tick = self.config.period.map(|p| Instant::now() + p);
    }

    /// Stops ticking until [`resume`](Self::resume). Idempotent.
    pub fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            debug!(tick = self.tick_count, "tick scheduler paused");
        }
    }

    /// Resumes after a pause. The next tick is one period from now, so
    /// time spent paused never produces a burst.
    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            self.reset();
            debug!(tick = self.tick_count, "tick scheduler resumed");
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// No period configured.
    pub fn is_event_driven(&self) -> bool {
        self.config.period.is_none()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn period(&self) -> Option<Duration> {
        self.config.period
    }

    /// When the next tick is due, if one is scheduled and not paused.
    pub fn next_deadline(&self) -> Option<Instant> {
        if self.paused { None } else { self.next_tick }
    }
}

fn jitter(max: Duration) -> Duration {
    if max.is_zero() {
        return Duration::ZERO;
    }
    let us = u64::try_from(max.as_micros()).unwrap_or(u64::MAX);
    Duration::from_micros(rand::rng().random_range(0..us))
}

fn whole_periods(late_by: Duration, period: Duration) -> u64 {
    let period_ns = period.as_nanos().max(1);
    u64::try_from(late_by.as_nanos() / period_ns).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validated_zero_period_is_event_driven() {
        let config = TickConfig::every(Duration::ZERO).validated();
        assert_eq!(config.period, None);
    }

    #[test]
    fn test_validated_short_period_clamped() {
        let config = TickConfig::every(Duration::from_millis(1)).validated();
        assert_eq!(config.period, Some(TickConfig::MIN_PERIOD));
    }

    #[test]
    fn test_validated_jitter_capped_at_period() {
        let config = TickConfig::every(Duration::from_secs(1))
            .with_jitter(Duration::from_secs(5))
            .validated();
        assert_eq!(config.initial_jitter, Duration::from_secs(1));
    }

    #[test]
    fn test_jitter_zero_is_zero() {
        assert_eq!(jitter(Duration::ZERO), Duration::ZERO);
    }

    #[test]
    fn test_jitter_stays_below_max() {
        for _ in 0..100 {
            assert!(jitter(Duration::from_millis(5)) < Duration::from_millis(5));
        }
    }

    #[test]
    fn test_whole_periods_floors() {
        let p = Duration::from_secs(10);
        assert_eq!(whole_periods(Duration::from_secs(9), p), 0);
        assert_eq!(whole_periods(Duration::from_secs(25), p), 2);
    }
}
