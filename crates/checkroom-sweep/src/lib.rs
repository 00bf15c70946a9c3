//! Periodic sweep timer for checkroom.
//!
//! The reaper has no clock of its own. [`SweepScheduler`] tells the
//! dispatch loop when a sweep is due, and it sits inside that loop's
//! `tokio::select!` next to the command channel:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = cmd_rx.recv() => { /* handle commands */ }
//!         info = scheduler.wait_for_sweep() => {
//!             let evicted = router.sweep(info.at);
//!             scheduler.record_sweep_end(evicted.len());
//!         }
//!     }
//! }
//! ```
//!
//! A scheduler without an interval never fires, which is how sweeping is
//! switched off.

use std::time::{Duration, Instant};

use rand::Rng;
use tokio::time::{self, Instant as TokioInstant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// What to do when the loop wakes up more than a whole interval late.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SweepPolicy {
    /// Count the missed sweeps and schedule the next one from now.
    #[default]
    Skip,
    /// Keep the scheduled cadence; the next deadline may already be due.
    Drop,
}

#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Time between sweeps. `None` disables sweeping.
    pub interval: Option<Duration>,
    pub policy: SweepPolicy,
    /// Upper bound on random delay added to the first sweep only.
    pub initial_jitter: Duration,
}

impl Default for SweepConfig {
    /// Hourly sweeps with up to a second of initial jitter.
    fn default() -> Self {
        Self {
            interval: Some(Duration::from_secs(60 * 60)),
            policy: SweepPolicy::default(),
            initial_jitter: Duration::from_secs(1),
        }
    }
}

impl SweepConfig {
    /// Shortest interval accepted. Anything below is raised to it.
    pub const MIN_INTERVAL: Duration = Duration::from_millis(10);

    pub fn every(interval: Duration) -> Self {
        Self {
            interval: Some(interval),
            ..Default::default()
        }
    }

    pub fn disabled() -> Self {
        Self {
            interval: None,
            ..Default::default()
        }
    }

    /// Raises a too-short interval to [`Self::MIN_INTERVAL`].
    pub fn validated(mut self) -> Self {
        if let Some(interval) = self.interval {
            if interval < Self::MIN_INTERVAL {
                warn!(?interval, min = ?Self::MIN_INTERVAL, "sweep interval too short, raising");
                self.interval = Some(Self::MIN_INTERVAL);
            }
        }
        self
    }
}

// ---------------------------------------------------------------------------
// SweepInfo / SweepMetrics
// ---------------------------------------------------------------------------

/// Returned by [`SweepScheduler::wait_for_sweep`] each time a sweep is due.
#[derive(Debug, Clone)]
pub struct SweepInfo {
    /// Starts at 1.
    pub sweep: u64,
    /// The moment the sweep fired. Derived from the tokio clock, so it
    /// follows paused time in tests.
    pub at: Instant,
    /// Whole intervals that passed without a sweep (0 normally).
    pub missed: u64,
}

#[derive(Debug, Clone, Default)]
pub struct SweepMetrics {
    pub total_sweeps: u64,
    pub total_missed: u64,
    /// Sessions evicted across all sweeps, as reported to
    /// [`SweepScheduler::record_sweep_end`].
    pub total_evicted: u64,
    pub last_sweep_time: Duration,
    pub max_sweep_time: Duration,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

pub struct SweepScheduler {
    config: SweepConfig,
    sweep_count: u64,
    next_sweep: Option<TokioInstant>,
    /// Set by `wait_for_sweep`, consumed by `record_sweep_end`.
    sweep_start: Option<TokioInstant>,
    paused: bool,
    metrics: SweepMetrics,
}

impl SweepScheduler {
    pub fn new(config: SweepConfig) -> Self {
        let config = config.validated();

        let next_sweep = config.interval.map(|interval| {
            let jitter = if config.initial_jitter.is_zero() {
                Duration::ZERO
            } else {
                let max = config.initial_jitter.as_millis() as u64;
                Duration::from_millis(rand::rng().random_range(0..=max))
            };
            TokioInstant::now() + interval + jitter
        });

        match config.interval {
            Some(interval) => debug!(?interval, policy = ?config.policy, "sweep scheduler created"),
            None => debug!("sweep scheduler created with sweeping disabled"),
        }

        Self {
            config,
            sweep_count: 0,
            next_sweep,
            sweep_start: None,
            paused: false,
            metrics: SweepMetrics::default(),
        }
    }

    pub fn every(interval: Duration) -> Self {
        Self::new(SweepConfig::every(interval))
    }

    /// Waits until the next sweep is due.
    ///
    /// Pends forever while paused or disabled, so a `select!` around it
    /// keeps serving its other branches.
    pub async fn wait_for_sweep(&mut self) -> SweepInfo {
        let (next, interval) = match (self.next_sweep, self.config.interval) {
            (Some(next), Some(interval)) if !self.paused => (next, interval),
            _ => std::future::pending().await,
        };

        time::sleep_until(next).await;

        let now = TokioInstant::now();
        self.sweep_count += 1;
        self.sweep_start = Some(now);

        let late_by = now.saturating_duration_since(next);
        let missed = (late_by.as_nanos() / interval.as_nanos()) as u64;
        if missed > 0 {
            warn!(sweep = self.sweep_count, missed, ?late_by, "sweep ran late");
        }

        self.next_sweep = Some(match self.config.policy {
            SweepPolicy::Skip => now + interval,
            SweepPolicy::Drop => next + interval,
        });

        self.metrics.total_sweeps += 1;
        self.metrics.total_missed += missed;
        trace!(sweep = self.sweep_count, "sweep due");

        SweepInfo {
            sweep: self.sweep_count,
            at: now.into_std(),
            missed,
        }
    }

    /// Records that the sweep started by the last `wait_for_sweep` is
    /// done and how many sessions it evicted.
    pub fn record_sweep_end(&mut self, evicted: usize) {
        let Some(start) = self.sweep_start.take() else {
            return;
        };
        let elapsed = start.elapsed();
        self.metrics.last_sweep_time = elapsed;
        self.metrics.max_sweep_time = self.metrics.max_sweep_time.max(elapsed);
        self.metrics.total_evicted += evicted as u64;
    }

    /// Idempotent.
    pub fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            debug!(sweep = self.sweep_count, "sweep scheduler paused");
        }
    }

    /// Resumes with a full interval before the next sweep.
    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            if let Some(interval) = self.config.interval {
                self.next_sweep = Some(TokioInstant::now() + interval);
            }
            debug!(sweep = self.sweep_count, "sweep scheduler resumed");
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_disabled(&self) -> bool {
        self.config.interval.is_none()
    }

    pub fn sweep_count(&self) -> u64 {
        self.sweep_count
    }

    pub fn interval(&self) -> Option<Duration> {
        self.config.interval
    }

    pub fn metrics(&self) -> &SweepMetrics {
        &self.metrics
    }
}
