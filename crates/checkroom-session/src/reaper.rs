//! Idle-session eviction.
//!
//! The reaper is the only way a session ever leaves the store. It looks
//! at nothing but `last_activity`: finished games, disconnected players
//! and half-done reconnects are all evicted alike once idle long enough.

use std::time::{Duration, Instant};

use checkroom_rules::RulesEngine;

use crate::{Session, SessionStore};

#[derive(Debug, Clone)]
pub struct Reaper {
    idle_threshold: Duration,
}

impl Reaper {
    pub fn new(idle_threshold: Duration) -> Self {
        Self { idle_threshold }
    }

    pub fn idle_threshold(&self) -> Duration {
        self.idle_threshold
    }

    /// `true` once strictly more than the threshold has passed since the
    /// session's last activity.
    pub fn is_idle<E: RulesEngine>(&self, session: &Session<E>, now: Instant) -> bool {
        now.saturating_duration_since(session.last_activity()) > self.idle_threshold
    }

    /// Removes every idle session from `store` and hands them back.
    pub fn sweep<E: RulesEngine>(
        &self,
        store: &mut SessionStore<E>,
        now: Instant,
    ) -> Vec<Session<E>> {
        let idle: Vec<_> = store
            .iter()
            .filter(|s| self.is_idle(s, now))
            .map(|s| s.id().clone())
            .collect();

        let evicted: Vec<_> = idle.iter().filter_map(|id| store.remove(id)).collect();
        for session in &evicted {
            tracing::info!(
                session_id = %session.id(),
                finished = session.is_finished(),
                "evicted idle session"
            );
        }
        evicted
    }
}

impl Default for Reaper {
    /// A 24-hour idle threshold.
    fn default() -> Self {
        Self::new(Duration::from_secs(24 * 60 * 60))
    }
}
