//! Background reaper for the session store.
//!
//! Runs on a fixed interval for the life of the process. When the store
//! holds more than `max_sessions`, everything but the `retain_sessions`
//! newest (by store order) is dropped. Coarse on purpose: no per-access LRU.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::memory::session::SessionStore;
use crate::utilities::config::ReaperConfig;

/// Periodic trimmer for a [`SessionStore`].
#[derive(Debug, Clone)]
pub struct Reaper {
    store: SessionStore,
    config: ReaperConfig,
}

/// Handle to a running reaper task.
#[derive(Debug)]
pub struct ReaperHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl ReaperHandle {
    /// Stop the loop and wait for it to exit.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            log::warn!("Reaper task ended abnormally: {}", e);
        }
    }
}

impl Reaper {
    pub fn new(store: SessionStore, config: ReaperConfig) -> Self {
        Self { store, config }
    }

    /// One trim pass. Returns how many sessions were evicted.
    pub fn reap_once(&self) -> usize {
        let before = self.store.len();
        let evicted = self
            .store
            .trim(self.config.max_sessions, self.config.retain_sessions);
        if evicted > 0 {
            log::info!(
                "Reaper evicted {} of {} sessions (cap {}, retain {})",
                evicted,
                before,
                self.config.max_sessions,
                self.config.retain_sessions
            );
        } else {
            log::debug!("Reaper: {} sessions, nothing to evict", before);
        }
        evicted
    }

    /// Start the periodic loop on the current runtime.
    ///
    /// The first pass happens one full interval after spawning.
    pub fn spawn(self) -> ReaperHandle {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let period = self.config.interval().max(Duration::from_millis(1));

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // interval() fires immediately; skip that tick.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        self.reap_once();
                    }
                }
            }
            log::debug!("Reaper stopped");
        });

        ReaperHandle { cancel, task }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(interval_secs: u64) -> ReaperConfig {
        ReaperConfig {
            interval_secs,
            max_sessions: 100,
            retain_sessions: 50,
        }
    }

    fn fill(store: &SessionStore, n: usize) {
        for i in 0..n {
            store.get_or_create(&format!("session-{}", i));
        }
    }

    #[test]
    fn test_reap_once_150_to_50() {
        let store = SessionStore::new();
        fill(&store, 150);
        let reaper = Reaper::new(store.clone(), config(3600));

        assert_eq!(reaper.reap_once(), 100);
        assert_eq!(store.len(), 50);
        let kept = store.keys_by_recency();
        for i in 100..150 {
            assert!(kept.contains(&format!("session-{}", i)));
        }
    }

    #[test]
    fn test_reap_prefers_recently_updated() {
        let store = SessionStore::new();
        fill(&store, 150);
        // An update to the oldest session makes it the newest.
        let oldest = store.get("session-0").unwrap();
        store.mark_updated("session-0", &oldest);

        Reaper::new(store.clone(), config(3600)).reap_once();
        assert_eq!(store.len(), 50);
        assert!(store.get("session-0").is_some());
        assert!(store.get("session-100").is_none());
        assert!(store.get("session-149").is_some());
    }

    #[test]
    fn test_reap_under_cap_keeps_everything() {
        let store = SessionStore::new();
        fill(&store, 100);
        assert_eq!(Reaper::new(store.clone(), config(3600)).reap_once(), 0);
        assert_eq!(store.len(), 100);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_reaper_runs_on_interval() {
        let store = SessionStore::new();
        fill(&store, 150);
        let handle = Reaper::new(store.clone(), config(60)).spawn();

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(store.len(), 150, "no pass before the first interval");

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(store.len(), 50);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_loop() {
        let store = SessionStore::new();
        let handle = Reaper::new(store.clone(), config(60)).spawn();
        handle.shutdown().await;

        fill(&store, 150);
        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(store.len(), 150);
    }
}
