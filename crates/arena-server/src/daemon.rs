//! Background daemons
//!
//! Two periodic tasks keep the arena moving:
//!
//! - scheduling: tops up the planned queue through autoplay, then sweeps
//!   timed-out matches (default every second)
//! - ranking: recomputes the published standings, then trims the result
//!   cache (default every 30 seconds)
//!
//! External calls in a cycle run under a time budget. A failed or slow cycle
//! is logged and the next one runs as usual. Both tasks stop on the shared
//! shutdown signal.

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout, MissedTickBehavior};

use crate::cache::ResultCache;
use crate::ranking::RankingAggregator;
use crate::scheduler::MatchScheduler;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonConfig {
    pub scheduler_interval: Duration,
    pub ranking_interval: Duration,
    /// Budget for the external calls of a single cycle
    pub cycle_budget: Duration,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            scheduler_interval: Duration::from_secs(1),
            ranking_interval: Duration::from_secs(30),
            cycle_budget: Duration::from_secs(5),
        }
    }
}

/// Handles to the running daemons.
pub struct Daemons {
    shutdown_tx: watch::Sender<bool>,
    scheduling: JoinHandle<u64>,
    ranking: JoinHandle<u64>,
}

impl Daemons {
    pub fn spawn(
        scheduler: Arc<MatchScheduler>,
        ranking: Arc<RankingAggregator>,
        cache: Arc<ResultCache>,
        config: DaemonConfig,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let scheduling = tokio::spawn(scheduling_task(
            Arc::clone(&scheduler),
            Arc::clone(&ranking),
            config.clone(),
            shutdown_rx.clone(),
        ));
        let ranking = tokio::spawn(ranking_task(ranking, cache, config, shutdown_rx));

        Self {
            shutdown_tx,
            scheduling,
            ranking,
        }
    }

    /// Signal both daemons and wait for them to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);

        for (name, handle) in [("scheduling", self.scheduling), ("ranking", self.ranking)] {
            match handle.await {
                Ok(cycles) => tracing::info!(daemon = name, cycles, "daemon stopped"),
                Err(e) => tracing::error!(daemon = name, error = %e, "daemon task failed"),
            }
        }
    }
}

/// Scheduling loop. Returns the number of completed cycles.
pub async fn scheduling_task(
    scheduler: Arc<MatchScheduler>,
    ranking: Arc<RankingAggregator>,
    config: DaemonConfig,
    mut shutdown_rx: watch::Receiver<bool>,
) -> u64 {
    let mut ticker = interval(config.scheduler_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut rng = StdRng::from_entropy();
    let mut cycles = 0;

    tracing::info!(
        interval_ms = config.scheduler_interval.as_millis() as u64,
        "scheduling daemon started"
    );

    loop {
        tokio::select! {
            changed = shutdown_rx.changed() => {
                // a dropped sender also means shutdown
                if changed.is_err() || *shutdown_rx.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                scheduling_cycle(&scheduler, &ranking, config.cycle_budget, &mut rng).await;
                cycles += 1;
            }
        }
    }

    cycles
}

async fn scheduling_cycle(
    scheduler: &MatchScheduler,
    ranking: &RankingAggregator,
    budget: Duration,
    rng: &mut StdRng,
) {
    if scheduler.is_autoplay_enabled().await {
        match timeout(budget, scheduler.entrants()).await {
            Ok(Ok(entrants)) => {
                let snapshot = ranking.snapshot();
                if let Err(e) = scheduler.plan_autoplay(&snapshot, &entrants, rng).await {
                    tracing::warn!(error = %e, "autoplay skipped this cycle");
                }
            }
            Ok(Err(e)) => tracing::warn!(error = %format!("{e:#}"), "failed to list entrants"),
            Err(_) => tracing::warn!(
                budget_ms = budget.as_millis() as u64,
                "listing entrants exceeded the cycle budget"
            ),
        }
    }

    let report = scheduler.sweep_timeouts().await;
    if report.unsaved > 0 {
        tracing::warn!(
            swept = report.swept,
            unsaved = report.unsaved,
            "timed out matches could not be recorded"
        );
    }
    tracing::trace!(swept = report.swept, "scheduling cycle done");
}

/// Ranking loop. Returns the number of completed cycles.
pub async fn ranking_task(
    ranking: Arc<RankingAggregator>,
    cache: Arc<ResultCache>,
    config: DaemonConfig,
    mut shutdown_rx: watch::Receiver<bool>,
) -> u64 {
    let mut ticker = interval(config.ranking_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut cycles = 0;

    tracing::info!(
        interval_secs = config.ranking_interval.as_secs(),
        "ranking daemon started"
    );

    loop {
        tokio::select! {
            changed = shutdown_rx.changed() => {
                // a dropped sender also means shutdown
                if changed.is_err() || *shutdown_rx.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                match timeout(config.cycle_budget, ranking.recompute()).await {
                    Ok(Ok(_)) => {}
                    Ok(Err(e)) => tracing::warn!(error = %format!("{e:#}"), "ranking kept previous snapshot"),
                    Err(_) => tracing::warn!("ranking exceeded the cycle budget"),
                }
                cache.cleanup();
                cycles += 1;
            }
        }
    }

    cycles
}

#[cfg(test)]
#[path = "daemon_tests.rs"]
mod daemon_tests;
