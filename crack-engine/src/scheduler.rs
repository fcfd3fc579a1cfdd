//! Attack scheduling and execution
//!
//! The scheduler drives a set of prioritized strategies against one target
//! through a pluggable [`CredentialChecker`]. Two modes: `run_sequential`
//! walks strategies in strict priority order, `run_parallel` spawns one
//! worker task per strategy and stops every worker on the first hit.
//!
//! A scheduler is single-use: both run modes consume it. Obtain a
//! [`StopHandle`] before running to cancel from elsewhere.

use crate::error::CrackResult;
use crate::strategy::Strategy;
use async_trait::async_trait;
use crack_common::{StatusSnapshot, TargetInfo};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Interval between status snapshots.
const STATUS_INTERVAL: Duration = Duration::from_secs(1);
/// Sequential mode also snapshots every this many candidates.
const STATUS_EVERY_CANDIDATES: u64 = 1000;
/// Parallel monitor polling interval.
const MONITOR_POLL: Duration = Duration::from_millis(100);
/// How long workers get to wind down after cancellation.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Verifies one candidate against the target.
///
/// Implementations own all protocol behavior; the scheduler only sees the
/// boolean. Errors are treated as failed checks, never as fatal.
#[async_trait]
pub trait CredentialChecker: Send + Sync {
    async fn check(&self, candidate: &str, target: &TargetInfo) -> CrackResult<bool>;
}

/// How an attack run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttackOutcome {
    /// A candidate was accepted by the checker
    Found(String),
    /// Cancelled via a [`StopHandle`] before any candidate was accepted
    Stopped,
    /// Every strategy ran out of candidates without a hit
    Exhausted,
}

impl AttackOutcome {
    /// The accepted candidate, if any.
    pub fn found(&self) -> Option<&str> {
        match self {
            AttackOutcome::Found(candidate) => Some(candidate),
            _ => None,
        }
    }
}

/// Cancellation handle for a running attack.
///
/// Cloneable and usable from any thread; `stop` is idempotent.
#[derive(Clone)]
pub struct StopHandle {
    cancelled: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

type StatusCallback = Arc<dyn Fn(StatusSnapshot) + Send + Sync>;

/// Runs prioritized strategies against a target until a hit, exhaustion, or
/// cancellation.
pub struct AttackScheduler {
    strategies: Vec<(i32, Strategy)>,
    checker: Option<Arc<dyn CredentialChecker>>,
    status_callback: Option<StatusCallback>,
    target: TargetInfo,
    cancelled: Arc<AtomicBool>,
}

impl Default for AttackScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl AttackScheduler {
    pub fn new() -> Self {
        Self {
            strategies: Vec::new(),
            checker: None,
            status_callback: None,
            target: TargetInfo::default(),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Add a strategy; higher priority runs earlier in sequential mode.
    pub fn add_strategy(&mut self, strategy: Strategy, priority: i32) {
        debug!(
            "Added strategy '{}' (priority {}, ~{} candidates)",
            strategy.name(),
            priority,
            strategy.estimated_count()
        );
        self.strategies.push((priority, strategy));
    }

    pub fn set_checker(&mut self, checker: Arc<dyn CredentialChecker>) {
        self.checker = Some(checker);
    }

    /// Register a callback invoked with periodic progress snapshots and once
    /// with a final snapshot when the run ends.
    pub fn set_status_callback(&mut self, callback: impl Fn(StatusSnapshot) + Send + Sync + 'static) {
        self.status_callback = Some(Arc::new(callback));
    }

    pub fn set_target(&mut self, target: TargetInfo) {
        self.target = target;
    }

    /// Handle for cancelling the run from another task or thread.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            cancelled: Arc::clone(&self.cancelled),
        }
    }

    fn total_estimate(&self) -> u64 {
        self.strategies
            .iter()
            .fold(0u64, |acc, (_, s)| acc.saturating_add(s.estimated_count()))
    }

    /// Run strategies one after another, highest priority first.
    ///
    /// Equal priorities keep insertion order. Cancellation is checked before
    /// every candidate; a status snapshot is emitted every
    /// 1000 candidates or every second, whichever comes first, plus a final
    /// one when the run ends.
    pub async fn run_sequential(mut self) -> AttackOutcome {
        if self.strategies.is_empty() {
            warn!("No strategies added, nothing to run");
            return AttackOutcome::Exhausted;
        }
        self.strategies.sort_by_key(|(priority, _)| std::cmp::Reverse(*priority));

        let total = self.total_estimate();
        let started = Instant::now();
        let mut tried = 0u64;
        let mut last_status = Instant::now();
        let mut warned_no_checker = false;

        info!(
            "Starting sequential attack: {} strategies, ~{} candidates",
            self.strategies.len(),
            total
        );

        for (priority, strategy) in &self.strategies {
            info!("Running strategy '{}' (priority {})", strategy.name(), priority);

            for candidate in strategy.generate() {
                if self.cancelled.load(Ordering::SeqCst) {
                    info!("Attack stopped after {} candidates", tried);
                    self.emit_status(tried, total, started, true);
                    return AttackOutcome::Stopped;
                }

                let accepted = match &self.checker {
                    Some(checker) => match checker.check(&candidate, &self.target).await {
                        Ok(accepted) => accepted,
                        Err(e) => {
                            warn!("Checker error for candidate: {}", e);
                            false
                        }
                    },
                    None => {
                        if !warned_no_checker {
                            warn!("No credential checker set, every check fails");
                            warned_no_checker = true;
                        }
                        false
                    }
                };
                tried += 1;

                if accepted {
                    info!("Credential found after {} candidates", tried);
                    self.emit_status(tried, total, started, true);
                    return AttackOutcome::Found(candidate);
                }

                if tried % STATUS_EVERY_CANDIDATES == 0 || last_status.elapsed() >= STATUS_INTERVAL
                {
                    self.emit_status(tried, total, started, false);
                    last_status = Instant::now();
                }
            }
        }

        info!("All strategies exhausted after {} candidates", tried);
        self.emit_status(tried, total, started, true);
        AttackOutcome::Exhausted
    }

    /// Run every strategy concurrently, one tokio task each.
    ///
    /// The first accepted candidate cancels the remaining workers; a single
    /// strategy delegates to [`run_sequential`](Self::run_sequential). The
    /// monitor polls every 100 ms and gives workers a bounded grace period to
    /// wind down before returning.
    pub async fn run_parallel(mut self) -> AttackOutcome {
        if self.strategies.len() <= 1 {
            return self.run_sequential().await;
        }

        let total = self.total_estimate();
        let started = Instant::now();
        let tried = Arc::new(AtomicU64::new(0));
        let cancelled = Arc::clone(&self.cancelled);
        // Single slot: only the first hit matters
        let (result_tx, mut result_rx) = mpsc::channel::<String>(1);

        if self.checker.is_none() {
            warn!("No credential checker set, every check fails");
        }

        info!(
            "Starting parallel attack: {} workers, ~{} candidates",
            self.strategies.len(),
            total
        );

        let mut workers = Vec::with_capacity(self.strategies.len());
        for (_, strategy) in self.strategies.drain(..) {
            let checker = self.checker.clone();
            let target = self.target.clone();
            let cancelled = Arc::clone(&cancelled);
            let tried = Arc::clone(&tried);
            let result_tx = result_tx.clone();

            workers.push(tokio::spawn(async move {
                for candidate in strategy.generate() {
                    if cancelled.load(Ordering::SeqCst) {
                        break;
                    }
                    let accepted = match &checker {
                        Some(checker) => match checker.check(&candidate, &target).await {
                            Ok(accepted) => accepted,
                            Err(e) => {
                                warn!("Checker error in '{}': {}", strategy.name(), e);
                                false
                            }
                        },
                        None => false,
                    };
                    tried.fetch_add(1, Ordering::Relaxed);
                    if accepted {
                        // Losing the race to an earlier hit is fine
                        let _ = result_tx.try_send(candidate);
                        cancelled.store(true, Ordering::SeqCst);
                        break;
                    }
                }
                debug!("Worker for '{}' finished", strategy.name());
            }));
        }
        drop(result_tx);

        let mut last_status = Instant::now();
        let outcome = loop {
            if let Ok(found) = result_rx.try_recv() {
                break AttackOutcome::Found(found);
            }

            if cancelled.load(Ordering::SeqCst) {
                // A winning worker stores the hit before raising the flag,
                // but give a slow send a moment before calling it a stop
                match tokio::time::timeout(MONITOR_POLL, result_rx.recv()).await {
                    Ok(Some(found)) => break AttackOutcome::Found(found),
                    _ => break AttackOutcome::Stopped,
                }
            }

            if workers.iter().all(|worker| worker.is_finished()) {
                match result_rx.try_recv() {
                    Ok(found) => break AttackOutcome::Found(found),
                    Err(_) => break AttackOutcome::Exhausted,
                }
            }

            if last_status.elapsed() >= STATUS_INTERVAL {
                self.emit_status(tried.load(Ordering::Relaxed), total, started, false);
                last_status = Instant::now();
            }

            tokio::time::sleep(MONITOR_POLL).await;
        };

        cancelled.store(true, Ordering::SeqCst);
        for worker in workers {
            if tokio::time::timeout(SHUTDOWN_GRACE, worker).await.is_err() {
                warn!("Worker did not stop within the grace period");
            }
        }

        let final_tried = tried.load(Ordering::Relaxed);
        match &outcome {
            AttackOutcome::Found(_) => info!("Credential found after {} candidates", final_tried),
            AttackOutcome::Stopped => info!("Attack stopped after {} candidates", final_tried),
            AttackOutcome::Exhausted => {
                info!("All strategies exhausted after {} candidates", final_tried)
            }
        }
        self.emit_status(final_tried, total, started, true);
        outcome
    }

    fn emit_status(&self, tried: u64, total: u64, started: Instant, finished: bool) {
        if let Some(callback) = &self.status_callback {
            callback(StatusSnapshot::compute(
                tried,
                total,
                started.elapsed().as_secs_f64(),
                finished,
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::RuleBasedStrategy;
    use std::sync::Mutex;

    /// Accepts exactly one candidate and records everything it was asked.
    struct RecordingChecker {
        accept: Option<String>,
        seen: Mutex<Vec<String>>,
    }

    impl RecordingChecker {
        fn accepting(candidate: &str) -> Self {
            Self {
                accept: Some(candidate.to_string()),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn rejecting() -> Self {
            Self {
                accept: None,
                seen: Mutex::new(Vec::new()),
            }
        }

        fn seen(&self) -> Vec<String> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CredentialChecker for RecordingChecker {
        async fn check(&self, candidate: &str, _target: &TargetInfo) -> CrackResult<bool> {
            self.seen.lock().unwrap().push(candidate.to_string());
            Ok(self.accept.as_deref() == Some(candidate))
        }
    }

    fn word_strategy(name: &str, words: &[&str]) -> Strategy {
        RuleBasedStrategy::new(
            name,
            words.iter().map(|w| w.to_string()).collect(),
            Vec::new(),
        )
    }

    #[tokio::test]
    async fn test_sequential_stops_at_first_hit() {
        let checker = Arc::new(RecordingChecker::accepting("p2"));
        let mut scheduler = AttackScheduler::new();
        scheduler.add_strategy(word_strategy("words", &["p1", "p2", "p3"]), 0);
        scheduler.set_checker(checker.clone());

        let outcome = scheduler.run_sequential().await;

        assert_eq!(outcome, AttackOutcome::Found("p2".to_string()));
        assert_eq!(checker.seen(), vec!["p1", "p2"]);
    }

    #[tokio::test]
    async fn test_sequential_honors_priority_order() {
        let checker = Arc::new(RecordingChecker::rejecting());
        let mut scheduler = AttackScheduler::new();
        scheduler.add_strategy(word_strategy("low", &["l1"]), 1);
        scheduler.add_strategy(word_strategy("high", &["h1"]), 5);
        scheduler.add_strategy(word_strategy("mid", &["m1"]), 3);
        scheduler.set_checker(checker.clone());

        let outcome = scheduler.run_sequential().await;

        assert_eq!(outcome, AttackOutcome::Exhausted);
        assert_eq!(checker.seen(), vec!["h1", "m1", "l1"]);
    }

    #[tokio::test]
    async fn test_stop_before_run_returns_stopped() {
        let mut scheduler = AttackScheduler::new();
        scheduler.add_strategy(word_strategy("words", &["p1", "p2"]), 0);
        scheduler.set_checker(Arc::new(RecordingChecker::rejecting()));

        let handle = scheduler.stop_handle();
        handle.stop();
        handle.stop();
        assert!(handle.is_stopped());

        assert_eq!(scheduler.run_sequential().await, AttackOutcome::Stopped);
    }

    #[tokio::test]
    async fn test_no_strategies_is_exhausted() {
        let scheduler = AttackScheduler::new();
        assert_eq!(scheduler.run_sequential().await, AttackOutcome::Exhausted);
    }

    #[tokio::test]
    async fn test_missing_checker_fails_every_candidate() {
        let mut scheduler = AttackScheduler::new();
        scheduler.add_strategy(word_strategy("words", &["p1", "p2"]), 0);

        assert_eq!(scheduler.run_sequential().await, AttackOutcome::Exhausted);
    }

    #[tokio::test]
    async fn test_sequential_emits_final_snapshot() {
        let snapshots: Arc<Mutex<Vec<StatusSnapshot>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&snapshots);

        let mut scheduler = AttackScheduler::new();
        scheduler.add_strategy(word_strategy("words", &["p1", "p2"]), 0);
        scheduler.set_checker(Arc::new(RecordingChecker::rejecting()));
        scheduler.set_status_callback(move |snapshot| sink.lock().unwrap().push(snapshot));

        scheduler.run_sequential().await;

        let snapshots = snapshots.lock().unwrap();
        let last = snapshots.last().expect("final snapshot");
        assert!(last.finished);
        assert_eq!(last.tried, 2);
    }

    #[tokio::test]
    async fn test_parallel_first_hit_cancels_workers() {
        let checker = Arc::new(RecordingChecker::accepting("needle"));
        let mut scheduler = AttackScheduler::new();
        scheduler.add_strategy(word_strategy("a", &["a1", "a2", "needle"]), 0);
        scheduler.add_strategy(word_strategy("b", &["b1", "b2", "b3"]), 0);
        scheduler.set_checker(checker);

        let outcome = scheduler.run_parallel().await;

        assert_eq!(outcome, AttackOutcome::Found("needle".to_string()));
    }

    #[tokio::test]
    async fn test_parallel_exhausts_when_nothing_matches() {
        let mut scheduler = AttackScheduler::new();
        scheduler.add_strategy(word_strategy("a", &["a1", "a2"]), 0);
        scheduler.add_strategy(word_strategy("b", &["b1"]), 0);
        scheduler.set_checker(Arc::new(RecordingChecker::rejecting()));

        assert_eq!(scheduler.run_parallel().await, AttackOutcome::Exhausted);
    }

    #[tokio::test]
    async fn test_parallel_single_strategy_delegates() {
        let checker = Arc::new(RecordingChecker::accepting("p1"));
        let mut scheduler = AttackScheduler::new();
        scheduler.add_strategy(word_strategy("only", &["p1"]), 0);
        scheduler.set_checker(checker.clone());

        let outcome = scheduler.run_parallel().await;

        assert_eq!(outcome, AttackOutcome::Found("p1".to_string()));
        assert_eq!(checker.seen(), vec!["p1"]);
    }

    #[tokio::test]
    async fn test_stop_handle_halts_parallel_run() {
        let mut scheduler = AttackScheduler::new();
        // Large enough that the run is still going when stop lands
        let many: Vec<String> = (0..200_000).map(|i| format!("w{i}")).collect();
        scheduler.add_strategy(
            RuleBasedStrategy::new("a", many.clone(), Vec::new()),
            0,
        );
        scheduler.add_strategy(RuleBasedStrategy::new("b", many, Vec::new()), 0);
        scheduler.set_checker(Arc::new(RecordingChecker::rejecting()));

        let handle = scheduler.stop_handle();
        let run = tokio::spawn(scheduler.run_parallel());
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.stop();

        let outcome = run.await.unwrap();
        // The workers may have drained everything first on a fast machine
        assert!(matches!(
            outcome,
            AttackOutcome::Stopped | AttackOutcome::Exhausted
        ));
    }

    #[test]
    fn test_outcome_found_accessor() {
        assert_eq!(
            AttackOutcome::Found("secret".to_string()).found(),
            Some("secret")
        );
        assert_eq!(AttackOutcome::Stopped.found(), None);
    }
}
