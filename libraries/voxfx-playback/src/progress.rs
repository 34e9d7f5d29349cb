//! Periodic progress reporting
//!
//! While the transport plays, a background task sends a [`ProgressTick`] on
//! a fixed cadence into the engine's queue. Each start of the reporter gets
//! a new generation; ticks are only honoured for the current generation, so
//! a tick that was already queued when its task got cancelled is dropped
//! instead of reporting stale progress.
//!
//! Without a tick sink (unit tests, offline rendering) the reporter only
//! does the bookkeeping and ticks are driven by hand.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// One progress tick, stamped with the reporter generation that sent it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressTick {
    pub generation: u64,
}

struct ActiveReporter {
    generation: u64,
    task: Option<JoinHandle<()>>,
}

/// Cancellable scheduler of progress ticks
pub struct ProgressReporter {
    interval: Duration,
    sink: Option<mpsc::Sender<ProgressTick>>,
    active: Option<ActiveReporter>,
    generation: u64,
    /// Ticker tasks whose futures are still alive
    live_tasks: Arc<AtomicUsize>,
}

impl ProgressReporter {
    /// Reporter without a background task; ticks are driven manually
    pub fn detached(interval: Duration) -> Self {
        Self::build(interval, None)
    }

    /// Reporter that spawns a tokio task sending ticks into `sink`
    pub fn with_sink(interval: Duration, sink: mpsc::Sender<ProgressTick>) -> Self {
        Self::build(interval, Some(sink))
    }

    fn build(interval: Duration, sink: Option<mpsc::Sender<ProgressTick>>) -> Self {
        Self {
            interval,
            sink,
            active: None,
            generation: 0,
            live_tasks: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Start reporting, cancelling any previous run first
    ///
    /// Returns the generation of the new run.
    pub fn start(&mut self) -> u64 {
        self.cancel();
        self.generation += 1;
        let task = self
            .sink
            .clone()
            .and_then(|sink| self.spawn_ticker(sink, self.generation));
        self.active = Some(ActiveReporter {
            generation: self.generation,
            task,
        });
        debug!("Progress reporter started (generation {})", self.generation);
        self.generation
    }

    /// Stop reporting; returns whether a run was active
    pub fn cancel(&mut self) -> bool {
        match self.active.take() {
            Some(active) => {
                if let Some(task) = active.task {
                    task.abort();
                }
                debug!("Progress reporter cancelled (generation {})", active.generation);
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    /// Whether `tick` belongs to the current run
    pub fn accepts(&self, tick: ProgressTick) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| active.generation == tick.generation)
    }

    /// Generation of the current run, if any
    pub fn current_generation(&self) -> Option<u64> {
        self.active.as_ref().map(|active| active.generation)
    }

    /// Number of ticker tasks that have not yet been torn down
    pub fn live_tasks(&self) -> usize {
        self.live_tasks.load(Ordering::SeqCst)
    }

    fn spawn_ticker(
        &self,
        sink: mpsc::Sender<ProgressTick>,
        generation: u64,
    ) -> Option<JoinHandle<()>> {
        let runtime = tokio::runtime::Handle::try_current().ok()?;
        let guard = LiveTaskGuard::new(Arc::clone(&self.live_tasks));
        let period = self.interval;

        Some(runtime.spawn(async move {
            let _guard = guard;
            let mut interval = tokio::time::interval(period);
            // The first tick completes immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                trace!("Progress tick (generation {})", generation);
                if sink.send(ProgressTick { generation }).await.is_err() {
                    break;
                }
            }
        }))
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Counts a ticker task for as long as its future exists
struct LiveTaskGuard(Arc<AtomicUsize>);

impl LiveTaskGuard {
    fn new(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for LiveTaskGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn settle() {
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
    }

    #[test]
    fn test_detached_generations() {
        let mut reporter = ProgressReporter::detached(Duration::from_millis(100));
        assert!(!reporter.is_running());

        let first = reporter.start();
        let second = reporter.start();
        assert_ne!(first, second);
        assert!(!reporter.accepts(ProgressTick { generation: first }));
        assert!(reporter.accepts(ProgressTick { generation: second }));

        assert!(reporter.cancel());
        assert!(!reporter.cancel());
        assert!(!reporter.accepts(ProgressTick { generation: second }));
        assert_eq!(reporter.live_tasks(), 0);
    }

    #[test]
    fn test_sink_reporter_starts_idle() {
        let (tx, _rx) = mpsc::channel(1);
        let reporter = ProgressReporter::with_sink(Duration::from_millis(250), tx);
        assert!(!reporter.is_running());
        assert_eq!(reporter.current_generation(), None);
        assert_eq!(reporter.interval(), Duration::from_millis(250));
        assert_eq!(reporter.live_tasks(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_arrive_on_cadence() {
        let (tx, mut rx) = mpsc::channel(16);
        let mut reporter = ProgressReporter::with_sink(Duration::from_millis(100), tx);
        let generation = reporter.start();
        settle().await;

        tokio::time::advance(Duration::from_millis(350)).await;
        settle().await;

        let mut ticks = 0;
        while let Ok(tick) = rx.try_recv() {
            assert_eq!(tick.generation, generation);
            ticks += 1;
        }
        assert_eq!(ticks, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_never_leaves_two_tasks() {
        let (tx, _rx) = mpsc::channel(16);
        let mut reporter = ProgressReporter::with_sink(Duration::from_millis(100), tx);

        for _ in 0..5 {
            reporter.start();
            settle().await;
            assert_eq!(reporter.live_tasks(), 1);
        }

        reporter.cancel();
        settle().await;
        assert_eq!(reporter.live_tasks(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_reporter_goes_quiet() {
        let (tx, mut rx) = mpsc::channel(16);
        let mut reporter = ProgressReporter::with_sink(Duration::from_millis(100), tx);
        reporter.start();
        settle().await;
        reporter.cancel();
        settle().await;

        tokio::time::advance(Duration::from_secs(1)).await;
        settle().await;
        assert!(rx.try_recv().is_err());
    }
}
