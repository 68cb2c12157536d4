//! Time-driven task scheduling with per-task crash isolation.
//!
//! Each task owns an independent timer loop. Ticks that land while the
//! previous invocation is still running are skipped, task errors are
//! recorded to the fetch-error ledger, and shutdown stops scheduling
//! while letting in-flight invocations return.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc, Weekday};
use futures::future::BoxFuture;
use tokio::sync::watch;
use tracing::{info, warn};

use kywire_store::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    Every(StdDuration),
    DailyAt { hour: u32, minute: u32 },
    WeeklyAt { weekday: Weekday, hour: u32, minute: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirstRun {
    /// Run as soon as the scheduler starts.
    Immediate,
    /// Wait for the first scheduled occurrence.
    Deferred,
}

#[derive(Debug, Clone, Copy)]
pub struct TaskSpec {
    pub name: &'static str,
    pub cadence: Cadence,
    pub first_run: FirstRun,
}

type TaskFn = Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

pub struct Scheduler {
    store: Store,
    tasks: Vec<(TaskSpec, TaskFn)>,
}

impl Scheduler {
    pub fn new(store: Store) -> Self {
        Self {
            store,
            tasks: Vec::new(),
        }
    }

    pub fn add_task<F, Fut>(&mut self, spec: TaskSpec, task: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let boxed = move || {
            let fut: BoxFuture<'static, anyhow::Result<()>> = Box::pin(task());
            fut
        };
        self.tasks.push((spec, Arc::new(boxed)));
    }

    /// Run every task loop until `shutdown` flips to true.
    pub async fn run(self, shutdown: watch::Receiver<bool>) {
        info!(tasks = self.tasks.len(), "Scheduler starting");

        let mut handles = Vec::new();
        for (spec, task) in self.tasks {
            let store = self.store.clone();
            let mut shutdown = shutdown.clone();
            handles.push(tokio::spawn(async move {
                task_loop(spec, task, store, &mut shutdown).await;
            }));
        }

        for handle in handles {
            let _ = handle.await;
        }
        info!("Scheduler stopped");
    }
}

async fn task_loop(
    spec: TaskSpec,
    task: TaskFn,
    store: Store,
    shutdown: &mut watch::Receiver<bool>,
) {
    let running = Arc::new(AtomicBool::new(false));
    let mut next = match spec.first_run {
        FirstRun::Immediate => Utc::now(),
        FirstRun::Deferred => next_occurrence(&spec.cadence, Utc::now()),
    };

    loop {
        let delay = (next - Utc::now())
            .to_std()
            .unwrap_or(StdDuration::ZERO);

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown.changed() => {}
        }
        if *shutdown.borrow() {
            break;
        }

        // Concurrent runs of the same task are forbidden; a tick that
        // lands mid-run is skipped, not queued.
        if running.swap(true, Ordering::SeqCst) {
            warn!(task = spec.name, "Previous invocation still running, skipping tick");
        } else {
            let task = task.clone();
            let store = store.clone();
            let guard = RunningGuard(running.clone());
            tokio::spawn(async move {
                let _guard = guard;
                info!(task = spec.name, "Task starting");
                match task().await {
                    Ok(()) => info!(task = spec.name, "Task finished"),
                    Err(e) => {
                        warn!(task = spec.name, error = %e, "Task failed");
                        store
                            .record_fetch_error(None, &format!("task {}: {e}", spec.name), Utc::now())
                            .await;
                    }
                }
            });
        }

        next = next_occurrence(&spec.cadence, Utc::now());
    }
}

/// Clears the running flag even when the task body panics.
struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Next fire time strictly after `after`. No catch-up semantics: a missed
/// occurrence is simply gone.
pub fn next_occurrence(cadence: &Cadence, after: DateTime<Utc>) -> DateTime<Utc> {
    match cadence {
        Cadence::Every(period) => {
            after + Duration::from_std(*period).unwrap_or_else(|_| Duration::seconds(60))
        }
        Cadence::DailyAt { hour, minute } => {
            let candidate = at_time(after, *hour, *minute);
            if candidate > after {
                candidate
            } else {
                candidate + Duration::days(1)
            }
        }
        Cadence::WeeklyAt {
            weekday,
            hour,
            minute,
        } => {
            let days_ahead = (weekday.num_days_from_monday() as i64
                - after.weekday().num_days_from_monday() as i64)
                .rem_euclid(7);
            let candidate = at_time(after + Duration::days(days_ahead), *hour, *minute);
            if candidate > after {
                candidate
            } else {
                candidate + Duration::days(7)
            }
        }
    }
}

fn at_time(day: DateTime<Utc>, hour: u32, minute: u32) -> DateTime<Utc> {
    let naive = day
        .date_naive()
        .and_hms_opt(hour, minute, 0)
        .expect("valid wall-clock time");
    Utc.from_utc_datetime(&naive)
}
