//! Background task scheduling (§4.6, §A.1 of SPEC_FULL.md), grounded on
//! the teacher's interval/cron/one-shot task model (`r2e-scheduler`),
//! trimmed of the HTTP-framework plugin machinery (no transport layer in
//! this workspace) down to a plain runtime the server binary starts at
//! boot.

use chrono::Utc;
use cron::Schedule;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// How a background task recurs.
#[derive(Clone)]
pub enum ScheduleConfig {
    Interval(Duration),
    IntervalWithDelay {
        interval: Duration,
        initial_delay: Duration,
    },
    /// Standard 6-field cron (seconds field first), parsed by the `cron`
    /// crate — distinct from oneM2M's 7-field `<schedule>` entries, which
    /// `schedule_window` evaluates directly.
    Cron(String),
    Once(Duration),
}

impl ScheduleConfig {
    fn describe(&self) -> String {
        match self {
            ScheduleConfig::Interval(d) => format!("every {}s", d.as_secs()),
            ScheduleConfig::IntervalWithDelay { interval, initial_delay } => {
                format!("every {}s (delay {}s)", interval.as_secs(), initial_delay.as_secs())
            }
            ScheduleConfig::Cron(expr) => format!("cron: {expr}"),
            ScheduleConfig::Once(d) => format!("once after {}s", d.as_secs()),
        }
    }
}

type TaskFn = Arc<dyn Fn() -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// A named, schedulable unit of background work.
#[derive(Clone)]
pub struct ScheduledTask {
    name: String,
    schedule: ScheduleConfig,
    action: TaskFn,
}

impl ScheduledTask {
    pub fn new<F, Fut>(name: impl Into<String>, schedule: ScheduleConfig, action: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            name: name.into(),
            schedule,
            action: Arc::new(move || Box::pin(action())),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Clone, Debug)]
pub struct ScheduledJobInfo {
    pub name: String,
    pub schedule: String,
}

/// Runtime registry of started jobs, queryable for diagnostics (reference:
/// `ScheduledJobRegistry`).
#[derive(Clone, Default)]
pub struct JobRegistry {
    inner: Arc<Mutex<Vec<ScheduledJobInfo>>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn register(&self, info: ScheduledJobInfo) {
        self.inner.lock().expect("job registry lock poisoned").push(info);
    }

    pub fn list_jobs(&self) -> Vec<ScheduledJobInfo> {
        self.inner.lock().expect("job registry lock poisoned").clone()
    }
}

/// Owns the set of background tasks and their cancellation token. The
/// server binary constructs one `Scheduler`, registers tasks for CRS
/// window flush, `<ACTR>` periodic evaluation, expired-resource reaping,
/// and statistics snapshotting, then calls `start()` once at boot (§4.6,
/// §A.1).
#[derive(Clone)]
pub struct Scheduler {
    token: CancellationToken,
    registry: JobRegistry,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            registry: JobRegistry::new(),
        }
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn registry(&self) -> JobRegistry {
        self.registry.clone()
    }

    pub fn shutdown(&self) {
        self.token.cancel();
    }

    /// Start a task according to its schedule. Returns immediately; the
    /// task runs on its own `tokio` task until cancelled.
    pub fn spawn(&self, task: ScheduledTask) {
        self.registry.register(ScheduledJobInfo {
            name: task.name.clone(),
            schedule: task.schedule.describe(),
        });
        let token = self.token.clone();
        tokio::spawn(run_task(task, token));
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

async fn run_task(task: ScheduledTask, token: CancellationToken) {
    match task.schedule.clone() {
        ScheduleConfig::Interval(period) => run_interval(&task, period, token).await,
        ScheduleConfig::IntervalWithDelay { interval, initial_delay } => {
            tokio::select! {
                _ = tokio::time::sleep(initial_delay) => {},
                _ = token.cancelled() => return,
            }
            run_interval(&task, interval, token).await
        }
        ScheduleConfig::Cron(expr) => run_cron(&task, &expr, token).await,
        ScheduleConfig::Once(delay) => {
            tokio::select! {
                _ = tokio::time::sleep(delay) => (task.action)().await,
                _ = token.cancelled() => {},
            }
        }
    }
}

async fn run_interval(task: &ScheduledTask, period: Duration, token: CancellationToken) {
    let mut ticker = tokio::time::interval(period);
    loop {
        tokio::select! {
            _ = ticker.tick() => (task.action)().await,
            _ = token.cancelled() => return,
        }
    }
}

async fn run_cron(task: &ScheduledTask, expr: &str, token: CancellationToken) {
    let Ok(schedule) = Schedule::from_str(expr) else {
        tracing::error!(task = task.name(), expr, "invalid cron expression, task not started");
        return;
    };
    loop {
        let Some(next) = schedule.upcoming(Utc).next() else {
            return;
        };
        let delay = (next - Utc::now()).to_std().unwrap_or(Duration::ZERO);
        tokio::select! {
            _ = tokio::time::sleep(delay) => (task.action)().await,
            _ = token.cancelled() => return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn interval_task_runs_repeatedly_until_cancelled() {
        let scheduler = Scheduler::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let c = counter.clone();
        scheduler.spawn(ScheduledTask::new(
            "tick",
            ScheduleConfig::Interval(Duration::from_millis(10)),
            move || {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                }
            },
        ));

        tokio::time::advance(Duration::from_millis(35)).await;
        tokio::task::yield_now().await;
        scheduler.shutdown();

        assert!(counter.load(Ordering::SeqCst) >= 3);
    }

    #[tokio::test]
    async fn job_registry_lists_started_jobs() {
        let scheduler = Scheduler::new();
        scheduler.spawn(ScheduledTask::new("noop", ScheduleConfig::Once(Duration::from_secs(3600)), || async {}));
        let jobs = scheduler.registry().list_jobs();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].name, "noop");
    }
}
