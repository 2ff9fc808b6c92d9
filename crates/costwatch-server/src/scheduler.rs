use crate::job::WeeklyJob;
use chrono::{DateTime, Datelike, Duration as ChronoDuration, NaiveTime, Utc};
use costwatch_common::types::{NotificationConfig, ScheduleDay};
use serde::Serialize;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};
use tokio_util::task::TaskTracker;
use utoipa::ToSchema;
use uuid::Uuid;

pub const WEEKLY_JOB_ID: &str = "weekly_cost_report";
pub const WEEKLY_JOB_NAME: &str = "Weekly Cost Report";

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("Scheduler: {0}")]
    Cron(#[from] JobSchedulerError),

    #[error("Scheduler: {0} report run(s) still in flight after {1:?}")]
    ShutdownTimeout(usize, Duration),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;

/// `sec min hour day-of-month month day-of-week`, UTC.
pub fn cron_expression(day: ScheduleDay, hour: u8) -> String {
    format!("0 0 {} * * {}", hour.min(23), day.cron_token())
}

/// Next `day` at `hour:00` UTC strictly after `now`.
pub fn next_run_time(day: ScheduleDay, hour: u8, now: DateTime<Utc>) -> DateTime<Utc> {
    let today = now.date_naive();
    let days_ahead = (day.index() + 7 - today.weekday().num_days_from_monday()) % 7;
    let at = NaiveTime::from_hms_opt(u32::from(hour.min(23)), 0, 0).unwrap_or(NaiveTime::MIN);
    let candidate = (today + ChronoDuration::days(i64::from(days_ahead)))
        .and_time(at)
        .and_utc();
    if candidate > now {
        candidate
    } else {
        candidate + ChronoDuration::days(7)
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ScheduledJobInfo {
    pub id: String,
    pub name: String,
    /// Cron expression, UTC.
    pub schedule: String,
    pub next_run_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SchedulerStatus {
    pub running: bool,
    pub jobs: Vec<ScheduledJobInfo>,
}

struct Registration {
    uuid: Uuid,
    day: ScheduleDay,
    hour: u8,
}

/// Fires the weekly job on a cron trigger derived from the notification
/// config.
///
/// Every run, scheduled or manual, is spawned on a [`TaskTracker`] so that
/// [`stop`](Self::stop) can wait for in-flight runs.
pub struct ReportScheduler {
    cron: JobScheduler,
    job: Arc<WeeklyJob>,
    tracker: TaskTracker,
    current: Mutex<Option<Registration>>,
    running: AtomicBool,
    grace: Duration,
}

impl ReportScheduler {
    pub async fn new(job: Arc<WeeklyJob>, grace: Duration) -> Result<Self> {
        Ok(Self {
            cron: JobScheduler::new().await?,
            job,
            tracker: TaskTracker::new(),
            current: Mutex::new(None),
            running: AtomicBool::new(false),
            grace,
        })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Registers the weekly trigger and starts the cron loop.
    pub async fn start(&self, config: &NotificationConfig) -> Result<()> {
        self.reschedule(config).await?;
        self.cron.start().await?;
        self.running.store(true, Ordering::SeqCst);
        tracing::info!("Report scheduler started");
        Ok(())
    }

    /// Replaces the weekly trigger. In-flight runs are not affected.
    pub async fn reschedule(&self, config: &NotificationConfig) -> Result<()> {
        let mut current = self.current.lock().await;
        if let Some(previous) = current.take() {
            self.cron.remove(&previous.uuid).await?;
        }

        let expression = cron_expression(config.schedule_day, config.schedule_hour);
        let job = self.job.clone();
        let tracker = self.tracker.clone();
        let cron_job = Job::new_async(expression.as_str(), move |_uuid, _lock| {
            let job = job.clone();
            let tracker = tracker.clone();
            Box::pin(async move {
                if tracker.is_closed() {
                    return;
                }
                tracker.spawn(async move {
                    job.run().await;
                });
            })
        })?;
        let uuid = self.cron.add(cron_job).await?;
        *current = Some(Registration {
            uuid,
            day: config.schedule_day,
            hour: config.schedule_hour,
        });

        tracing::info!(
            day = %config.schedule_day,
            hour = config.schedule_hour,
            cron = %expression,
            "Scheduled weekly cost report (UTC)"
        );
        Ok(())
    }

    /// Runs the weekly job now, in the background. Returns `false` once
    /// shutdown has begun.
    pub fn trigger_now(&self) -> bool {
        let job = self.job.clone();
        self.spawn(async move {
            job.run().await;
        })
    }

    /// Spawns `fut` as a tracked run. Returns `false` once shutdown has begun.
    pub fn spawn<F>(&self, fut: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.tracker.is_closed() {
            return false;
        }
        self.tracker.spawn(fut);
        true
    }

    pub async fn status(&self) -> SchedulerStatus {
        let current = self.current.lock().await;
        let jobs = current
            .iter()
            .map(|reg| ScheduledJobInfo {
                id: WEEKLY_JOB_ID.to_string(),
                name: WEEKLY_JOB_NAME.to_string(),
                schedule: cron_expression(reg.day, reg.hour),
                next_run_time: self
                    .is_running()
                    .then(|| next_run_time(reg.day, reg.hour, Utc::now())),
            })
            .collect();
        SchedulerStatus {
            running: self.is_running(),
            jobs,
        }
    }

    /// Stops new triggers, then waits up to the grace period for in-flight
    /// runs.
    pub async fn stop(&self) -> Result<()> {
        if self.running.swap(false, Ordering::SeqCst) {
            let mut cron = self.cron.clone();
            cron.shutdown().await?;
        }
        self.tracker.close();

        let in_flight = self.tracker.len();
        if in_flight > 0 {
            tracing::info!(in_flight, "Waiting for report runs to finish");
        }
        tokio::time::timeout(self.grace, self.tracker.wait())
            .await
            .map_err(|_| SchedulerError::ShutdownTimeout(self.tracker.len(), self.grace))?;
        tracing::info!("Report scheduler stopped");
        Ok(())
    }
}
