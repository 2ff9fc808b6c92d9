use crate::config::ServerConfig;
use crate::job::WeeklyJob;
use crate::scheduler::ReportScheduler;
use chrono::{DateTime, Utc};
use costwatch_ai::InsightGenerator;
use costwatch_analysis::CostAnalyzer;
use costwatch_notify::Notifier;
use costwatch_storage::CostRepository;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub repo: CostRepository,
    pub analyzer: Arc<CostAnalyzer>,
    pub generator: Arc<dyn InsightGenerator>,
    pub notifier: Arc<dyn Notifier>,
    pub job: Arc<WeeklyJob>,
    pub scheduler: Arc<ReportScheduler>,
    pub config: Arc<ServerConfig>,
    pub start_time: DateTime<Utc>,
}

impl AppState {
    /// Wires the pipeline components together.
    ///
    /// The scheduler is created but not started.
    pub async fn build(
        config: ServerConfig,
        repo: CostRepository,
        analyzer: Arc<CostAnalyzer>,
        generator: Arc<dyn InsightGenerator>,
        notifier: Arc<dyn Notifier>,
    ) -> anyhow::Result<Self> {
        let job = Arc::new(WeeklyJob::new(
            repo.clone(),
            analyzer.clone(),
            generator.clone(),
            notifier.clone(),
        ));
        let scheduler = Arc::new(ReportScheduler::new(job.clone(), config.shutdown_grace()).await?);
        Ok(Self {
            repo,
            analyzer,
            generator,
            notifier,
            job,
            scheduler,
            config: Arc::new(config),
            start_time: Utc::now(),
        })
    }
}
