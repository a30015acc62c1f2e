//! Bounded worker pool running dumps in the background.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use dotgit_core::{DumpJob, DumpOutcome, JobStatus};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

use super::leaks::{Leak, SecretScanner};
use super::record::JobRecord;
use super::registry::JobRegistry;
use crate::metrics::JobMetrics;

/// Runs one dump to completion.
#[async_trait]
pub trait DumpRunner: Send + Sync {
    async fn run(&self, job: DumpJob, cancel: CancellationToken) -> DumpOutcome;
}

/// Runs dumps with the HTTP engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineRunner;

#[async_trait]
impl DumpRunner for EngineRunner {
    async fn run(&self, job: DumpJob, cancel: CancellationToken) -> DumpOutcome {
        dotgit_dump::dump(job, cancel).await
    }
}

/// Accepts jobs and runs at most `workers` of them at a time.
#[derive(Clone)]
pub struct JobPool {
    registry: JobRegistry,
    permits: Arc<Semaphore>,
    runner: Arc<dyn DumpRunner>,
    scanner: Option<Arc<dyn SecretScanner>>,
    metrics: JobMetrics,
}

impl JobPool {
    pub fn new(registry: JobRegistry, workers: usize, runner: Arc<dyn DumpRunner>) -> Self {
        Self {
            registry,
            permits: Arc::new(Semaphore::new(workers.max(1))),
            runner,
            scanner: None,
            metrics: JobMetrics,
        }
    }

    /// Scans every successful dump with `scanner`.
    pub fn with_scanner(mut self, scanner: Arc<dyn SecretScanner>) -> Self {
        self.scanner = Some(scanner);
        self
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    /// Returns how many more dumps could start right now.
    pub fn idle_workers(&self) -> usize {
        self.permits.available_permits()
    }

    /// Registers `job` as pending and schedules it.
    pub async fn submit(&self, job: DumpJob) -> JobRecord {
        let id = Uuid::now_v7().to_string();
        let record = JobRecord::pending(&id, job.url(), job.destination().display().to_string());
        let cancel = CancellationToken::new();

        self.registry.insert(record.clone(), cancel.clone()).await;
        self.metrics.record_submitted();
        info!("Accepted job {} for {}", id, job.url());

        let span = info_span!("dump", job_id = %id, url = %job.url());
        let pool = self.clone();
        tokio::spawn(pool.execute(id, job, cancel).instrument(span));

        record
    }

    async fn execute(self, id: String, job: DumpJob, cancel: CancellationToken) {
        let permit = tokio::select! {
            permit = Arc::clone(&self.permits).acquire_owned() => permit.ok(),
            () = cancel.cancelled() => None,
        };
        let Some(permit) = permit else {
            info!("Job {} cancelled before it started", id);
            let outcome = DumpOutcome::error("dump cancelled");
            self.metrics.record_dropped(JobStatus::from_outcome(&outcome));
            self.registry.complete(&id, |r| r.finish(outcome)).await;
            return;
        };

        self.registry
            .update(&id, |r| r.status = JobStatus::Running)
            .await;
        self.metrics.record_started();
        let start = Instant::now();

        let dest = job.destination().to_path_buf();
        let runner = Arc::clone(&self.runner);
        let task = tokio::spawn(async move { runner.run(job, cancel).await }.in_current_span());
        let outcome = match task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Job {} aborted: {}", id, e);
                DumpOutcome::error(format!("dump task failed: {e}"))
            },
        };

        let leaks = match self.scanner.as_ref().filter(|_| outcome.is_success()) {
            Some(scanner) => scan(scanner.as_ref(), &dest, &self.metrics).await,
            None => Vec::new(),
        };

        let status = JobStatus::from_outcome(&outcome);
        self.metrics.record_finished(status, start.elapsed());
        info!("Job {} finished: {}", id, status);

        // Free the worker before the final status becomes visible.
        drop(permit);
        self.registry
            .complete(&id, |r| {
                r.leaks = leaks;
                r.finish(outcome);
            })
            .await;
    }
}

async fn scan(scanner: &dyn SecretScanner, dir: &std::path::Path, metrics: &JobMetrics) -> Vec<Leak> {
    match scanner.scan(dir).await {
        Ok(leaks) => {
            metrics.record_leaks(leaks.len());
            leaks
        },
        Err(e) => {
            warn!("Secret scan of {} failed: {}", dir.display(), e);
            Vec::new()
        },
    }
}

impl std::fmt::Debug for JobPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobPool")
            .field("registry", &self.registry)
            .field("available", &self.permits.available_permits())
            .field("scanner", &self.scanner.is_some())
            .finish()
    }
}
