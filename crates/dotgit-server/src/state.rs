//! Application state.

use std::sync::Arc;

use crate::jobs::{DumpRunner, EngineRunner, Gitleaks, JobPool, JobRegistry};
use crate::settings::Settings;

/// Application state shared across all handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    settings: Arc<Settings>,
    pool: JobPool,
}

impl AppState {
    /// Creates the state with the HTTP dump engine.
    pub fn new(settings: Settings) -> Self {
        Self::with_runner(settings, Arc::new(EngineRunner))
    }

    /// Creates the state with a custom dump runner.
    pub fn with_runner(settings: Settings, runner: Arc<dyn DumpRunner>) -> Self {
        let registry = JobRegistry::new(settings.job_ttl(), settings.max_jobs);
        let mut pool = JobPool::new(registry, settings.workers, runner);
        if settings.leaks_enabled {
            pool = pool.with_scanner(Arc::new(Gitleaks::new(&settings.gitleaks_executable)));
        }

        Self {
            settings: Arc::new(settings),
            pool,
        }
    }

    /// Replaces the job pool.
    pub fn with_pool(mut self, pool: JobPool) -> Self {
        self.pool = pool;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn pool(&self) -> &JobPool {
        &self.pool
    }
}
