//! Dump runners standing in for the HTTP engine.

use async_trait::async_trait;
use dotgit_core::{DumpJob, DumpOutcome};
use dotgit_server::jobs::DumpRunner;
use tokio_util::sync::CancellationToken;

/// Succeeds without touching the network.
#[derive(Debug, Default)]
pub struct InstantRunner;

#[async_trait]
impl DumpRunner for InstantRunner {
    async fn run(&self, job: DumpJob, _cancel: CancellationToken) -> DumpOutcome {
        DumpOutcome::success(job.destination().display().to_string(), job.base_url())
    }
}

/// Runs until cancelled.
#[derive(Debug, Default)]
pub struct BlockingRunner;

#[async_trait]
impl DumpRunner for BlockingRunner {
    async fn run(&self, _job: DumpJob, cancel: CancellationToken) -> DumpOutcome {
        cancel.cancelled().await;
        DumpOutcome::error("dump cancelled")
    }
}

/// Panics inside the dump task.
#[derive(Debug, Default)]
pub struct PanickingRunner;

#[async_trait]
impl DumpRunner for PanickingRunner {
    async fn run(&self, job: DumpJob, _cancel: CancellationToken) -> DumpOutcome {
        panic!("runner blew up on {}", job.url());
    }
}
