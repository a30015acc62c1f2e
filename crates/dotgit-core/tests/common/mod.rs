#![allow(dead_code)]
use dotgit_core::DumpJob;

/// Helper to build a job with defaults for everything but url and destination.
/// Panics if the job is invalid (intended for tests).
pub fn job(url: &str, destination: &str) -> DumpJob {
    DumpJob::builder()
        .url(url)
        .destination(destination)
        .build()
        .expect("Failed to build test job")
}

/// URL variants users paste for the same exposed repository.
pub fn url_variants(base: &str) -> Vec<String> {
    vec![
        base.to_string(),
        format!("{base}/"),
        format!("{base}/.git"),
        format!("{base}/.git/"),
        format!("{base}/.git/HEAD"),
    ]
}
