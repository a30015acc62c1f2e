//! In-memory job registry.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use super::record::JobRecord;

/// Job records with a time-to-live, plus the cancellation tokens of
/// unfinished jobs.
#[derive(Clone)]
pub struct JobRegistry {
    records: Cache<String, JobRecord>,
    tokens: Arc<Mutex<HashMap<String, CancellationToken>>>,
}

impl JobRegistry {
    /// Creates a registry keeping records for `ttl`, at most `capacity`.
    pub fn new(ttl: Duration, capacity: u64) -> Self {
        Self {
            records: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl)
                .build(),
            tokens: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Stores a new record and its cancellation token.
    pub async fn insert(&self, record: JobRecord, cancel: CancellationToken) {
        self.tokens.lock().insert(record.id.clone(), cancel);
        self.records.insert(record.id.clone(), record).await;
    }

    /// Returns a record by id.
    pub async fn get(&self, id: &str) -> Option<JobRecord> {
        self.records.get(id).await
    }

    /// Applies `f` to a stored record. Returns false if it is gone.
    pub async fn update(&self, id: &str, f: impl FnOnce(&mut JobRecord)) -> bool {
        let Some(mut record) = self.records.get(id).await else {
            return false;
        };
        f(&mut record);
        self.records.insert(id.to_string(), record).await;
        true
    }

    /// Drops the job's cancellation token, then applies the final update.
    /// The token goes even when the record was already evicted.
    pub async fn complete(&self, id: &str, f: impl FnOnce(&mut JobRecord)) -> bool {
        self.tokens.lock().remove(id);
        self.update(id, f).await
    }

    /// Returns the number of jobs that have not finished yet.
    pub fn active(&self) -> usize {
        self.tokens.lock().len()
    }

    /// Returns all records, newest first.
    pub fn list(&self) -> Vec<JobRecord> {
        let mut records: Vec<JobRecord> = self.records.iter().map(|(_, record)| record).collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records
    }

    /// Cancels an unfinished job. Returns false if there is nothing to
    /// cancel.
    pub fn cancel(&self, id: &str) -> bool {
        match self.tokens.lock().get(id) {
            Some(token) => {
                token.cancel();
                true
            },
            None => false,
        }
    }
}

impl std::fmt::Debug for JobRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobRegistry")
            .field("records", &self.records.entry_count())
            .field("running", &self.tokens.lock().len())
            .finish()
    }
}
