//! Deduplicating breadth-first work queue.

use std::collections::{HashSet, VecDeque};
use std::fmt::Debug;
use std::hash::Hash;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{DumpError, Result};

/// Processes one task and returns the tasks it discovered.
///
/// Errors are not absorbed by the [`Frontier`]; a handler that wants a
/// failure to be non-fatal logs it and returns an empty list.
#[async_trait]
pub trait TaskHandler<T>: Send + Sync {
    async fn handle(&self, task: &T) -> Result<Vec<T>>;
}

/// FIFO queue plus seen-set. The handler runs at most once per distinct
/// task value over the lifetime of one frontier.
#[derive(Debug)]
pub struct Frontier<T> {
    pending: VecDeque<T>,
    seen: HashSet<T>,
}

impl<T> Frontier<T>
where
    T: Eq + Hash + Clone + Debug + Send + Sync,
{
    /// Creates a frontier seeded with `initial`.
    pub fn new(initial: impl IntoIterator<Item = T>) -> Self {
        Self {
            pending: initial.into_iter().collect(),
            seen: HashSet::new(),
        }
    }

    /// Returns the number of queued tasks, duplicates included.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Returns the number of distinct tasks handled so far.
    pub fn seen(&self) -> usize {
        self.seen.len()
    }

    /// Drains the queue through `handler` and returns the number of
    /// distinct tasks handled.
    ///
    /// # Errors
    ///
    /// Returns the first handler error, or `DumpError::Cancelled` if `cancel`
    /// fires between two tasks.
    pub async fn process<H>(&mut self, handler: &H, cancel: &CancellationToken) -> Result<usize>
    where
        H: TaskHandler<T> + ?Sized,
    {
        while let Some(task) = self.pending.pop_front() {
            if cancel.is_cancelled() {
                return Err(DumpError::Cancelled);
            }
            if !self.seen.insert(task.clone()) {
                continue;
            }

            let discovered = handler.handle(&task).await?;
            if !discovered.is_empty() {
                debug!("{:?} discovered {} tasks", task, discovered.len());
            }
            self.pending.extend(discovered);
        }

        Ok(self.seen.len())
    }
}

/// Runs one frontier pass over `initial` to completion.
pub async fn process<T, H>(
    initial: impl IntoIterator<Item = T>,
    handler: &H,
    cancel: &CancellationToken,
) -> Result<usize>
where
    T: Eq + Hash + Clone + Debug + Send + Sync,
    H: TaskHandler<T> + ?Sized,
{
    Frontier::new(initial).process(handler, cancel).await
}
