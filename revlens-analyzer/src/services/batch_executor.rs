//! Bounded concurrent batch execution
//!
//! Splits a sequence into contiguous batches and runs at most `max_concurrent`
//! of them at a time via `futures::stream::buffer_unordered`. Results come back
//! in input order regardless of which batch finished first.
//!
//! Failures are isolated per batch: a worker error, a panic, or a result of the
//! wrong length fills that batch's slots with the `None` sentinel and the other
//! batches carry on. Nothing escapes to the caller.

use anyhow::Result;
use futures::stream::{self, StreamExt};
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;

/// Results of one batched run
#[derive(Debug, Clone, PartialEq)]
pub struct BatchRun<R> {
    /// One slot per input item; `None` marks an item whose batch was degraded
    pub results: Vec<Option<R>>,
    pub total_batches: usize,
    pub degraded_batches: usize,
}

impl<R> BatchRun<R> {
    /// Number of items that received a real result
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_some()).count()
    }
}

/// Batch executor bound to one stage's batch size and permit count
#[derive(Debug, Clone)]
pub struct BatchExecutor {
    label: &'static str,
    batch_size: usize,
    max_concurrent: usize,
}

impl BatchExecutor {
    /// # Arguments
    /// * `label` - Stage name used in log lines
    /// * `batch_size` - Items per batch (values below 1 are treated as 1)
    /// * `max_concurrent` - Batches in flight at once (values below 1 are treated as 1)
    pub fn new(label: &'static str, batch_size: usize, max_concurrent: usize) -> Self {
        Self {
            label,
            batch_size: batch_size.max(1),
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Run `worker` over every batch of `items`
    ///
    /// The worker receives the batch index and the batch items, and must return
    /// exactly one result per item.
    pub async fn run<T, R, F, Fut>(&self, items: Vec<T>, worker: F) -> BatchRun<R>
    where
        F: Fn(usize, Vec<T>) -> Fut,
        Fut: Future<Output = Result<Vec<R>>>,
    {
        let total_items = items.len();
        let batches = split_into_batches(items, self.batch_size);
        let total_batches = batches.len();

        let mut results: Vec<Option<R>> = std::iter::repeat_with(|| None)
            .take(total_items)
            .collect();

        if total_batches == 0 {
            return BatchRun {
                results,
                total_batches: 0,
                degraded_batches: 0,
            };
        }

        tracing::debug!(
            stage = self.label,
            items = total_items,
            batches = total_batches,
            max_concurrent = self.max_concurrent,
            "Starting batched run"
        );

        let worker = &worker;
        let batch_size = self.batch_size;
        let mut completed = stream::iter(batches.into_iter().enumerate())
            .map(move |(batch_index, batch)| async move {
                let expected = batch.len();
                let outcome = AssertUnwindSafe(worker(batch_index, batch))
                    .catch_unwind()
                    .await;
                (batch_index, expected, outcome)
            })
            .buffer_unordered(self.max_concurrent);

        let mut degraded_batches = 0;
        while let Some((batch_index, expected, outcome)) = completed.next().await {
            let start = batch_index * batch_size;
            match outcome {
                Ok(Ok(batch_results)) if batch_results.len() == expected => {
                    for (offset, value) in batch_results.into_iter().enumerate() {
                        results[start + offset] = Some(value);
                    }
                }
                Ok(Ok(batch_results)) => {
                    degraded_batches += 1;
                    tracing::warn!(
                        stage = self.label,
                        batch = batch_index,
                        expected,
                        received = batch_results.len(),
                        "Batch returned malformed result, degrading to sentinels"
                    );
                }
                Ok(Err(e)) => {
                    degraded_batches += 1;
                    tracing::warn!(
                        stage = self.label,
                        batch = batch_index,
                        batch_size = expected,
                        error = %e,
                        "Batch failed, degrading to sentinels"
                    );
                }
                Err(_) => {
                    degraded_batches += 1;
                    tracing::error!(
                        stage = self.label,
                        batch = batch_index,
                        batch_size = expected,
                        "Batch worker panicked, degrading to sentinels"
                    );
                }
            }
        }

        if degraded_batches > 0 {
            tracing::warn!(
                stage = self.label,
                degraded_batches,
                total_batches,
                items = total_items,
                "Batched run finished with degraded coverage"
            );
        }

        BatchRun {
            results,
            total_batches,
            degraded_batches,
        }
    }
}

/// Run `worker` over `items` in batches; one result slot per item, order preserved
///
/// Degraded batches leave `None` in their slots.
pub async fn run_batched<T, R, F, Fut>(
    items: Vec<T>,
    batch_size: usize,
    max_concurrent: usize,
    worker: F,
) -> Vec<Option<R>>
where
    F: Fn(usize, Vec<T>) -> Fut,
    Fut: Future<Output = Result<Vec<R>>>,
{
    BatchExecutor::new("batch", batch_size, max_concurrent)
        .run(items, worker)
        .await
        .results
}

/// Contiguous batches; the last one may be short
fn split_into_batches<T>(items: Vec<T>, batch_size: usize) -> Vec<Vec<T>> {
    let mut batches = Vec::with_capacity(items.len().div_ceil(batch_size));
    let mut current = Vec::with_capacity(batch_size.min(items.len()));
    for item in items {
        current.push(item);
        if current.len() == batch_size {
            batches.push(std::mem::replace(&mut current, Vec::with_capacity(batch_size)));
        }
    }
    if !current.is_empty() {
        batches.push(current);
    }
    batches
}
