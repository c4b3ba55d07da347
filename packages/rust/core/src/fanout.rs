//! Bounded concurrent fan-out with per-item timeouts.
//!
//! At most `concurrency` items run at once. Every input item yields exactly
//! one [`Outcome`], returned in input order; errors, timeouts and panics are
//! all folded into [`Outcome::Failed`].

use std::future::Future;
use std::sync::Arc;

use promptkit_shared::{FanoutConfig, Result};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, instrument, warn};

use crate::pipeline::ProgressReporter;

/// Result of one fanned-out item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    Done(T),
    Failed(String),
}

impl<T> Outcome<T> {
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done(_))
    }
}

/// Run `work` over every item with bounded concurrency.
#[instrument(skip_all, fields(items = items.len(), concurrency = config.concurrency))]
pub async fn fan_out<I, T, F, Fut>(
    items: Vec<I>,
    config: &FanoutConfig,
    progress: &dyn ProgressReporter,
    work: F,
) -> Vec<Outcome<T>>
where
    I: Send + 'static,
    T: Send + 'static,
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
{
    let total = items.len();
    let semaphore = Arc::new(Semaphore::new(config.concurrency.max(1)));
    let work = Arc::new(work);
    let timeout = config.timeout;

    let mut set = JoinSet::new();
    for (index, item) in items.into_iter().enumerate() {
        let semaphore = semaphore.clone();
        let work = work.clone();
        set.spawn(async move {
            let _permit = semaphore.acquire_owned().await.ok();
            let outcome = match tokio::time::timeout(timeout, work(item)).await {
                Ok(Ok(value)) => Outcome::Done(value),
                Ok(Err(e)) => Outcome::Failed(e.to_string()),
                Err(_) => Outcome::Failed(format!("timed out after {timeout:?}")),
            };
            (index, outcome)
        });
    }

    let mut slots: Vec<Option<Outcome<T>>> = (0..total).map(|_| None).collect();
    let mut completed = 0;

    while let Some(joined) = set.join_next().await {
        completed += 1;
        match joined {
            Ok((index, outcome)) => {
                if let Outcome::Failed(reason) = &outcome {
                    warn!(index, %reason, "fan-out item failed");
                }
                slots[index] = Some(outcome);
            }
            Err(e) => warn!(error = %e, "fan-out worker did not finish"),
        }
        debug!(completed, total, "fan-out progress");
        progress.step(completed, total);
    }

    slots
        .into_iter()
        .map(|slot| slot.unwrap_or_else(|| Outcome::Failed("worker panicked".into())))
        .collect()
}
